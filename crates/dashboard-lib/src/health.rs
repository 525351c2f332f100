//! Component health for liveness and readiness probes
//!
//! Serving a fallback or empty snapshot marks the inventory degraded. That is
//! still operational: the dashboard keeps answering with a valid snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Healthy or degraded
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Updates in a row that were not healthy
    #[serde(default, skip_serializing_if = "is_zero")]
    pub failure_streak: u32,
    pub updated_at: DateTime<Utc>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>, failure_streak: u32) -> Self {
        Self {
            status,
            message,
            failure_streak,
            updated_at: Utc::now(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None, 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    fn from_components(components: BTreeMap<String, ComponentHealth>) -> Self {
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        Self { status, components }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod components {
    /// Cluster inventory reads
    pub const INVENTORY: &str = "inventory";
    /// Live stream publisher
    pub const PUBLISHER: &str = "publisher";
}

/// Shared registry of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `name` as healthy
    pub async fn register(&self, name: &str) {
        self.components
            .write()
            .await
            .insert(name.to_string(), ComponentHealth::healthy());
    }

    pub async fn set_healthy(&self, name: &str) {
        self.transition(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.transition(name, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.transition(name, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    async fn transition(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        let mut components = self.components.write().await;
        let streak = match (status, components.get(name)) {
            (ComponentStatus::Healthy, _) => 0,
            (_, Some(previous)) => previous.failure_streak.saturating_add(1),
            (_, None) => 1,
        };
        components.insert(
            name.to_string(),
            ComponentHealth::new(status, message, streak),
        );
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Stop accepting traffic: not ready, publisher unhealthy
    pub async fn begin_shutdown(&self) {
        self.set_ready(false).await;
        self.set_unhealthy(components::PUBLISHER, "shutting down")
            .await;
    }

    pub async fn health(&self) -> HealthResponse {
        HealthResponse::from_components(self.components.read().await.clone())
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let reason = if !*self.ready.read().await {
            Some("Dashboard not yet initialized".to_string())
        } else {
            self.components
                .read()
                .await
                .iter()
                .find(|(_, c)| !c.status.is_operational())
                .map(|(name, c)| {
                    format!(
                        "{} unhealthy: {}",
                        name,
                        c.message.as_deref().unwrap_or("no details")
                    )
                })
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
