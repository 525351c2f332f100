//! One snapshot cycle: read, classify, or degrade
//!
//! The chain is inventory read → classification, falling back to the stored
//! snapshot when the read fails and to the empty snapshot when that fails too.
//! [`SnapshotSource::snapshot`] therefore always returns a value.

use crate::classifier::build_snapshot;
use crate::fallback::FallbackStore;
use crate::health::{components, HealthRegistry};
use crate::inventory::InventoryProvider;
use crate::models::SnapshotPayload;
use crate::observability::{DashboardMetrics, StructuredLogger};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// Where a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Fresh inventory read, classified this cycle
    Live,
    /// Stored snapshot, served because the inventory read failed
    Fallback,
    /// Both the inventory and the fallback failed
    Empty,
}

impl SnapshotOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotOrigin::Live => "live",
            SnapshotOrigin::Fallback => "fallback",
            SnapshotOrigin::Empty => "empty",
        }
    }
}

impl fmt::Display for SnapshotOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces snapshots on demand
pub struct SnapshotSource {
    provider: Arc<dyn InventoryProvider>,
    fallback: FallbackStore,
    health: Option<HealthRegistry>,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl SnapshotSource {
    pub fn new(provider: Arc<dyn InventoryProvider>, fallback: FallbackStore) -> Self {
        Self {
            provider,
            fallback,
            health: None,
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::new("agent-dashboard"),
        }
    }

    /// Report inventory health to `registry` after every cycle
    pub fn with_health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Run one cycle and return its snapshot
    pub async fn snapshot(&self) -> SnapshotPayload {
        self.produce().await.0
    }

    /// Run one cycle, also reporting where the snapshot came from
    pub async fn produce(&self) -> (SnapshotPayload, SnapshotOrigin) {
        let start = Instant::now();

        let (snapshot, origin) = match self.provider.read_inventory().await {
            Ok(inventory) => {
                let snapshot = build_snapshot(&inventory.pods, &inventory.nodes, chrono::Utc::now());
                self.report_health(None).await;
                (SnapshotPayload::Live(snapshot), SnapshotOrigin::Live)
            }
            Err(inventory_err) => {
                self.metrics.inc_inventory_failures();
                self.logger
                    .log_inventory_failure(self.provider.name(), &inventory_err.to_string());

                match self.fallback.load().await {
                    Ok(stored) => {
                        self.report_health(Some(format!(
                            "serving fallback snapshot: {}",
                            inventory_err
                        )))
                        .await;
                        (SnapshotPayload::Stored(stored), SnapshotOrigin::Fallback)
                    }
                    Err(fallback_err) => {
                        self.metrics.inc_fallback_failures();
                        self.logger.log_fallback_failure(&fallback_err.to_string());
                        self.report_health(Some(format!(
                            "serving empty snapshot: {}; {}",
                            inventory_err, fallback_err
                        )))
                        .await;
                        (SnapshotPayload::empty(), SnapshotOrigin::Empty)
                    }
                }
            }
        };

        let elapsed = start.elapsed();
        self.metrics
            .observe_cycle(origin.as_str(), elapsed.as_secs_f64(), snapshot.len());
        self.logger
            .log_cycle(origin.as_str(), snapshot.len(), elapsed.as_millis());

        (snapshot, origin)
    }

    async fn report_health(&self, degraded: Option<String>) {
        let Some(health) = &self.health else {
            return;
        };

        match degraded {
            None => health.set_healthy(components::INVENTORY).await,
            Some(message) => health.set_degraded(components::INVENTORY, message).await,
        }
    }
}
