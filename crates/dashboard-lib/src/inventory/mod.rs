//! Cluster inventory readers
//!
//! This module provides the pod/node readers behind the dashboard:
//! - `kubectl` subprocess reader parsing `-o json` output
//! - Direct Kubernetes API reader built on `kube`
//!
//! Readers make exactly one attempt per call. Retrying is the caller's
//! business, and the snapshot pipeline degrades to the fallback store instead.

mod kube_api;
mod kubectl;
mod wire;

pub use kube_api::KubeApiProvider;
pub use kubectl::KubectlProvider;
pub use wire::{parse_node_list, parse_pod_list};

use crate::error::{Result, SnapshotError};
use crate::models::Inventory;
use std::sync::Arc;
use std::time::Duration;

pub use async_trait::async_trait;

/// Source of pod and node state
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Read all pods across all namespaces plus all nodes
    async fn read_inventory(&self) -> Result<Inventory>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Bounds every read of the wrapped provider with a timeout
pub struct TimeoutProvider {
    inner: Arc<dyn InventoryProvider>,
    timeout: Duration,
}

impl TimeoutProvider {
    pub fn new(inner: Arc<dyn InventoryProvider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl InventoryProvider for TimeoutProvider {
    async fn read_inventory(&self) -> Result<Inventory> {
        tokio::time::timeout(self.timeout, self.inner.read_inventory())
            .await
            .map_err(|_| {
                SnapshotError::inventory(format!(
                    "{} read timed out after {}s",
                    self.inner.name(),
                    self.timeout.as_secs()
                ))
            })?
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Inventory backend selected by configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryBackend {
    /// Shell out to `kubectl`
    #[default]
    Kubectl,
    /// Talk to the API server through `kube`
    Kube,
}

/// Create the provider for the configured backend
pub async fn create_provider(
    backend: InventoryBackend,
    kubectl_path: &str,
    timeout: Duration,
) -> anyhow::Result<Arc<dyn InventoryProvider>> {
    let provider: Arc<dyn InventoryProvider> = match backend {
        InventoryBackend::Kubectl => {
            tracing::info!(kubectl = %kubectl_path, "Using kubectl inventory reader");
            Arc::new(KubectlProvider::new(kubectl_path))
        }
        InventoryBackend::Kube => {
            tracing::info!("Using Kubernetes API inventory reader");
            Arc::new(KubeApiProvider::try_default().await?)
        }
    };

    Ok(Arc::new(TimeoutProvider::new(provider, timeout)))
}
