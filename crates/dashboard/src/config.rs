//! Dashboard configuration

use anyhow::{Context, Result};
use dashboard_lib::clusters::DEFAULT_CLUSTERS_API_URL;
use dashboard_lib::fallback::DEFAULT_FALLBACK_PATH;
use dashboard_lib::InventoryBackend;
use serde::Deserialize;
use std::time::Duration;

/// Dashboard configuration
///
/// Read from an optional `dashboard.toml` and `DASHBOARD_*` environment
/// variables, the latter taking precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// HTTP server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Inventory reader: `kubectl` or `kube`
    #[serde(default)]
    pub inventory_backend: InventoryBackend,

    /// kubectl binary used by the `kubectl` backend
    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: String,

    /// Snapshot served when the cluster cannot be read
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,

    /// Live stream refresh interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper bound for one inventory read in seconds
    #[serde(default = "default_inventory_timeout")]
    pub inventory_timeout_secs: u64,

    /// Cloud API used by the cluster-list passthrough
    #[serde(default = "default_clusters_api_url")]
    pub clusters_api_url: String,

    /// Bearer token for the cloud API
    #[serde(default = "default_digitalocean_token")]
    pub digitalocean_token: Option<String>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "agent-dashboard".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_kubectl_path() -> String {
    "kubectl".to_string()
}

fn default_fallback_path() -> String {
    DEFAULT_FALLBACK_PATH.to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_inventory_timeout() -> u64 {
    30
}

fn default_clusters_api_url() -> String {
    DEFAULT_CLUSTERS_API_URL.to_string()
}

fn default_digitalocean_token() -> Option<String> {
    std::env::var("DIGITALOCEAN_API_TOKEN").ok()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            inventory_backend: InventoryBackend::default(),
            kubectl_path: default_kubectl_path(),
            fallback_path: default_fallback_path(),
            poll_interval_secs: default_poll_interval(),
            inventory_timeout_secs: default_inventory_timeout(),
            clusters_api_url: default_clusters_api_url(),
            digitalocean_token: default_digitalocean_token(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment and config file
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("dashboard").required(false))
            .add_source(config::Environment::with_prefix("DASHBOARD"))
            .build()
            .context("Failed to read configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Invalid dashboard configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject durations that would spin the poll loop or time out every read
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be at least 1");
        }
        if self.inventory_timeout_secs == 0 {
            anyhow::bail!("inventory_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn inventory_timeout(&self) -> Duration {
        Duration::from_secs(self.inventory_timeout_secs)
    }
}
