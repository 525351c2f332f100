//! Agent dashboard - live agent inventory for the dashboard UI
//!
//! Reads pods and nodes from the cluster, classifies agent pods and
//! serves the result as a one-shot JSON endpoint and a live SSE stream.

use agent_dashboard::{api, config::DashboardConfig};
use anyhow::{Context, Result};
use dashboard_lib::{
    clusters::ClusterListClient,
    health::{components, HealthRegistry},
    inventory::create_provider,
    observability::{DashboardMetrics, StructuredLogger},
    FallbackStore, PublisherConfig, SnapshotPublisher, SnapshotSource,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DASHBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting agent-dashboard");

    let config = DashboardConfig::load()?;
    info!(
        backend = ?config.inventory_backend,
        fallback = %config.fallback_path,
        poll_interval_secs = config.poll_interval_secs,
        "Dashboard configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::INVENTORY).await;
    health_registry.register(components::PUBLISHER).await;

    let metrics = DashboardMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    let provider = create_provider(
        config.inventory_backend,
        &config.kubectl_path,
        config.inventory_timeout(),
    )
    .await
    .context("Failed to create inventory provider")?;

    let source = Arc::new(
        SnapshotSource::new(provider, FallbackStore::new(&config.fallback_path))
            .with_health(health_registry.clone())
            .with_logger(logger.clone()),
    );

    let publisher = Arc::new(
        SnapshotPublisher::new(
            source.clone(),
            PublisherConfig {
                interval: config.poll_interval(),
                ..Default::default()
            },
        )
        .with_logger(logger.clone()),
    );

    let clusters = ClusterListClient::new(&config.clusters_api_url, config.digitalocean_token.clone())
        .context("Failed to create cluster list client")?;

    let app_state = Arc::new(api::AppState::new(
        source,
        publisher.clone(),
        clusters,
        health_registry.clone(),
        metrics,
    ));

    logger.log_startup(
        DASHBOARD_VERSION,
        &format!("{:?}", config.inventory_backend).to_lowercase(),
        config.api_port,
    );
    health_registry.set_ready(true).await;

    let shutdown = {
        let publisher = publisher.clone();
        let health_registry = health_registry.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "Failed to listen for shutdown signal");
            }
            logger.log_shutdown("SIGINT received");
            health_registry.begin_shutdown().await;
            // Ends every open SSE body so the server can drain
            publisher.shutdown().await;
        }
    };

    api::serve(config.api_port, app_state, shutdown).await?;
    info!("Shut down");

    Ok(())
}
