//! HTTP API: agent snapshots, live stream, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    routing::get,
    Json, Router,
};
use dashboard_lib::{
    clusters::ClusterListClient,
    health::{ComponentStatus, HealthRegistry},
    observability::DashboardMetrics,
    SnapshotPublisher, SnapshotSource,
};
use futures::StreamExt;
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

const EMPTY_SNAPSHOT_JSON: &str = r#"{"agents":[]}"#;

const ENDPOINTS: &[&str] = &[
    "/api/agents",
    "/api/agents/refresh",
    "/api/agents/stream",
    "/healthz",
    "/readyz",
    "/metrics",
];

/// Shared application state
pub struct AppState {
    pub source: Arc<SnapshotSource>,
    pub publisher: Arc<SnapshotPublisher>,
    pub clusters: ClusterListClient,
    pub health_registry: HealthRegistry,
    pub metrics: DashboardMetrics,
}

impl AppState {
    pub fn new(
        source: Arc<SnapshotSource>,
        publisher: Arc<SnapshotPublisher>,
        clusters: ClusterListClient,
        health_registry: HealthRegistry,
        metrics: DashboardMetrics,
    ) -> Self {
        Self {
            source,
            publisher,
            clusters,
            health_registry,
            metrics,
        }
    }
}

/// Service info
async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "name": "agent-dashboard",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
        "active_subscribers": state.metrics.active_subscribers(),
    }))
}

/// One-shot snapshot; never fails
async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.source.snapshot().await)
}

/// Live snapshot stream
///
/// The subscription is owned by the response body, so a client disconnect
/// drops it and stops the subscriber's task.
async fn stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let subscription = state.publisher.subscribe();
    let subscriber_id = subscription.handle().id();
    info!(subscriber_id, "Live stream opened");

    let events = subscription.map(move |snapshot| {
        let event = match serde_json::to_string(&snapshot) {
            // Stored snapshots keep their own line breaks; each line becomes
            // one `data:` field and CR is only ever JSON whitespace
            Ok(json) => Event::default().data(json.replace('\r', "")),
            Err(err) => {
                warn!(subscriber_id, error = %err, "Failed to encode snapshot");
                Event::default().data(EMPTY_SNAPSHOT_JSON)
            }
        };
        Ok::<_, Infallible>(event)
    });

    (
        [
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events),
    )
}

/// Cloud provider cluster list, passed through untouched
async fn clusters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.clusters.list_clusters().await {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(err) => {
            warn!(error = %err, "Cluster list request failed");
            (StatusCode::BAD_GATEWAY, Json(err.body()))
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Serving fallback or empty snapshots
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %err, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            err.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/agents", get(clusters))
        .route("/api/agents/refresh", get(refresh))
        .route("/api/agents/stream", get(stream))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves and open
/// connections have drained
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
