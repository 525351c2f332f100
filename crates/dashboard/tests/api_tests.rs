//! Integration tests for the dashboard API endpoints

use agent_dashboard::api::{create_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use dashboard_lib::{
    clusters::ClusterListClient,
    error::{Result, SnapshotError},
    health::{components, HealthRegistry},
    observability::DashboardMetrics,
    FallbackStore, Inventory, InventoryProvider, PublisherConfig, RawNode, RawPod,
    SnapshotPublisher, SnapshotSource,
};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct StaticProvider {
    inventory: Option<Inventory>,
}

impl StaticProvider {
    fn with_agent(app: &str) -> Self {
        let mut pod = RawPod {
            name: format!("{}-7d9f", app),
            namespace: "agents".to_string(),
            node_name: Some("pool-1".to_string()),
            phase: Some("Running".to_string()),
            ..Default::default()
        };
        pod.labels.insert("app".to_string(), app.to_string());

        let node = RawNode {
            name: "pool-1".to_string(),
            labels: [(
                "topology.kubernetes.io/region".to_string(),
                "nyc1".to_string(),
            )]
            .into_iter()
            .collect(),
        };

        Self {
            inventory: Some(Inventory {
                pods: vec![pod],
                nodes: vec![node],
            }),
        }
    }

    fn unreachable() -> Self {
        Self { inventory: None }
    }
}

#[async_trait]
impl InventoryProvider for StaticProvider {
    async fn read_inventory(&self) -> Result<Inventory> {
        self.inventory
            .clone()
            .ok_or_else(|| SnapshotError::inventory("connection refused"))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

async fn setup_test_app(provider: StaticProvider, fallback: PathBuf) -> (Router, Arc<AppState>) {
    setup_test_app_with_clusters(provider, fallback, "http://127.0.0.1:9").await
}

async fn setup_test_app_with_clusters(
    provider: StaticProvider,
    fallback: PathBuf,
    clusters_url: &str,
) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::INVENTORY).await;
    health_registry.register(components::PUBLISHER).await;

    let source = Arc::new(
        SnapshotSource::new(Arc::new(provider), FallbackStore::new(fallback))
            .with_health(health_registry.clone()),
    );
    let publisher = Arc::new(SnapshotPublisher::new(
        source.clone(),
        PublisherConfig {
            interval: Duration::from_millis(50),
            ..Default::default()
        },
    ));
    let clusters = ClusterListClient::new(clusters_url, Some("token".to_string())).unwrap();

    let state = Arc::new(AppState::new(
        source,
        publisher,
        clusters,
        health_registry,
        DashboardMetrics::new(),
    ));
    (create_router(state.clone()), state)
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_refresh_returns_live_snapshot() {
    let (app, _) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    let response = get(app, "/api/agents/refresh").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let agents = json["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["id"], 1);
    assert_eq!(agents[0]["name"], "Support Agent");
    assert_eq!(agents[0]["status"], "healthy");
    assert_eq!(agents[0]["region"], "nyc1");
    assert_eq!(agents[0]["node"], "pool-1");
}

#[tokio::test]
async fn test_refresh_serves_fallback_when_cluster_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("do-agents.json");
    std::fs::write(
        &path,
        r#"{"agents":[{"id":7,"name":"Stored Agent","status":"warning"}]}"#,
    )
    .unwrap();

    let (app, state) = setup_test_app(StaticProvider::unreachable(), path).await;

    let response = get(app, "/api/agents/refresh").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["agents"][0]["id"], 7);
    assert_eq!(json["agents"][0]["name"], "Stored Agent");

    let health = state.health_registry.health().await;
    assert!(health.components[components::INVENTORY].message.is_some());
}

#[tokio::test]
async fn test_refresh_serves_fallback_file_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("do-agents.json");
    let contents = r#"{"agents":[{"id":1,"name":"Ops Agent","status":"stopped","region":"nyc1","owner":"team-a"}],"generatedAt":"2024-05-01"}"#;
    std::fs::write(&path, contents).unwrap();

    let (app, _) = setup_test_app(StaticProvider::unreachable(), path).await;

    let response = get(app, "/api/agents/refresh").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(std::str::from_utf8(&body).unwrap(), contents);
}

#[tokio::test]
async fn test_refresh_is_empty_when_everything_fails() {
    let (app, _) = setup_test_app(
        StaticProvider::unreachable(),
        PathBuf::from("/nonexistent/do-agents.json"),
    )
    .await;

    let response = get(app, "/api/agents/refresh").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!({ "agents": [] }));
}

#[tokio::test]
async fn test_stream_sends_first_snapshot_immediately() {
    let (app, state) = setup_test_app(
        StaticProvider::with_agent("billing-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    let response = get(app, "/api/agents/stream").await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-transform");
    assert_eq!(headers["x-accel-buffering"], "no");

    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .expect("first event")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();

    assert!(text.starts_with("data: "));
    let payload: serde_json::Value =
        serde_json::from_str(text.trim_start_matches("data: ").trim_end()).unwrap();
    assert_eq!(payload["agents"][0]["name"], "Billing Agent");

    drop(body);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(state.publisher.active_subscribers(), 0);
}

#[tokio::test]
async fn test_stream_keeps_emitting() {
    let (app, _) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    let response = get(app, "/api/agents/stream").await;
    let mut body = response.into_body().into_data_stream();

    for _ in 0..3 {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .expect("event")
            .unwrap()
            .unwrap();
        assert!(chunk.starts_with(b"data: "));
    }
}

#[tokio::test]
async fn test_stream_carries_multiline_fallback_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("do-agents.json");
    let contents = "{\r\n  \"agents\": [\r\n    {\"id\": \"ops-1\", \"status\": \"stopped\"}\r\n  ]\r\n}";
    std::fs::write(&path, contents).unwrap();

    let (app, _) = setup_test_app(StaticProvider::unreachable(), path).await;

    let response = get(app, "/api/agents/stream").await;
    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .expect("first event")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();

    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .collect();
    assert_eq!(data.join("\n"), contents.replace('\r', ""));
}

#[tokio::test]
async fn test_clusters_passes_body_through() {
    let mut server = mockito::Server::new_async().await;
    let body = r#"{"kubernetes_clusters":[{"id":"bd5f5959","name":"prod-cluster-01"}],"meta":{"total":1}}"#;
    server
        .mock("GET", "/v2/kubernetes/clusters")
        .match_header("authorization", "Bearer token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let (app, _) = setup_test_app_with_clusters(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
        &server.url(),
    )
    .await;

    let response = get(app, "/api/agents").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::from_str::<serde_json::Value>(body).unwrap()
    );
}

#[tokio::test]
async fn test_clusters_forwards_upstream_error_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/kubernetes/clusters")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"unauthorized","message":"Unable to authenticate you"}"#)
        .create_async()
        .await;

    let (app, _) = setup_test_app_with_clusters(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
        &server.url(),
    )
    .await;

    let response = get(app, "/api/agents").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"id": "unauthorized", "message": "Unable to authenticate you"})
    );
}

#[tokio::test]
async fn test_clusters_passthrough_failure_is_bad_gateway() {
    let (app, _) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    let response = get(app, "/api/agents").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(response).await;
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (app, _) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    let response = get(app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["name"], "agent-dashboard");
    let endpoints = json["endpoints"].as_array().unwrap();
    assert!(endpoints.iter().any(|e| e == "/api/agents/stream"));
}

#[tokio::test]
async fn test_healthz_ok_while_degraded() {
    let (app, state) = setup_test_app(
        StaticProvider::unreachable(),
        PathBuf::from("/nonexistent"),
    )
    .await;

    get(app.clone(), "/api/agents/refresh").await;

    let response = get(app, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert!(state.health_registry.health().await.status.is_operational());
}

#[tokio::test]
async fn test_healthz_unhealthy_returns_503() {
    let (app, state) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    state
        .health_registry
        .set_unhealthy(components::PUBLISHER, "stopped")
        .await;

    let response = get(app, "/healthz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_not_ready() {
    let (app, _) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    let response = get(app, "/readyz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["ready"], false);
}

#[tokio::test]
async fn test_readyz_ready() {
    let (app, state) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    state.health_registry.set_ready(true).await;

    let response = get(app, "/readyz").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    get(app.clone(), "/api/agents/refresh").await;

    let response = get(app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("agent_dashboard_cycles_total"));
    assert!(text.contains("agent_dashboard_cycle_latency_seconds"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let (app, _) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/agents/refresh")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = setup_test_app(
        StaticProvider::with_agent("support-agent"),
        PathBuf::from("/nonexistent"),
    )
    .await;

    let response = get(app, "/nonexistent").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
