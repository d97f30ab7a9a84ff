//! Integration tests for health, readiness and liveness endpoints.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use statusboard_api::{create_router, AppState, Config};
use statusboard_core::{MemoryTableStore, StaticSecret};
use tower::ServiceExt;

fn test_app(store: &MemoryTableStore) -> axum::Router {
    create_router(AppState::from_config(
        &Config::default(),
        Arc::new(store.clone()),
        Arc::new(StaticSecret::disabled()),
    ))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).expect("build request");
    let response = app.oneshot(request).await.expect("execute request");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    (status, serde_json::from_slice(&body).expect("parse json"))
}

#[tokio::test]
async fn health_reports_healthy_store() {
    let store = MemoryTableStore::new();

    let (status, body) = get(test_app(&store), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["storage"]["status"], "up");
    assert!(body["checks"]["storage"].get("message").is_none());
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn health_reports_unavailable_store() {
    let store = MemoryTableStore::new();
    store.fail_with("no route to host").await;

    let (status, body) = get(test_app(&store), "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["storage"]["status"], "down");
    assert!(body["checks"]["storage"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("no route to host")));
}

#[tokio::test]
async fn readiness_mirrors_health() {
    let store = MemoryTableStore::new();
    store.fail_with("starting up").await;

    let (status, _) = get(test_app(&store), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    store.clear_failure().await;
    let (status, _) = get(test_app(&store), "/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn liveness_ignores_store() {
    let store = MemoryTableStore::new();
    store.fail_with("down").await;

    let (status, body) = get(test_app(&store), "/live").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
    assert_eq!(body["service"], "statusboard");
}
