//! Tests for the health and readiness routes.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::{Behaviour, FakeFactory};
use pg_topology::{common_routes, common_routes_with_ready, AppState, PoolConfig, PoolManager, ReplicaConfig, TopologyConfig};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn topology() -> TopologyConfig {
    TopologyConfig::replicated(PoolConfig::new(), vec![ReplicaConfig::new("r1", PoolConfig::new())])
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_is_always_ok() {
    let (status, body) = get(common_routes(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_version_reports_package() {
    let (status, body) = get(common_routes(), "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "pg-topology");
}

#[tokio::test]
async fn test_ready_lists_every_pool_when_ready() {
    let factory = Arc::new(FakeFactory::new());
    let mgr = Arc::new(PoolManager::with_factory(topology(), factory.clone()));
    mgr.on_init().await.unwrap();

    let (status, body) = get(common_routes_with_ready(AppState::new(mgr)), "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mode"], "replicated");
    let names: Vec<_> = body["pools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["primary", "r1"]);
}

#[tokio::test]
async fn test_ready_is_unavailable_before_init() {
    let factory = Arc::new(FakeFactory::new());
    let mgr = Arc::new(PoolManager::with_factory(topology(), factory.clone()));
    mgr.construct().unwrap();

    let (status, body) = get(common_routes_with_ready(AppState::new(mgr)), "/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "not_ready");
    assert_eq!(body["error"]["details"]["state"], "constructed");
}

#[tokio::test]
async fn test_ready_names_unreachable_pools() {
    let factory = Arc::new(FakeFactory::new());
    let mgr = Arc::new(PoolManager::with_factory(topology(), factory.clone()));
    mgr.on_init().await.unwrap();
    factory.pool("r1").set_behaviour(Behaviour::ok().fail_acquire("too many clients"));

    let (status, body) = get(common_routes_with_ready(AppState::new(mgr)), "/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "connection_failed");
    assert_eq!(body["error"]["details"]["pools"][0], "r1");
}

#[tokio::test]
async fn test_ready_is_unavailable_after_shutdown() {
    let factory = Arc::new(FakeFactory::new());
    let mgr = Arc::new(PoolManager::with_factory(topology(), factory.clone()));
    mgr.on_init().await.unwrap();
    mgr.shutdown(Some("SIGTERM")).await;

    let (status, body) = get(common_routes_with_ready(AppState::new(mgr)), "/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["details"]["state"], "closed");
}
