//! Common routes: health, readiness, version.

use crate::error::Error;
use crate::manager::LifecycleState;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct PoolStatus {
    name: String,
    status: &'static str,
    elapsed_ms: u128,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    mode: String,
    pools: Vec<PoolStatus>,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

/// 200 only when the coordinator is Ready and every pool answers a probe.
async fn ready(State(state): State<AppState>) -> Result<Json<ReadyBody>, Error> {
    let lifecycle = state.manager.state();
    if lifecycle != LifecycleState::Ready {
        return Err(Error::InvalidState {
            operation: "serve traffic",
            state: lifecycle,
        });
    }
    let report = state.manager.verify_connections().await?;
    let pools = report
        .probes
        .into_iter()
        .map(|p| PoolStatus {
            status: if p.is_ok() { "ok" } else { "unavailable" },
            elapsed_ms: p.elapsed.as_millis(),
            name: p.name,
        })
        .collect();
    Ok(Json(ReadyBody {
        status: "ok",
        mode: state.manager.topology().mode().to_string(),
        pools,
    }))
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Common routes (no state): GET /health, GET /version.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

/// Common routes including readiness backed by the pool manager.
pub fn common_routes_with_ready(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
