//! Example consumer: a small HTTP service that owns its pools through pg-topology.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Set `TOPOLOGY_PATH` to a JSON topology file; otherwise a standalone pool on `DATABASE_URL` is used.

use pg_topology::{common_routes_with_ready, config::loader, AppState, PoolConfig, PoolManager, TopologyConfig};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pg_topology=info")),
        )
        .init();

    let topology = match std::env::var("TOPOLOGY_PATH") {
        Ok(path) => loader::from_path(path).await?,
        Err(_) => TopologyConfig::standalone(PoolConfig::new()),
    };

    let manager = Arc::new(PoolManager::new(topology));
    manager.on_init().await?;

    let app = common_routes_with_ready(AppState::new(manager.clone()));
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let report = manager.on_shutdown(Some("SIGINT")).await;
    if report.is_clean() {
        tracing::info!(closed = ?report.closed, "pools closed");
    } else {
        tracing::warn!(failed = ?report.failed_pools(), "some pools failed to close");
    }
    Ok(())
}
