//! Connectivity verification across every registered pool.
//!
//! Each pool is probed with a trivial round trip. All probes are launched together and
//! the verdict is taken only after every one of them has settled, so one slow or broken
//! pool never hides the state of the others.

use crate::error::{ConfigurationError, PoolError};
use crate::pool::PoolHandle;
use crate::registry::PoolRegistry;
use futures::future::join_all;
use std::time::{Duration, Instant};

pub const PROBE_QUERY: &str = "SELECT 1 as connection_test";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ok,
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct PoolProbe {
    pub name: String,
    pub outcome: ProbeOutcome,
    pub elapsed: Duration,
}

impl PoolProbe {
    pub fn is_ok(&self) -> bool {
        self.outcome == ProbeOutcome::Ok
    }
}

/// Per-pool outcomes in registration order. Recomputed on every verification.
#[derive(Clone, Debug, Default)]
pub struct VerificationReport {
    pub probes: Vec<PoolProbe>,
}

impl VerificationReport {
    pub fn is_healthy(&self) -> bool {
        self.probes.iter().all(PoolProbe::is_ok)
    }

    pub fn failed_pools(&self) -> Vec<String> {
        self.probes
            .iter()
            .filter(|p| !p.is_ok())
            .map(|p| p.name.clone())
            .collect()
    }

    /// `Err(ConnectionFailed)` naming every failed pool, in registration order.
    pub fn into_result(self) -> Result<Self, ConfigurationError> {
        let failed = self.failed_pools();
        if failed.is_empty() {
            Ok(self)
        } else {
            Err(ConfigurationError::ConnectionFailed { pools: failed })
        }
    }
}

/// Acquire, run [`PROBE_QUERY`], release.
pub async fn probe(handle: &PoolHandle) -> Result<(), PoolError> {
    let mut conn = handle.acquire().await?;
    let result = conn.execute(PROBE_QUERY).await;
    conn.release();
    result.map(|_| ())
}

/// Probe every handle concurrently and wait for all of them.
pub async fn check<'a, I>(handles: I) -> VerificationReport
where
    I: IntoIterator<Item = &'a PoolHandle>,
{
    let probes = handles.into_iter().map(|handle| async move {
        let started = Instant::now();
        let outcome = match probe(handle).await {
            Ok(()) => {
                tracing::info!(pool = handle.name(), "connection successful");
                ProbeOutcome::Ok
            }
            Err(e) => {
                tracing::warn!(pool = handle.name(), error = %e, "connection probe failed");
                ProbeOutcome::Failed(e.to_string())
            }
        };
        PoolProbe {
            name: handle.name().to_string(),
            outcome,
            elapsed: started.elapsed(),
        }
    });
    VerificationReport {
        probes: join_all(probes).await,
    }
}

/// Verify every pool in `registry`; fails with the names of all unreachable pools.
pub async fn verify(registry: &PoolRegistry) -> Result<VerificationReport, ConfigurationError> {
    tracing::info!(pools = registry.len(), "verifying all database connections");
    let report = check(registry.all().map(|(_, handle)| handle)).await;
    match report.into_result() {
        Ok(report) => {
            tracing::info!("all database connections verified successfully");
            Ok(report)
        }
        Err(e) => {
            tracing::error!(error = %e, "connection check failed");
            Err(e)
        }
    }
}
