//! Query interfaces handed to application code.
//!
//! Standalone topologies expose the primary directly. Replicated topologies expose a
//! composite: writes always go to the primary, reads go to whichever replica the
//! configured [`ReplicaSelector`] picks. The composite is fixed at construction.

use crate::config::TopologyMode;
use crate::error::{ConfigurationError, Result};
use crate::pool::PoolHandle;
use sqlx::PgPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Query interface over one registered pool.
#[derive(Clone, Debug)]
pub struct Database {
    handle: PoolHandle,
    logging: bool,
}

impl Database {
    pub fn new(handle: PoolHandle, logging: bool) -> Self {
        Self { handle, logging }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn handle(&self) -> &PoolHandle {
        &self.handle
    }

    /// The sqlx pool, for building typed queries.
    pub fn pg(&self) -> Option<&PgPool> {
        self.handle.as_pg()
    }

    pub async fn execute(&self, sql: &str) -> Result<u64> {
        if self.logging {
            tracing::debug!(pool = self.name(), sql = %sql, "query");
        }
        Ok(self.handle.execute(sql).await?)
    }

    pub fn same_pool(&self, other: &Database) -> bool {
        self.handle.same_pool(&other.handle)
    }
}

/// A replica plus the pass-through metadata a selector may use.
#[derive(Clone, Debug)]
pub struct ReplicaRoute {
    pub db: Database,
    pub weight: u32,
    pub priority: u32,
}

/// Picks the replica index for a read. `replicas` is never empty; out-of-range answers wrap.
pub trait ReplicaSelector: Send + Sync {
    fn select(&self, replicas: &[ReplicaRoute]) -> usize;
}

#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl ReplicaSelector for RoundRobin {
    fn select(&self, replicas: &[ReplicaRoute]) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % replicas.len()
    }
}

#[derive(Clone)]
pub struct ReplicatedDatabase {
    primary: Database,
    replicas: Arc<[ReplicaRoute]>,
    selector: Arc<dyn ReplicaSelector>,
}

impl ReplicatedDatabase {
    pub fn new(
        primary: Database,
        replicas: Vec<ReplicaRoute>,
        selector: Arc<dyn ReplicaSelector>,
    ) -> Result<Self, ConfigurationError> {
        if replicas.is_empty() {
            return Err(ConfigurationError::EmptyReplicas);
        }
        Ok(Self {
            primary,
            replicas: replicas.into(),
            selector,
        })
    }

    pub fn primary(&self) -> &Database {
        &self.primary
    }

    pub fn replicas(&self) -> &[ReplicaRoute] {
        &self.replicas
    }

    pub fn read_replica(&self) -> &Database {
        let idx = self.selector.select(&self.replicas) % self.replicas.len();
        &self.replicas[idx].db
    }
}

impl std::fmt::Debug for ReplicatedDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicatedDatabase")
            .field("primary", &self.primary.name())
            .field(
                "replicas",
                &self.replicas.iter().map(|r| r.db.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// What application code queries through.
#[derive(Clone, Debug)]
pub enum RoutingHandle {
    Standalone(Database),
    Replicated(ReplicatedDatabase),
}

impl RoutingHandle {
    pub fn mode(&self) -> TopologyMode {
        match self {
            RoutingHandle::Standalone(_) => TopologyMode::Standalone,
            RoutingHandle::Replicated(_) => TopologyMode::Replicated,
        }
    }

    pub fn primary(&self) -> &Database {
        match self {
            RoutingHandle::Standalone(db) => db,
            RoutingHandle::Replicated(r) => r.primary(),
        }
    }

    /// Target for writes: always the primary.
    pub fn writer(&self) -> &Database {
        self.primary()
    }

    /// Target for reads: the primary when standalone, a selected replica otherwise.
    pub fn reader(&self) -> &Database {
        match self {
            RoutingHandle::Standalone(db) => db,
            RoutingHandle::Replicated(r) => r.read_replica(),
        }
    }

    /// Replicas in configured order; empty when standalone.
    pub fn replicas(&self) -> &[ReplicaRoute] {
        match self {
            RoutingHandle::Standalone(_) => &[],
            RoutingHandle::Replicated(r) => r.replicas(),
        }
    }
}

