//! Lifecycle coordinator: construct pools from a topology, verify them, expose the
//! routing handle, and drain everything on shutdown.
//!
//! States move strictly forward:
//! `Uninitialized -> Constructing -> Constructed -> Verifying -> Ready -> ShuttingDown -> Closed`.
//! A construction or verification failure lands in `Failed`; from there only
//! `shutdown` is accepted.

use crate::config::{
    resolve_primary, resolve_replicas, validate_topology, loader, PoolSettings, TopologyConfig,
    PRIMARY_POOL_NAME,
};
use crate::error::{ConfigurationError, Error, Result};
use crate::health::{self, VerificationReport};
use crate::pool::{PgPoolFactory, PoolFactory, PoolHandle};
use crate::registry::PoolRegistry;
use crate::routing::{Database, ReplicaRoute, ReplicaSelector, ReplicatedDatabase, RoundRobin, RoutingHandle};
use futures::future::join_all;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Constructing,
    Constructed,
    Verifying,
    Ready,
    ShuttingDown,
    Closed,
    Failed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Constructing => "constructing",
            LifecycleState::Constructed => "constructed",
            LifecycleState::Verifying => "verifying",
            LifecycleState::Ready => "ready",
            LifecycleState::ShuttingDown => "shutting down",
            LifecycleState::Closed => "closed",
            LifecycleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of [`PoolManager::shutdown`]. Close failures are collected here, never raised.
#[derive(Clone, Debug, Default)]
pub struct ShutdownReport {
    pub reason: Option<String>,
    pub closed: Vec<String>,
    pub errors: Vec<ConfigurationError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed_pools(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter_map(|e| match e {
                ConfigurationError::Close { pool, .. } => Some(pool.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct PoolManager {
    topology: TopologyConfig,
    factory: Arc<dyn PoolFactory>,
    selector: Arc<dyn ReplicaSelector>,
    state: Mutex<LifecycleState>,
    registry: Mutex<PoolRegistry>,
    routing: OnceLock<RoutingHandle>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PoolManager {
    /// Coordinator building sqlx Postgres pools.
    pub fn new(topology: TopologyConfig) -> Self {
        Self::with_factory(topology, Arc::new(PgPoolFactory))
    }

    pub fn with_factory(topology: TopologyConfig, factory: Arc<dyn PoolFactory>) -> Self {
        PoolManager {
            topology,
            factory,
            selector: Arc::new(RoundRobin::default()),
            state: Mutex::new(LifecycleState::Uninitialized),
            registry: Mutex::new(PoolRegistry::new()),
            routing: OnceLock::new(),
        }
    }

    /// Replace the read-replica selector. Only meaningful before `construct`.
    pub fn with_selector(mut self, selector: Arc<dyn ReplicaSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Build the coordinator from config produced by an async factory.
    pub async fn from_async<F, Fut, E>(factory: F) -> Result<Self, ConfigurationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<TopologyConfig, E>>,
        E: std::fmt::Display,
    {
        Ok(Self::new(loader::resolve_async(factory).await?))
    }

    pub fn topology(&self) -> &TopologyConfig {
        &self.topology
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    /// Registered pool names in construction order.
    pub fn pool_names(&self) -> Vec<String> {
        lock(&self.registry).names()
    }

    /// Query interface over one registered pool. Closing stays with the coordinator.
    pub fn pool(&self, name: &str) -> Option<Database> {
        let handle = lock(&self.registry).get(name).cloned()?;
        Some(Database::new(handle, self.topology.logging()))
    }

    fn transition(
        &self,
        operation: &'static str,
        from: &[LifecycleState],
        to: LifecycleState,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        if !from.contains(&*state) {
            return Err(Error::InvalidState {
                operation,
                state: *state,
            });
        }
        *state = to;
        Ok(())
    }

    fn set_state(&self, to: LifecycleState) {
        *lock(&self.state) = to;
    }

    /// Allocate one pool per topology target and build the routing handle. No network I/O.
    /// An invalid topology fails before any pool exists; the registry stays empty.
    pub fn construct(&self) -> Result<()> {
        self.transition("construct", &[LifecycleState::Uninitialized], LifecycleState::Constructing)?;
        let built = self.build();
        let mut state = lock(&self.state);
        if *state != LifecycleState::Constructing {
            return Err(Error::InvalidState {
                operation: "finish construct",
                state: *state,
            });
        }
        match built {
            Ok((registry, routing)) => {
                if self.routing.set(routing).is_err() {
                    *state = LifecycleState::Failed;
                    return Err(Error::InvalidState {
                        operation: "construct",
                        state: LifecycleState::Constructing,
                    });
                }
                *lock(&self.registry) = registry;
                *state = LifecycleState::Constructed;
                Ok(())
            }
            Err(e) => {
                *state = LifecycleState::Failed;
                Err(e.into())
            }
        }
    }

    fn build(&self) -> Result<(PoolRegistry, RoutingHandle), ConfigurationError> {
        validate_topology(&self.topology)?;
        let logging = self.topology.logging();
        let mut registry = PoolRegistry::new();

        let primary = self.create(PRIMARY_POOL_NAME, &PoolSettings::merge(Some(resolve_primary(&self.topology))));
        registry.register(PRIMARY_POOL_NAME, primary.clone());
        let primary = Database::new(primary, logging);

        let replicas = resolve_replicas(&self.topology);
        if replicas.is_empty() {
            return Ok((registry, RoutingHandle::Standalone(primary)));
        }

        let mut routes = Vec::with_capacity(replicas.len());
        for replica in replicas {
            let handle = self.create(&replica.name, &PoolSettings::merge(Some(&replica.pool)));
            registry.register(replica.name.clone(), handle.clone());
            routes.push(ReplicaRoute {
                db: Database::new(handle, logging),
                weight: replica.weight,
                priority: replica.priority,
            });
        }
        tracing::info!(replicas = routes.len(), "initialized replica pools");
        let composite = ReplicatedDatabase::new(primary, routes, self.selector.clone())?;
        Ok((registry, RoutingHandle::Replicated(composite)))
    }

    fn create(&self, name: &str, settings: &PoolSettings) -> PoolHandle {
        let pool = self.factory.create_pool(name, settings);
        PoolHandle::new(name, pool, settings.clone())
    }

    /// Probe every registered pool. On failure the error is returned unchanged, pools stay
    /// allocated, and the coordinator accepts only `shutdown` from then on.
    ///
    /// A `shutdown` that lands while the probes are in flight wins: the state stays
    /// where shutdown left it and `init` returns `InvalidState`.
    pub async fn init(&self) -> Result<VerificationReport> {
        self.transition("init", &[LifecycleState::Constructed], LifecycleState::Verifying)?;
        tracing::info!(mode = %self.topology.mode(), "pool manager initializing");
        let snapshot = lock(&self.registry).clone();
        match health::verify(&snapshot).await {
            Ok(report) => {
                self.transition("finish init", &[LifecycleState::Verifying], LifecycleState::Ready)?;
                Ok(report)
            }
            Err(e) => {
                self.transition("finish init", &[LifecycleState::Verifying], LifecycleState::Failed)?;
                Err(e.into())
            }
        }
    }

    /// Host start hook: `construct` then `init`.
    pub async fn on_init(&self) -> Result<VerificationReport> {
        self.construct()?;
        self.init().await
    }

    /// Re-run connectivity verification without changing lifecycle state.
    pub async fn verify_connections(&self) -> Result<VerificationReport> {
        let state = self.state();
        if matches!(
            state,
            LifecycleState::Uninitialized
                | LifecycleState::Constructing
                | LifecycleState::ShuttingDown
                | LifecycleState::Closed
        ) {
            return Err(Error::InvalidState {
                operation: "verify connections",
                state,
            });
        }
        let snapshot = lock(&self.registry).clone();
        Ok(health::verify(&snapshot).await?)
    }

    /// The handle built by `construct`. Available once `Ready`.
    pub fn routing_handle(&self) -> Result<RoutingHandle> {
        let state = self.state();
        match (state, self.routing.get()) {
            (LifecycleState::Ready | LifecycleState::ShuttingDown | LifecycleState::Closed, Some(handle)) => {
                Ok(handle.clone())
            }
            _ => Err(Error::InvalidState {
                operation: "get routing handle",
                state,
            }),
        }
    }

    /// Alias for [`PoolManager::routing_handle`].
    pub fn db(&self) -> Result<RoutingHandle> {
        self.routing_handle()
    }

    /// Drain every registered pool concurrently and clear the registry. Never fails: each
    /// close failure is logged and returned in the report. Repeated calls are no-ops.
    pub async fn shutdown(&self, reason: Option<&str>) -> ShutdownReport {
        {
            let mut state = lock(&self.state);
            let current = *state;
            if matches!(current, LifecycleState::ShuttingDown | LifecycleState::Closed) {
                tracing::warn!(state = %current, "shutdown already requested");
                return ShutdownReport {
                    reason: reason.map(str::to_string),
                    ..Default::default()
                };
            }
            *state = LifecycleState::ShuttingDown;
        }
        tracing::info!(reason = reason.unwrap_or("none"), "shutting down pool manager");

        let handles: Vec<PoolHandle> = lock(&self.registry)
            .all()
            .map(|(_, handle)| handle.clone())
            .collect();
        tracing::info!(pools = handles.len(), "closing all database connections");

        let closes = handles.iter().map(|handle| async move {
            match handle.drain().await {
                Ok(()) => {
                    tracing::info!(pool = handle.name(), "closed connection pool");
                    Ok(handle.name().to_string())
                }
                Err(e) => {
                    let err = ConfigurationError::Close {
                        pool: handle.name().to_string(),
                        reason: e.to_string(),
                    };
                    tracing::error!(pool = handle.name(), error = %err, "failed to close pool");
                    Err(err)
                }
            }
        });

        let mut report = ShutdownReport {
            reason: reason.map(str::to_string),
            ..Default::default()
        };
        for result in join_all(closes).await {
            match result {
                Ok(name) => report.closed.push(name),
                Err(e) => report.errors.push(e),
            }
        }

        lock(&self.registry).clear();
        self.set_state(LifecycleState::Closed);
        tracing::info!(
            closed = report.closed.len(),
            failed = report.errors.len(),
            "all pools have been closed"
        );
        report
    }

    /// Host stop hook.
    pub async fn on_shutdown(&self, reason: Option<&str>) -> ShutdownReport {
        self.shutdown(reason).await
    }
}

impl std::fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolManager")
            .field("mode", &self.topology.mode())
            .field("state", &self.state())
            .field("pools", &self.pool_names())
            .finish()
    }
}
