//! Pool primitive and factory.
//!
//! A pool is anything that can hand out a connection, run a statement on it, take it
//! back, and drain itself. [`PgConnectionPool`] is the sqlx-backed implementation;
//! [`PoolFactory`] is the seam the lifecycle uses to build one per configured target.
//!
//! ```rust,ignore
//! use pg_topology::config::PoolConfig;
//! use pg_topology::pool::create_pool;
//!
//! let handle = create_pool("primary", Some(&PoolConfig::new().with_max(5)));
//! handle.execute("SELECT 1").await?;
//! ```

use crate::config::{PoolConfig, PoolSettings};
use crate::error::PoolError;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A connection checked out of a pool.
#[async_trait]
pub trait PoolConnection: Send {
    /// Run a statement, returning the number of rows affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, PoolError>;

    /// Hand the connection back to its pool.
    fn release(self: Box<Self>);
}

#[async_trait]
pub trait ConnectionPool: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn PoolConnection>, PoolError>;

    /// Close idle connections, wait for checked-out ones, and refuse further acquires.
    async fn drain(&self) -> Result<(), PoolError>;

    fn is_closed(&self) -> bool;

    /// Open connections (idle + in use).
    fn size(&self) -> u32 {
        0
    }

    fn idle(&self) -> usize {
        0
    }

    /// The sqlx pool behind this handle, when there is one.
    fn as_pg(&self) -> Option<&PgPool> {
        None
    }
}

/// Builds one pool from fully merged settings. Must not connect and must not fail:
/// anything wrong with the settings surfaces on the first `acquire`.
pub trait PoolFactory: Send + Sync {
    fn create_pool(&self, name: &str, settings: &PoolSettings) -> Arc<dyn ConnectionPool>;
}

/// A named live pool. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct PoolHandle {
    name: String,
    pool: Arc<dyn ConnectionPool>,
    settings: PoolSettings,
}

impl PoolHandle {
    pub fn new(name: impl Into<String>, pool: Arc<dyn ConnectionPool>, settings: PoolSettings) -> Self {
        Self {
            name: name.into(),
            pool,
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn as_pg(&self) -> Option<&PgPool> {
        self.pool.as_pg()
    }

    /// True when both handles share the same underlying pool.
    pub fn same_pool(&self, other: &PoolHandle) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool)
    }

    pub async fn acquire(&self) -> Result<Box<dyn PoolConnection>, PoolError> {
        self.pool.acquire().await
    }

    /// Acquire, run `sql`, release. The connection goes back even when the statement fails.
    pub async fn execute(&self, sql: &str) -> Result<u64, PoolError> {
        let mut conn = self.pool.acquire().await?;
        let result = conn.execute(sql).await;
        conn.release();
        result
    }

    /// Only the lifecycle coordinator drains registered pools.
    pub(crate) async fn drain(&self) -> Result<(), PoolError> {
        self.pool.drain().await
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("name", &self.name)
            .field("max_connections", &self.settings.max_connections)
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}

/// [`ConnectionPool`] over a lazily connecting `sqlx::PgPool`.
#[derive(Clone, Debug)]
pub struct PgConnectionPool {
    pool: PgPool,
}

impl PgConnectionPool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn inner(&self) -> &PgPool {
        &self.pool
    }
}

struct PgPooledConnection(sqlx::pool::PoolConnection<Postgres>);

#[async_trait]
impl PoolConnection for PgPooledConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64, PoolError> {
        let done = sqlx::query(sql)
            .execute(&mut *self.0)
            .await
            .map_err(|e| PoolError::Execute(e.to_string()))?;
        Ok(done.rows_affected())
    }

    fn release(self: Box<Self>) {
        // Dropping a sqlx PoolConnection returns it to the pool.
        drop(self.0);
    }
}

#[async_trait]
impl ConnectionPool for PgConnectionPool {
    async fn acquire(&self) -> Result<Box<dyn PoolConnection>, PoolError> {
        if self.pool.is_closed() {
            return Err(PoolError::Closed);
        }
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PoolError::Acquire(e.to_string()))?;
        Ok(Box::new(PgPooledConnection(conn)))
    }

    async fn drain(&self) -> Result<(), PoolError> {
        self.pool.close().await;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    fn size(&self) -> u32 {
        self.pool.size()
    }

    fn idle(&self) -> usize {
        self.pool.num_idle()
    }

    fn as_pg(&self) -> Option<&PgPool> {
        Some(&self.pool)
    }
}

/// Default factory: sqlx Postgres pools that connect on first use.
#[derive(Clone, Copy, Debug, Default)]
pub struct PgPoolFactory;

impl PgPoolFactory {
    /// Connection options: the connection string (or libpq env vars when absent), with
    /// any discrete host fields layered on top.
    pub fn connect_options(settings: &PoolSettings) -> Result<PgConnectOptions, sqlx::Error> {
        let mut opts = match settings.connection_string.as_deref() {
            Some(url) => PgConnectOptions::from_str(url)?,
            None => PgConnectOptions::new(),
        };
        if let Some(host) = &settings.host {
            opts = opts.host(host);
        }
        if let Some(port) = settings.port {
            opts = opts.port(port);
        }
        if let Some(user) = &settings.user {
            opts = opts.username(user);
        }
        if let Some(password) = &settings.password {
            opts = opts.password(password);
        }
        if let Some(database) = &settings.database {
            opts = opts.database(database);
        }
        Ok(opts)
    }

    /// Limits and timeouts. `allow_exit_on_idle` has no tokio counterpart and is only
    /// recorded on the settings; no connections are held open in either case.
    pub fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(0)
            .acquire_timeout(settings.connection_timeout)
            .idle_timeout(settings.idle_timeout)
            .test_before_acquire(settings.keep_alive)
    }
}

/// Stands in for a pool whose connection string could not be parsed. Every acquire
/// fails with the parse error, so verification reports it like any unreachable pool.
#[derive(Debug)]
struct MisconfiguredPool {
    reason: String,
    closed: AtomicBool,
}

#[async_trait]
impl ConnectionPool for MisconfiguredPool {
    async fn acquire(&self) -> Result<Box<dyn PoolConnection>, PoolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }
        Err(PoolError::Acquire(self.reason.clone()))
    }

    async fn drain(&self) -> Result<(), PoolError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl PoolFactory for PgPoolFactory {
    fn create_pool(&self, name: &str, settings: &PoolSettings) -> Arc<dyn ConnectionPool> {
        let connect = match Self::connect_options(settings) {
            Ok(connect) => connect,
            Err(e) => {
                tracing::warn!(pool = name, error = %e, "invalid connection string");
                return Arc::new(MisconfiguredPool {
                    reason: format!("invalid connection string: {}", e),
                    closed: AtomicBool::new(false),
                });
            }
        };
        let pool = Self::pool_options(settings).connect_lazy_with(connect);
        tracing::debug!(
            pool = name,
            max_connections = settings.max_connections,
            "created lazy pool"
        );
        Arc::new(PgConnectionPool::new(pool))
    }
}

/// Merge `config` over the defaults and build a lazily connecting Postgres pool.
pub fn create_pool(name: &str, config: Option<&PoolConfig>) -> PoolHandle {
    let settings = PoolSettings::merge(config);
    let pool = PgPoolFactory.create_pool(name, &settings);
    PoolHandle::new(name, pool, settings)
}
