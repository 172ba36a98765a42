//! pg-topology: PostgreSQL pool lifecycle and primary/replica topology manager.

pub mod config;
pub mod error;
pub mod health;
pub mod manager;
pub mod pool;
pub mod registry;
pub mod routes;
pub mod routing;
pub mod state;

pub use config::{PoolConfig, PoolSettings, ReplicaConfig, TopologyConfig, TopologyMode, PRIMARY_POOL_NAME};
pub use error::{ConfigurationError, Error, PoolError};
pub use health::{verify, ProbeOutcome, VerificationReport, PROBE_QUERY};
pub use manager::{LifecycleState, PoolManager, ShutdownReport};
pub use pool::{create_pool, ConnectionPool, PgPoolFactory, PoolConnection, PoolFactory, PoolHandle};
pub use registry::PoolRegistry;
pub use routes::{common_routes, common_routes_with_ready};
pub use routing::{Database, ReplicaRoute, ReplicaSelector, RoundRobin, RoutingHandle};
pub use state::AppState;
