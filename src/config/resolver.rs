//! Topology resolution: which pools to build, and under which names.

use crate::config::{PoolConfig, ReplicaConfig, TopologyConfig};
use crate::error::ConfigurationError;
use std::collections::HashSet;

/// Registry key of the primary pool. Replicas may not use it.
pub const PRIMARY_POOL_NAME: &str = "primary";

/// Primary pool options: `database` in standalone mode, `primary` in replicated mode.
pub fn resolve_primary(topology: &TopologyConfig) -> &PoolConfig {
    match topology {
        TopologyConfig::Standalone(c) => &c.database,
        TopologyConfig::Replicated(c) => &c.primary,
    }
}

/// Replicas in configured order. Empty for standalone; an empty replicated list is
/// returned as-is and rejected later by [`validate_topology`].
pub fn resolve_replicas(topology: &TopologyConfig) -> &[ReplicaConfig] {
    match topology {
        TopologyConfig::Standalone(_) => &[],
        TopologyConfig::Replicated(c) => &c.replicas,
    }
}

/// Checks the invariants the lifecycle needs before any pool is allocated:
/// replicated mode has at least one replica, and every replica name is unique and not `primary`.
pub fn validate_topology(topology: &TopologyConfig) -> Result<(), ConfigurationError> {
    let TopologyConfig::Replicated(c) = topology else {
        return Ok(());
    };
    if c.replicas.is_empty() {
        return Err(ConfigurationError::EmptyReplicas);
    }
    let mut seen = HashSet::with_capacity(c.replicas.len());
    for replica in &c.replicas {
        if replica.name == PRIMARY_POOL_NAME {
            return Err(ConfigurationError::ReservedName(replica.name.clone()));
        }
        if !seen.insert(replica.name.as_str()) {
            return Err(ConfigurationError::DuplicateReplicaName(replica.name.clone()));
        }
    }
    Ok(())
}
