//! Raw topology config types matching the JSON options accepted by the host application.

use serde::{Deserialize, Serialize};

/// Connection and limit options for one pool. Every field is optional; absent fields
/// fall back to the documented defaults (see [`crate::config::PoolSettings`]).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Maximum number of connections in the pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// How long to wait for a connection before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout_millis: Option<u64>,
    /// How long a connection may sit idle before it is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_exit_on_idle: Option<bool>,
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection_string(mut self, url: impl Into<String>) -> Self {
        self.connection_string = Some(url.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_max(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_connection_timeout_millis(mut self, millis: u64) -> Self {
        self.connection_timeout_millis = Some(millis);
        self
    }

    pub fn with_idle_timeout_millis(mut self, millis: u64) -> Self {
        self.idle_timeout_millis = Some(millis);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn with_allow_exit_on_idle(mut self, allow: bool) -> Self {
        self.allow_exit_on_idle = Some(allow);
        self
    }
}

fn default_weight() -> u32 {
    1
}

/// A named read replica. `weight` and `priority` are carried through to the routing
/// handle untouched; nothing in this crate computes with them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaConfig {
    pub name: String,
    #[serde(flatten)]
    pub pool: PoolConfig,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub priority: u32,
}

impl ReplicaConfig {
    pub fn new(name: impl Into<String>, pool: PoolConfig) -> Self {
        Self {
            name: name.into(),
            pool,
            weight: default_weight(),
            priority: 0,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandaloneConfig {
    #[serde(default)]
    pub database: PoolConfig,
    /// Opaque schema, forwarded to the query layer.
    #[serde(default)]
    pub schema: serde_json::Value,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub logging: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicatedConfig {
    #[serde(default)]
    pub primary: PoolConfig,
    /// Order matters: it fixes each replica's index in the routing handle.
    #[serde(default)]
    pub replicas: Vec<ReplicaConfig>,
    #[serde(default)]
    pub schema: serde_json::Value,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub logging: bool,
}

/// Mode-tagged topology: `{"mode": "standalone", ...}` or `{"mode": "replicated", ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TopologyConfig {
    Standalone(StandaloneConfig),
    Replicated(ReplicatedConfig),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyMode {
    Standalone,
    Replicated,
}

impl std::fmt::Display for TopologyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyMode::Standalone => f.write_str("standalone"),
            TopologyMode::Replicated => f.write_str("replicated"),
        }
    }
}

impl TopologyConfig {
    pub fn standalone(database: PoolConfig) -> Self {
        TopologyConfig::Standalone(StandaloneConfig {
            database,
            schema: serde_json::Value::Null,
            is_global: false,
            logging: false,
        })
    }

    pub fn replicated(primary: PoolConfig, replicas: Vec<ReplicaConfig>) -> Self {
        TopologyConfig::Replicated(ReplicatedConfig {
            primary,
            replicas,
            schema: serde_json::Value::Null,
            is_global: false,
            logging: false,
        })
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        match &mut self {
            TopologyConfig::Standalone(c) => c.logging = enabled,
            TopologyConfig::Replicated(c) => c.logging = enabled,
        }
        self
    }

    pub fn mode(&self) -> TopologyMode {
        match self {
            TopologyConfig::Standalone(_) => TopologyMode::Standalone,
            TopologyConfig::Replicated(_) => TopologyMode::Replicated,
        }
    }

    pub fn schema(&self) -> &serde_json::Value {
        match self {
            TopologyConfig::Standalone(c) => &c.schema,
            TopologyConfig::Replicated(c) => &c.schema,
        }
    }

    /// Forwarded to the host module system; has no effect here.
    pub fn is_global(&self) -> bool {
        match self {
            TopologyConfig::Standalone(c) => c.is_global,
            TopologyConfig::Replicated(c) => c.is_global,
        }
    }

    pub fn logging(&self) -> bool {
        match self {
            TopologyConfig::Standalone(c) => c.logging,
            TopologyConfig::Replicated(c) => c.logging,
        }
    }
}
