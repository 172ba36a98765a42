//! Pool defaults and the shallow merge of caller options over them.

use crate::config::PoolConfig;
use std::time::Duration;

/// Env var consulted when no connection string is configured.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_KEEP_ALIVE: bool = true;
pub const DEFAULT_ALLOW_EXIT_ON_IDLE: bool = false;

/// Fully resolved pool options: caller values where given, defaults everywhere else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    pub connection_string: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Duration,
    pub keep_alive: bool,
    pub allow_exit_on_idle: bool,
}

impl PoolSettings {
    /// Defaults only, with the connection string taken from `fallback_url`.
    pub fn defaults(fallback_url: Option<String>) -> Self {
        PoolSettings {
            connection_string: fallback_url,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            keep_alive: DEFAULT_KEEP_ALIVE,
            allow_exit_on_idle: DEFAULT_ALLOW_EXIT_ON_IDLE,
        }
    }

    /// Merge `config` over the defaults, using `DATABASE_URL` as the last-resort connection string.
    pub fn merge(config: Option<&PoolConfig>) -> Self {
        Self::merge_with_fallback(config, std::env::var(DATABASE_URL_ENV).ok())
    }

    /// Shallow override: each field the caller set replaces the default, nothing is merged deeper.
    pub fn merge_with_fallback(config: Option<&PoolConfig>, fallback_url: Option<String>) -> Self {
        let defaults = Self::defaults(fallback_url);
        let Some(config) = config else {
            return defaults;
        };
        PoolSettings {
            connection_string: config.connection_string.clone().or(defaults.connection_string),
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
            max_connections: config.max.unwrap_or(defaults.max_connections),
            connection_timeout: config
                .connection_timeout_millis
                .map(Duration::from_millis)
                .unwrap_or(defaults.connection_timeout),
            idle_timeout: config
                .idle_timeout_millis
                .map(Duration::from_millis)
                .unwrap_or(defaults.idle_timeout),
            keep_alive: config.keep_alive.unwrap_or(defaults.keep_alive),
            allow_exit_on_idle: config.allow_exit_on_idle.unwrap_or(defaults.allow_exit_on_idle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged(config: PoolConfig) -> PoolSettings {
        PoolSettings::merge_with_fallback(Some(&config), Some("postgres://env/db".into()))
    }

    #[test]
    fn absent_config_yields_documented_defaults() {
        let s = PoolSettings::merge_with_fallback(None, Some("postgres://env/db".into()));
        assert_eq!(s.connection_string.as_deref(), Some("postgres://env/db"));
        assert_eq!(s.max_connections, 10);
        assert_eq!(s.connection_timeout, Duration::from_millis(10_000));
        assert_eq!(s.idle_timeout, Duration::from_millis(30_000));
        assert!(s.keep_alive);
        assert!(!s.allow_exit_on_idle);
    }

    #[test]
    fn empty_config_behaves_like_absent_config() {
        let fallback = Some("postgres://env/db".to_string());
        assert_eq!(
            PoolSettings::merge_with_fallback(Some(&PoolConfig::new()), fallback.clone()),
            PoolSettings::merge_with_fallback(None, fallback)
        );
    }

    #[test]
    fn max_override() {
        let s = merged(PoolConfig::new().with_max(25));
        assert_eq!(s.max_connections, 25);
        assert_eq!(s.connection_timeout, DEFAULT_CONNECTION_TIMEOUT);
    }

    #[test]
    fn connection_timeout_override() {
        let s = merged(PoolConfig::new().with_connection_timeout_millis(1_500));
        assert_eq!(s.connection_timeout, Duration::from_millis(1_500));
        assert_eq!(s.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn idle_timeout_override() {
        let s = merged(PoolConfig::new().with_idle_timeout_millis(0));
        assert_eq!(s.idle_timeout, Duration::ZERO);
        assert_eq!(s.keep_alive, DEFAULT_KEEP_ALIVE);
    }

    #[test]
    fn keep_alive_override() {
        let s = merged(PoolConfig::new().with_keep_alive(false));
        assert!(!s.keep_alive);
        assert_eq!(s.idle_timeout, DEFAULT_IDLE_TIMEOUT);
    }

    #[test]
    fn allow_exit_on_idle_override() {
        let s = merged(PoolConfig::new().with_allow_exit_on_idle(true));
        assert!(s.allow_exit_on_idle);
        assert_eq!(s.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn caller_connection_string_wins_over_env_fallback() {
        let s = merged(PoolConfig::new().with_connection_string("postgres://explicit/db"));
        assert_eq!(s.connection_string.as_deref(), Some("postgres://explicit/db"));
    }

    #[test]
    fn discrete_fields_keep_env_fallback_as_base() {
        let s = merged(PoolConfig::new().with_host("replica.internal").with_port(6432));
        assert_eq!(s.connection_string.as_deref(), Some("postgres://env/db"));
        assert_eq!(s.host.as_deref(), Some("replica.internal"));
        assert_eq!(s.port, Some(6432));
    }

    #[test]
    fn no_fallback_leaves_connection_string_unset() {
        let s = PoolSettings::merge_with_fallback(None, None);
        assert!(s.connection_string.is_none());
    }
}
