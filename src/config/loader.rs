//! Load topology config from JSON text, a file, or an async factory.

use crate::config::TopologyConfig;
use crate::error::ConfigurationError;
use std::future::Future;
use std::path::Path;

pub fn from_json_str(json: &str) -> Result<TopologyConfig, ConfigurationError> {
    serde_json::from_str(json).map_err(|e| ConfigurationError::Load(e.to_string()))
}

/// Read and parse a topology JSON file.
pub async fn from_path(path: impl AsRef<Path>) -> Result<TopologyConfig, ConfigurationError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading topology config");
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigurationError::Load(format!("{}: {}", path.display(), e)))?;
    from_json_str(&raw)
}

/// Resolve config produced asynchronously (secrets lookup, remote config, ...).
/// Factory errors surface as [`ConfigurationError::Load`].
pub async fn resolve_async<F, Fut, E>(factory: F) -> Result<TopologyConfig, ConfigurationError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<TopologyConfig, E>>,
    E: std::fmt::Display,
{
    factory()
        .await
        .map_err(|e| ConfigurationError::Load(e.to_string()))
}
