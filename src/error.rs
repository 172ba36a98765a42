//! Typed errors for topology configuration, pool primitives and lifecycle misuse, and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Configuration-level failures. One error kind; the variant carries the context
/// (bad topology, unreachable pools, failed close) that the message reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("\"replicas\" must be a non-empty array when running in replicated mode.")]
    EmptyReplicas,
    #[error("duplicate replica name: {0}")]
    DuplicateReplicaName(String),
    #[error("replica name \"{0}\" is reserved for the primary pool")]
    ReservedName(String),
    #[error("Database connection failed for: {}", .pools.join(", "))]
    ConnectionFailed { pools: Vec<String> },
    #[error("Error closing pool \"{pool}\": {reason}")]
    Close { pool: String, reason: String },
    #[error("config load: {0}")]
    Load(String),
}

/// Failures raised by an individual pool primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("acquire failed: {0}")]
    Acquire(String),
    #[error("execute failed: {0}")]
    Execute(String),
    #[error("drain failed: {0}")]
    Drain(String),
    #[error("pool is closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigurationError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::manager::LifecycleState,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code, details) = match &self {
            Error::Config(ConfigurationError::ConnectionFailed { pools }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "connection_failed",
                Some(serde_json::json!({ "pools": pools })),
            ),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None),
            Error::Pool(_) => (StatusCode::SERVICE_UNAVAILABLE, "pool_error", None),
            Error::InvalidState { state, .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "not_ready",
                Some(serde_json::json!({ "state": state.to_string() })),
            ),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
