//! Shared state for the readiness routes.

use crate::manager::PoolManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Same coordinator the host calls `on_shutdown` on.
    pub manager: Arc<PoolManager>,
}

impl AppState {
    pub fn new(manager: Arc<PoolManager>) -> Self {
        Self { manager }
    }
}
