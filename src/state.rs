//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::batch::BatchOrchestrator;
use crate::config::Settings;
use crate::registry::Registry;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// The registry (has internal locking)
    pub registry: Registry,

    /// JWT secret key for token signing
    pub jwt_secret: String,

    /// Whether `/api/auth/dev-token` may mint tokens
    pub allow_dev_tokens: bool,

    pub max_batch_size: usize,
}

impl AppState {
    pub fn new(registry: Registry, settings: &Settings) -> Self {
        Self {
            registry,
            jwt_secret: settings.auth.jwt_secret.clone(),
            allow_dev_tokens: settings.auth.allow_dev_tokens,
            max_batch_size: settings.registry.max_batch_size,
        }
    }

    pub fn batch(&self) -> BatchOrchestrator<'_> {
        BatchOrchestrator::new(&self.registry).with_max_batch_size(self.max_batch_size)
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
