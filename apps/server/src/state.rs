//! Shared application state for HTTP handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::gateway::PaymentGateway;
use kasa_db::Database;

/// Shared application state.
///
/// Cloned per request by axum; everything inside is cheap to clone
/// (pool handle, Arcs).
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub gateway: Arc<dyn PaymentGateway>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Creates application state from its parts.
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>, config: ServerConfig) -> Self {
        AppState {
            db,
            gateway,
            config: Arc::new(config),
        }
    }
}
