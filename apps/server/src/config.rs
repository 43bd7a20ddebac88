//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server port
    pub http_port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Payment gateway base URL
    pub gateway_base_url: String,

    /// Payment gateway API key (basic-auth username)
    pub gateway_api_key: String,

    /// Bounded timeout for every gateway call, in seconds.
    /// A hung gateway must never hang a request handler.
    pub gateway_timeout_secs: u64,

    /// How long a created invoice stays payable, in seconds
    pub invoice_duration_secs: u64,

    /// Where the gateway redirects the customer after successful payment
    pub success_redirect_url: String,

    /// Where the gateway redirects the customer after failed payment
    pub failure_redirect_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./kasa.db".to_string()),

            gateway_base_url: env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.gateway.example".to_string()),

            gateway_api_key: env::var("GATEWAY_API_KEY").unwrap_or_else(|_| {
                // Usable for local development against a sandbox
                // In production, this MUST be set via environment variable
                "sandbox-api-key".to_string()
            }),

            gateway_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_TIMEOUT_SECS".to_string()))?,

            invoice_duration_secs: env::var("INVOICE_DURATION_SECS")
                .unwrap_or_else(|_| "86400".to_string()) // 24 hours
                .parse()
                .map_err(|_| ConfigError::InvalidValue("INVOICE_DURATION_SECS".to_string()))?,

            success_redirect_url: env::var("SUCCESS_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:3000/payment/success".to_string()),

            failure_redirect_url: env::var("FAILURE_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:3000/payment/failed".to_string()),
        };

        if config.gateway_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
