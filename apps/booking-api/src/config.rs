//! Booking API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults.

use std::env;

/// Booking API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Hold lifetime in minutes
    pub hold_ttl_minutes: i64,

    /// Seconds between janitor sweeps for stale holds
    pub janitor_interval_secs: u64,

    /// Hours a hold stays expired before the janitor marks it cancelled
    pub janitor_grace_hours: i64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "marquee.db".to_string()),

            hold_ttl_minutes: env::var("HOLD_TTL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HOLD_TTL_MINUTES".to_string()))?,

            janitor_interval_secs: env::var("JANITOR_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string()) // 5 minutes
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JANITOR_INTERVAL_SECS".to_string()))?,

            janitor_grace_hours: env::var("JANITOR_GRACE_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JANITOR_GRACE_HOURS".to_string()))?,
        };

        if config.hold_ttl_minutes < 1 {
            return Err(ConfigError::InvalidValue("HOLD_TTL_MINUTES".to_string()));
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
