//! Runtime configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Business settings (numbering, company state, GST rate) live in
//! the `settings` table, not here.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DbConfig;

/// Process-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreightConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// How long a writer waits for the lock before giving up
    pub busy_timeout_secs: u64,

    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl FreightConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup (tests, embedding).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = FreightConfig {
            database_path: lookup("FREIGHT_DATABASE_PATH")
                .unwrap_or_else(|| "./freight.db".to_string())
                .into(),

            max_connections: lookup("FREIGHT_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FREIGHT_DB_MAX_CONNECTIONS".to_string()))?,

            busy_timeout_secs: lookup("FREIGHT_DB_BUSY_TIMEOUT_SECS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("FREIGHT_DB_BUSY_TIMEOUT_SECS".to_string())
                })?,

            log_filter: lookup("FREIGHT_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "FREIGHT_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
