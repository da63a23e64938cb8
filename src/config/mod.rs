//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `PARLEY` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use parley::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod messaging;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use messaging::MessagingConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection. Absent means the in-memory store.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Live push settings
    #[serde(default)]
    pub messaging: MessagingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `.env` if present, then variables such as:
    ///
    /// - `PARLEY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PARLEY__DATABASE__URL=...` -> `database.url = ...`
    /// - `PARLEY__MESSAGING__SUBSCRIBER_QUEUE_CAPACITY=512`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PARLEY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.messaging.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
