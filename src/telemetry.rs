//! Tracing subscriber setup.

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides `server.log_level`. Production logs are JSON,
/// everything else is human readable.
pub fn init_tracing(server: &ServerConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .map_err(|e| TelemetryError::Filter(e.to_string()))?;

    if server.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init()
            .map_err(|e| TelemetryError::Init(e.to_string()))
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .map_err(|e| TelemetryError::Init(e.to_string()))
    }
}
