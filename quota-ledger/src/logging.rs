//! Tracing subscriber setup
//!
//! The engine only emits `tracing` events; hosts call [`init_tracing`] once
//! at startup to decide where they go.
//!
//! Structured fields used across the crate: `quota_id`, `sender`,
//! `operation`, `code`, `height`, `sequence`.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| Error::Config(format!("Invalid log level {:?}: {}", config.level, e))),
    }
}

/// Install the global subscriber
///
/// Fails with [`Error::Config`] if the level is invalid or a subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {}", e)))
}
