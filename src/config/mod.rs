//! Client configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `BOTWIRE` prefix
//! and `__` (double underscore) as the nesting separator, e.g.
//! `BOTWIRE__REALTIME__HEARTBEAT_INTERVAL_MS=15000`.
//!
//! # Example
//!
//! ```no_run
//! use botwire::config::ClientConfig;
//!
//! let config = ClientConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod api;
mod error;
mod queue;
mod realtime;

pub use api::ApiConfig;
pub use error::{ConfigError, ValidationError};
pub use queue::QueueConfig;
pub use realtime::RealtimeConfig;

use serde::Deserialize;

/// Root configuration for the real-time core.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Request/response API configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// Real-time channel configuration.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Offline request queue configuration.
    #[serde(default)]
    pub queue: QueueConfig,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Loads a `.env` file if present (development), then reads variables
    /// with the `BOTWIRE` prefix into the typed sections.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into the expected
    /// types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BOTWIRE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any value is semantically invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.api.validate()?;
        self.realtime.validate()?;
        self.queue.validate()?;
        Ok(())
    }
}
