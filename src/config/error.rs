//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("API base URL must start with http:// or https://")]
    InvalidApiBaseUrl,

    #[error("Realtime base URL must start with ws:// or wss://")]
    InvalidRealtimeBaseUrl,

    #[error("Connect timeout must be greater than zero")]
    InvalidConnectTimeout,

    #[error("Heartbeat interval must be greater than zero")]
    InvalidHeartbeatInterval,

    #[error("Reconnect attempt budget must be at least 1")]
    InvalidReconnectBudget,

    #[error("Pending-send queue capacity must be greater than zero")]
    InvalidPendingSendCapacity,

    #[error("Offline queue capacity must be greater than zero")]
    InvalidQueueCapacity,

    #[error("Offline queue storage key cannot be empty")]
    EmptyStorageKey,
}
