//! Offline request queue configuration

use std::time::Duration;

use serde::Deserialize;

use super::ValidationError;

/// Configuration for the offline request queue.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Maximum queued requests; beyond this the oldest low-priority entry is
    /// evicted, and enqueue fails if none exists.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Spacing between consecutive deliveries during a drain, so a long
    /// backlog does not hammer the endpoint.
    #[serde(default = "default_drain_spacing_ms")]
    pub drain_spacing_ms: u64,

    /// Retry budget applied when the caller does not specify one.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,

    /// Key under which queue state is persisted in the key-value store.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

fn default_capacity() -> usize {
    50
}

fn default_drain_spacing_ms() -> u64 {
    250
}

fn default_max_retries() -> u32 {
    3
}

fn default_storage_key() -> String {
    "botwire.offline_queue".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            drain_spacing_ms: default_drain_spacing_ms(),
            default_max_retries: default_max_retries(),
            storage_key: default_storage_key(),
        }
    }
}

impl QueueConfig {
    pub fn drain_spacing(&self) -> Duration {
        Duration::from_millis(self.drain_spacing_ms)
    }

    pub(super) fn validate(&self) -> Result<(), ValidationError> {
        if self.capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if self.storage_key.is_empty() {
            return Err(ValidationError::EmptyStorageKey);
        }
        Ok(())
    }
}
