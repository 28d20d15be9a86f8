//! Real-time channel configuration

use std::time::Duration;

use serde::Deserialize;

use crate::domain::connection::ReconnectPolicy;

use super::ValidationError;

/// Configuration for the real-time connection core and channel adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Base URL for channel endpoints; the bot id is appended per channel.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// How long a connection attempt may take before it is abandoned.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Interval between heartbeat pings once connected.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Grace period after connecting before the first ping.
    #[serde(default = "default_heartbeat_grace_ms")]
    pub heartbeat_grace_ms: u64,

    /// Minimum spacing between connection attempts; rapid UI-triggered
    /// reconnects are debounced to this.
    #[serde(default = "default_min_connect_spacing_ms")]
    pub min_connect_spacing_ms: u64,

    /// Capacity of the pending-send queue; overflow drops the oldest frame.
    #[serde(default = "default_pending_send_capacity")]
    pub pending_send_capacity: usize,

    /// Inactivity window after which an automatic "typing stopped" fires.
    #[serde(default = "default_typing_stop_after_ms")]
    pub typing_stop_after_ms: u64,

    /// Reconnect pacing and budget.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

fn default_base_url() -> String {
    "ws://localhost:8080/realtime".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_grace_ms() -> u64 {
    5_000
}

fn default_min_connect_spacing_ms() -> u64 {
    1_000
}

fn default_pending_send_capacity() -> usize {
    100
}

fn default_typing_stop_after_ms() -> u64 {
    4_000
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_grace_ms: default_heartbeat_grace_ms(),
            min_connect_spacing_ms: default_min_connect_spacing_ms(),
            pending_send_capacity: default_pending_send_capacity(),
            typing_stop_after_ms: default_typing_stop_after_ms(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl RealtimeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_grace(&self) -> Duration {
        Duration::from_millis(self.heartbeat_grace_ms)
    }

    pub fn min_connect_spacing(&self) -> Duration {
        Duration::from_millis(self.min_connect_spacing_ms)
    }

    pub fn typing_stop_after(&self) -> Duration {
        Duration::from_millis(self.typing_stop_after_ms)
    }

    /// Builds the endpoint URL for one bot's channel.
    pub fn channel_endpoint(&self, bot_id: &str) -> String {
        format!("{}/channels/{}", self.base_url.trim_end_matches('/'), bot_id)
    }

    pub(super) fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("ws://") && !self.base_url.starts_with("wss://") {
            return Err(ValidationError::InvalidRealtimeBaseUrl);
        }
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::InvalidConnectTimeout);
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ValidationError::InvalidHeartbeatInterval);
        }
        if self.reconnect.max_attempts == 0 {
            return Err(ValidationError::InvalidReconnectBudget);
        }
        if self.pending_send_capacity == 0 {
            return Err(ValidationError::InvalidPendingSendCapacity);
        }
        Ok(())
    }
}
