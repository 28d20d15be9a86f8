//! Exponential backoff policy for reconnection attempts.

use std::time::Duration;

use serde::Deserialize;

/// Policy governing reconnect pacing and budget.
///
/// The delay before attempt `n` (1-based) is
/// `min(base_interval * 2^(n-1), max_delay)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt.
    #[serde(default = "default_base_interval", with = "millis")]
    pub base_interval: Duration,

    /// Ceiling on the computed delay.
    #[serde(default = "default_max_delay", with = "millis")]
    pub max_delay: Duration,

    /// Attempts to make before giving up and reporting reconnect-failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    10
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_interval: default_base_interval(),
            max_delay: default_max_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconnectPolicy {
    /// Returns the delay to wait before the given 1-based attempt.
    ///
    /// Attempt 0 is treated as attempt 1. The exponent saturates, so large
    /// attempt numbers cannot overflow into a zero delay.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let multiplier = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let delay = self
            .base_interval
            .checked_mul(multiplier.min(u32::MAX as u64) as u32)
            .unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }

    /// Returns true if another attempt is within budget.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}
