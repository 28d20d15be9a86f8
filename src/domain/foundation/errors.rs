//! Error taxonomy for the real-time core.
//!
//! Every failure the core can surface maps to one of these kinds. Connection
//! failures are reported through state transitions and status events, never
//! thrown past the core boundary; per-message failures surface as message
//! status; queued-request failures are retried internally against this
//! taxonomy's retry classification.

use std::time::Duration;
use thiserror::Error;

/// Default delay applied when retrying an [`CoreError::Unknown`] failure.
const CONSERVATIVE_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Unified error type for connection, API, and queue failures.
///
/// The taxonomy distinguishes retryable failures (network, server, rate
/// limit) from terminal ones (auth, forbidden, validation) so callers never
/// auto-retry an operation the server has definitively rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The transport did not open within the configured timeout.
    #[error("connection timed out after {0:?}")]
    ConnectionTimeout(Duration),

    /// The transport failed before or while opening.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport errored after being established.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// The server rejected the bearer credential. Never retried.
    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// The credential is valid but lacks access. Never retried.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The server asked us to slow down; `retry_after` is its hint in seconds.
    #[error("rate limited (retry after {retry_after:?} seconds)")]
    RateLimited { retry_after: Option<u64> },

    /// The network is unreachable (offline, DNS failure, refused).
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The server rejected the request payload. Never retried.
    #[error("validation rejected: {0}")]
    ValidationRejected(String),

    /// The server failed (5xx).
    #[error("server error ({status}): {detail}")]
    ServerError { status: u16, detail: String },

    /// Anything that does not fit the taxonomy. Retried conservatively.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CoreError {
    /// Returns true if the failure is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::ConnectionTimeout(_)
            | CoreError::ConnectionFailed(_)
            | CoreError::WebSocket(_)
            | CoreError::RateLimited { .. }
            | CoreError::NetworkUnreachable(_)
            | CoreError::ServerError { .. }
            | CoreError::Unknown(_) => true,
            CoreError::AuthenticationRejected(_)
            | CoreError::Forbidden(_)
            | CoreError::ValidationRejected(_) => false,
        }
    }

    /// Returns the delay to honor before retrying, if the error suggests one.
    ///
    /// Rate-limit responses carry the server's own hint; unknown failures get
    /// a conservative default. Other retryable kinds leave pacing to the
    /// caller's backoff policy.
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            CoreError::RateLimited { retry_after } => {
                Some(Duration::from_secs(retry_after.unwrap_or(60)))
            }
            CoreError::Unknown(_) => Some(CONSERVATIVE_RETRY_DELAY),
            _ => None,
        }
    }

    /// Maps an HTTP status code and detail string into the taxonomy.
    pub fn from_http_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 => CoreError::AuthenticationRejected(detail),
            403 => CoreError::Forbidden(detail),
            400 | 422 => CoreError::ValidationRejected(detail),
            429 => CoreError::RateLimited { retry_after: None },
            s if s >= 500 => CoreError::ServerError { status, detail },
            _ => CoreError::Unknown(format!("HTTP {}: {}", status, detail)),
        }
    }
}
