//! Connection lifecycle state machine.
//!
//! ## Transitions
//!
//! ```text
//! Disconnected --connect()--> Connecting
//! Connecting --open--> Connected
//! Connecting --error--> Error
//! Connected --disconnect() / normal close--> Closed        (terminal)
//! Connected --fatal close (auth, forbidden)--> Disconnected (no reconnect)
//! Connected --abnormal close / error--> Reconnecting
//! Reconnecting --attempt--> Connecting
//! Reconnecting --budget exhausted--> Disconnected
//! ```
//!
//! Transitions are driven only by transport events or explicit API calls;
//! consumers observe state, they never set it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::CoreError;

use super::frame::close_code;

/// Lifecycle state of one transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection and none in progress. Initial state.
    Disconnected,

    /// A connection attempt is in flight.
    Connecting,

    /// The transport is open and usable.
    Connected,

    /// The connection dropped; reconnect attempts are being scheduled.
    Reconnecting,

    /// A connection attempt failed before the transport opened.
    Error,

    /// Manually closed or closed with the normal code. Terminal.
    Closed,
}

impl ConnectionState {
    /// Returns true if frames can be transmitted right now.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Returns true if the state permits starting a new connection attempt.
    pub fn can_connect(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Error | ConnectionState::Reconnecting
        )
    }

    /// Returns true if the connection has been shut down for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
            ConnectionState::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// What the core should do after the transport closes with a given code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseDisposition {
    /// Normal closure: settle into the terminal [`ConnectionState::Closed`].
    Normal,

    /// Unrecoverable rejection: stay [`ConnectionState::Disconnected`] and do
    /// not schedule any reconnect.
    Fatal(CoreError),

    /// Anything else: drop to Disconnected and begin reconnecting.
    Reconnect,
}

impl CloseDisposition {
    /// Classifies a transport close code.
    pub fn from_close_code(code: u16, reason: &str) -> Self {
        match code {
            close_code::NORMAL => CloseDisposition::Normal,
            close_code::AUTH_REJECTED => {
                CloseDisposition::Fatal(CoreError::AuthenticationRejected(reason.to_string()))
            }
            close_code::FORBIDDEN => {
                CloseDisposition::Fatal(CoreError::Forbidden(reason.to_string()))
            }
            _ => CloseDisposition::Reconnect,
        }
    }
}
