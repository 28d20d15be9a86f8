//! Message entity with optimistic-send lifecycle.
//!
//! A message created locally starts with only a temp id and status
//! `Sending`; acknowledgment reconciles it to a server id and `Sent`, and a
//! failed send moves it to `Error` (retryable by the caller, never retried
//! automatically here).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::connection::PushedMessage;
use crate::domain::foundation::{MessageId, SessionId, TempId, Timestamp};

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The human on this client.
    User,
    /// A bot response.
    Assistant,
    /// Platform notices (typically invisible to the user).
    System,
}

/// Delivery status of a message in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Created locally, not yet acknowledged by the server.
    Sending,
    /// Acknowledged by the server.
    Sent,
    /// The send failed; the caller may retry.
    Error,
}

/// One entry in a session's message timeline.
///
/// # Invariants
///
/// - At least one of `id` / `temp_id` is set.
/// - Within a timeline no two messages share a non-empty `id`, nor a
///   non-empty `temp_id` (enforced by [`super::Timeline`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<TempId>,
    pub session_id: SessionId,
    pub role: Role,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    /// Creates a locally-optimistic user message with a fresh temp id.
    pub fn optimistic(session_id: SessionId, content: impl Into<String>) -> Self {
        Self {
            id: None,
            temp_id: Some(TempId::generate()),
            session_id,
            role: Role::User,
            content: content.into(),
            status: MessageStatus::Sending,
            created_at: Timestamp::now(),
            metadata: None,
        }
    }

    /// Builds a timeline entry from a server-pushed payload.
    ///
    /// Pushed messages are acknowledged by definition, so they arrive `Sent`.
    pub fn from_pushed(pushed: PushedMessage) -> Self {
        Self {
            id: pushed.id,
            temp_id: pushed.temp_id,
            session_id: pushed.session_id,
            role: pushed.role,
            content: pushed.content,
            status: MessageStatus::Sent,
            created_at: pushed.created_at,
            metadata: None,
        }
    }

    /// Returns true if this message is still awaiting acknowledgment.
    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Sending
    }
}
