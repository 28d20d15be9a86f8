//! Wire frames for the real-time channel.
//!
//! Every frame travels as the envelope `{type, data, timestamp, id?}`. The
//! set of known frame kinds is closed; anything else deserializes into
//! [`Frame::Unknown`] so one misbehaving producer cannot take the dispatch
//! loop down.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{CoreError, MessageId, SessionId, TempId, Timestamp};
use crate::domain::session::Role;

/// Transport close codes with meaning to the core.
pub mod close_code {
    /// Clean shutdown requested by either side.
    pub const NORMAL: u16 = 1000;

    /// The server rejected the bearer credential.
    pub const AUTH_REJECTED: u16 = 4001;

    /// The credential is valid but lacks access to the channel.
    pub const FORBIDDEN: u16 = 4003;
}

/// Discriminant of a [`Frame`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Ping,
    Pong,
    Connected,
    SwitchSession,
    TypingStarted,
    TypingStopped,
    Message,
    Error,
    Unknown,
}

/// A decoded frame on the real-time channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Heartbeat probe.
    Ping,

    /// Heartbeat response. Intercepted by the core, never dispatched.
    Pong,

    /// Server acknowledgment that the channel is established.
    Connected { channel_id: Option<String> },

    /// Scope subsequent pushed events to another conversation session.
    SwitchSession { session_id: SessionId },

    /// Someone started typing in the session.
    TypingStarted { session_id: SessionId },

    /// Someone stopped typing in the session.
    TypingStopped { session_id: SessionId },

    /// A chat message pushed by the server.
    Message(PushedMessage),

    /// Server-reported channel error.
    Error { code: String, message: String },

    /// Frame of a kind this client does not recognize.
    Unknown { kind: String, data: Value },
}

/// Payload of a pushed chat message.
///
/// Carries the server id when the server has assigned one and echoes back
/// the sender's temp id when the message originated from this client, which
/// is what lets the timeline reconcile instead of duplicating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<TempId>,
    pub session_id: SessionId,
    pub role: Role,
    pub content: String,
    pub created_at: Timestamp,
}

/// The `{type, data, timestamp, id?}` envelope as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    /// Unix milliseconds at which the frame was created.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionScopedData {
    session_id: SessionId,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedData {
    #[serde(default)]
    channel_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ErrorData {
    code: String,
    message: String,
}

impl Frame {
    /// Returns the discriminant used for subscription routing.
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Ping => FrameKind::Ping,
            Frame::Pong => FrameKind::Pong,
            Frame::Connected { .. } => FrameKind::Connected,
            Frame::SwitchSession { .. } => FrameKind::SwitchSession,
            Frame::TypingStarted { .. } => FrameKind::TypingStarted,
            Frame::TypingStopped { .. } => FrameKind::TypingStopped,
            Frame::Message(_) => FrameKind::Message,
            Frame::Error { .. } => FrameKind::Error,
            Frame::Unknown { .. } => FrameKind::Unknown,
        }
    }

    /// Returns the wire name of this frame's type.
    pub fn type_name(&self) -> &str {
        match self {
            Frame::Ping => "ping",
            Frame::Pong => "pong",
            Frame::Connected { .. } => "connected",
            Frame::SwitchSession { .. } => "switch_session",
            Frame::TypingStarted { .. } => "typing_started",
            Frame::TypingStopped { .. } => "typing_stopped",
            Frame::Message(_) => "message",
            Frame::Error { .. } => "error",
            Frame::Unknown { kind, .. } => kind,
        }
    }

    /// Wraps the frame in a wire envelope stamped with the given id and now.
    pub fn into_wire(self, id: Option<String>) -> WireFrame {
        let kind = self.type_name().to_string();
        let data = match self {
            Frame::Ping | Frame::Pong => Value::Null,
            Frame::Connected { channel_id } => {
                serde_json::to_value(ConnectedData { channel_id }).unwrap_or(Value::Null)
            }
            Frame::SwitchSession { session_id }
            | Frame::TypingStarted { session_id }
            | Frame::TypingStopped { session_id } => {
                serde_json::to_value(SessionScopedData { session_id }).unwrap_or(Value::Null)
            }
            Frame::Message(message) => serde_json::to_value(message).unwrap_or(Value::Null),
            Frame::Error { code, message } => {
                serde_json::to_value(ErrorData { code, message }).unwrap_or(Value::Null)
            }
            Frame::Unknown { data, .. } => data,
        };
        WireFrame {
            kind,
            data,
            timestamp: Timestamp::now().as_unix_millis(),
            id,
        }
    }

    /// Decodes a wire envelope into a frame.
    ///
    /// # Errors
    ///
    /// `ValidationRejected` if a known frame type carries a malformed
    /// payload. Unrecognized types decode into [`Frame::Unknown`].
    pub fn from_wire(wire: WireFrame) -> Result<Self, CoreError> {
        fn payload<T: serde::de::DeserializeOwned>(kind: &str, data: Value) -> Result<T, CoreError> {
            serde_json::from_value(data).map_err(|e| {
                CoreError::ValidationRejected(format!("malformed {} frame: {}", kind, e))
            })
        }

        let frame = match wire.kind.as_str() {
            "ping" => Frame::Ping,
            "pong" => Frame::Pong,
            "connected" => {
                let data: ConnectedData = if wire.data.is_null() {
                    ConnectedData { channel_id: None }
                } else {
                    payload("connected", wire.data)?
                };
                Frame::Connected {
                    channel_id: data.channel_id,
                }
            }
            "switch_session" => {
                let data: SessionScopedData = payload("switch_session", wire.data)?;
                Frame::SwitchSession {
                    session_id: data.session_id,
                }
            }
            "typing_started" => {
                let data: SessionScopedData = payload("typing_started", wire.data)?;
                Frame::TypingStarted {
                    session_id: data.session_id,
                }
            }
            "typing_stopped" => {
                let data: SessionScopedData = payload("typing_stopped", wire.data)?;
                Frame::TypingStopped {
                    session_id: data.session_id,
                }
            }
            "message" => Frame::Message(payload("message", wire.data)?),
            "error" => {
                let data: ErrorData = payload("error", wire.data)?;
                Frame::Error {
                    code: data.code,
                    message: data.message,
                }
            }
            _ => Frame::Unknown {
                kind: wire.kind,
                data: wire.data,
            },
        };
        Ok(frame)
    }
}
