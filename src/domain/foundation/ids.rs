//! Strongly-typed identifier value objects.
//!
//! Server-issued identifiers (`BotId`, `SessionId`, `MessageId`) are opaque
//! non-empty strings; the server is their source of truth. `TempId` and
//! `RequestId` are generated locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::CoreError;

macro_rules! opaque_string_id {
    ($(#[$doc:meta])* $name:ident, $field:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier, rejecting empty strings.
            pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(CoreError::ValidationRejected(format!(
                        "{} cannot be empty",
                        $field
                    )));
                }
                Ok(Self(id))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

opaque_string_id!(
    /// Identifier of one conversational bot (one logical channel).
    BotId,
    "bot_id"
);

opaque_string_id!(
    /// Identifier of one conversation session within a channel.
    SessionId,
    "session_id"
);

opaque_string_id!(
    /// Server-issued identifier of a message.
    MessageId,
    "message_id"
);

/// Locally-generated temporary identifier for an optimistic message.
///
/// Assigned before the server acknowledges the message; reconciled away once
/// a server [`MessageId`] arrives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(String);

impl TempId {
    /// Generates a new unique temporary identifier.
    pub fn generate() -> Self {
        Self(format!("tmp-{}", Uuid::new_v4()))
    }

    /// Creates a TempId from an existing string, rejecting empty strings.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::ValidationRejected(
                "temp_id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a queued offline request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random RequestId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a RequestId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_id_accepts_non_empty_string() {
        let id = BotId::new("bot-1").unwrap();
        assert_eq!(id.as_str(), "bot-1");
    }

    #[test]
    fn bot_id_rejects_empty_string() {
        assert!(BotId::new("").is_err());
    }

    #[test]
    fn session_id_parses_from_str() {
        let id: SessionId = "s1".parse().unwrap();
        assert_eq!(id.to_string(), "s1");
    }

    #[test]
    fn message_id_serializes_transparently() {
        let id = MessageId::new("m1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"m1\"");
    }

    #[test]
    fn temp_id_generates_unique_values() {
        let id1 = TempId::generate();
        let id2 = TempId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn temp_id_has_recognizable_prefix() {
        let id = TempId::generate();
        assert!(id.as_str().starts_with("tmp-"));
    }

    #[test]
    fn request_id_generates_unique_values() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2);
    }
}
