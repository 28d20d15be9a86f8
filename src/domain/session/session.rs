//! Conversation session record.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{BotId, SessionId, Timestamp};

/// One conversation session within a bot's channel.
///
/// Held in memory only; the server is the source of truth. Created by
/// explicit user action or by the first message, renamed in place, deleted
/// explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    pub id: SessionId,
    pub bot_id: BotId,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ConversationSession {
    /// Applies a rename, bumping `updated_at`.
    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_updates_title_and_timestamp() {
        let mut session = ConversationSession {
            id: SessionId::new("s1").unwrap(),
            bot_id: BotId::new("b1").unwrap(),
            title: "First chat".to_string(),
            created_at: Timestamp::from_unix_millis(0),
            updated_at: Timestamp::from_unix_millis(0),
        };

        session.rename("Renamed");
        assert_eq!(session.title, "Renamed");
        assert!(session.updated_at.is_after(&session.created_at));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let session = ConversationSession {
            id: SessionId::new("s1").unwrap(),
            bot_id: BotId::new("b1").unwrap(),
            title: "Chat".to_string(),
            created_at: Timestamp::from_unix_millis(0),
            updated_at: Timestamp::from_unix_millis(0),
        };

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"botId\":\"b1\""));
        assert!(json.contains("\"createdAt\""));
    }
}
