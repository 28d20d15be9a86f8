//! Chat API port - the request/response side of the platform.
//!
//! Session CRUD, history fetch, and message send all go over plain HTTP;
//! pushed events cover the same ground asynchronously, which is exactly why
//! the timeline deduplicates instead of trusting arrival order.

use async_trait::async_trait;

use crate::domain::foundation::{BotId, CoreError, MessageId, SessionId, TempId, Timestamp};
use crate::domain::session::{ConversationSession, Message};

/// Server acknowledgment of a message send.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// The server-assigned identifier the optimistic entry reconciles to.
    pub message_id: MessageId,
    pub created_at: Timestamp,
}

/// Port for the platform's request/response API.
///
/// Error shape: implementations map HTTP statuses into the [`CoreError`]
/// taxonomy (401 → authentication-rejected, 403 → forbidden, 429 →
/// rate-limited with the server's retry-after hint, 5xx → server-error).
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Lists the sessions of one bot. Does not touch message timelines.
    async fn list_sessions(&self, bot_id: &BotId) -> Result<Vec<ConversationSession>, CoreError>;

    /// Creates a session.
    async fn create_session(
        &self,
        bot_id: &BotId,
        title: &str,
    ) -> Result<ConversationSession, CoreError>;

    /// Renames a session.
    async fn rename_session(
        &self,
        session_id: &SessionId,
        title: &str,
    ) -> Result<ConversationSession, CoreError>;

    /// Deletes a session.
    async fn delete_session(&self, session_id: &SessionId) -> Result<(), CoreError>;

    /// Fetches the full message history of a session, oldest first.
    async fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<Message>, CoreError>;

    /// Sends a message. The temp id travels with the request so pushed
    /// copies of this message can be correlated back to the optimistic
    /// entry.
    async fn send_message(
        &self,
        session_id: &SessionId,
        content: &str,
        temp_id: &TempId,
    ) -> Result<SendReceipt, CoreError>;
}
