//! Session domain: conversation sessions, messages, and the ordered,
//! deduplicated timeline.

mod message;
mod session;
mod timeline;

pub use message::{Message, MessageStatus, Role};
pub use session::ConversationSession;
pub use timeline::{IngestOutcome, Timeline, DEDUP_WINDOW_MILLIS};
