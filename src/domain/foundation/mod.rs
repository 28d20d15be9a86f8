//! Foundation value objects shared across the domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::CoreError;
pub use ids::{BotId, MessageId, RequestId, SessionId, TempId};
pub use timestamp::Timestamp;
