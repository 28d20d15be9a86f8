//! Application layer: the four operational components of the core.

mod channel_adapter;
mod connection_core;
mod offline_queue;
mod session_sync;

pub use channel_adapter::{ChannelAdapter, ChannelEvent};
pub use connection_core::{ConnectionCore, ConnectionEvent, SendOutcome, Subscription};
pub use offline_queue::{OfflineRequestQueue, QueueOutcome};
pub use session_sync::SessionSyncCoordinator;
