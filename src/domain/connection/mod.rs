//! Connection domain: lifecycle state machine, wire frames, backoff policy.

mod backoff;
mod frame;
mod state;

pub use backoff::ReconnectPolicy;
pub use frame::{close_code, Frame, FrameKind, PushedMessage, WireFrame};
pub use state::{CloseDisposition, ConnectionState};
