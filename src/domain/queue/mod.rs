//! Offline-queue domain: queued requests and priority ordering.

mod request;

pub use request::{Priority, QueuedRequest};
