//! Domain layer: pure types and state machines with no I/O.

pub mod connection;
pub mod foundation;
pub mod queue;
pub mod session;
