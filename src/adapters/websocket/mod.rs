//! WebSocket transport adapter.

mod transport;

pub use transport::WebSocketTransport;

#[cfg(test)]
pub(crate) mod testing;
