//! Transport port - one long-lived bidirectional connection.
//!
//! A [`Transport`] dials an endpoint and yields a [`TransportLink`]: a sink
//! for outbound frames plus a stream of inbound events. The core never sees
//! sockets, only links, which is what lets the lifecycle logic run against
//! an in-memory transport in tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::connection::Frame;
use crate::domain::foundation::CoreError;

use super::BearerCredential;

/// Everything needed to dial one channel endpoint.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Channel endpoint, e.g. `wss://host/channels/{bot_id}`.
    pub endpoint: String,

    /// Bearer credential presented at connection time.
    pub credential: BearerCredential,

    /// Optional query parameters (e.g. initial session scope).
    pub params: Vec<(String, String)>,
}

/// Inbound happenings on an established link.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A decoded frame arrived.
    Frame(Frame),

    /// The transport closed with the given code.
    Closed { code: u16, reason: String },

    /// The transport failed in a way that implies the link is dead.
    Error(String),
}

/// Outbound half of an established connection.
#[async_trait]
pub trait TransportSink: Send {
    /// Transmits one frame.
    async fn send(&mut self, frame: Frame) -> Result<(), CoreError>;

    /// Closes the connection with the given close code.
    async fn close(&mut self, code: u16) -> Result<(), CoreError>;
}

/// An established connection: outbound sink plus inbound event stream.
pub struct TransportLink {
    pub sink: Box<dyn TransportSink>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Port for dialing the real-time transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a connection to the given endpoint.
    ///
    /// # Errors
    ///
    /// - `ConnectionFailed` / `WebSocket` for transport-level failures
    /// - `AuthenticationRejected` / `Forbidden` when the handshake is
    ///   refused with the corresponding HTTP status
    ///
    /// Connection timeouts are enforced by the caller, not here.
    async fn connect(&self, request: ConnectRequest) -> Result<TransportLink, CoreError>;
}
