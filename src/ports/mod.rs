//! Ports: interfaces to the external collaborators of the core.
//!
//! The core owns no I/O of its own. Everything it touches (the transport,
//! the request/response API, durable local storage, the credential source,
//! and host network/visibility signals) comes in through these traits so
//! tests can construct isolated instances with in-memory doubles.

mod chat_api;
mod credential_provider;
mod key_value_store;
mod network_monitor;
mod request_dispatcher;
mod transport;

pub use chat_api::{ChatApi, SendReceipt};
pub use credential_provider::{BearerCredential, CredentialProvider, StaticCredentialProvider};
pub use key_value_store::KeyValueStore;
pub use network_monitor::{NetworkEvent, NetworkMonitor};
pub use request_dispatcher::{DispatchResponse, RequestDispatcher};
pub use transport::{ConnectRequest, Transport, TransportEvent, TransportLink, TransportSink};
