//! Network monitor port - host connectivity and visibility signals.
//!
//! Browsers and desktop shells know when the network drops and when the page
//! is hidden; the core only reacts. Events arrive on a broadcast channel so
//! the connection core and the offline queue can each hold a receiver.

use tokio::sync::broadcast;

/// Connectivity and visibility transitions reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Connectivity restored.
    Online,

    /// Connectivity lost.
    Offline,

    /// The host page went to the background; heartbeats pause.
    PageHidden,

    /// The host page is visible again; heartbeats resume.
    PageVisible,
}

/// Port reporting the host's network and visibility state.
pub trait NetworkMonitor: Send + Sync {
    /// Current connectivity as last reported by the host.
    fn is_online(&self) -> bool;

    /// Subscribes to connectivity/visibility transitions.
    fn subscribe(&self) -> broadcast::Receiver<NetworkEvent>;
}
