//! Manually-driven network monitor.
//!
//! The host shell (browser bridge, desktop app) knows when connectivity and
//! visibility change; it reports them here and the core reacts. Also the
//! monitor of choice in tests, where connectivity is part of the script.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

use crate::ports::{NetworkEvent, NetworkMonitor};

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Monitor whose state is set explicitly by the host.
pub struct ManualNetworkMonitor {
    online: AtomicBool,
    events_tx: broadcast::Sender<NetworkEvent>,
}

impl ManualNetworkMonitor {
    pub fn new(online: bool) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            online: AtomicBool::new(online),
            events_tx,
        }
    }

    /// Reports a connectivity change. Emits only on actual transitions.
    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was != online {
            let event = if online {
                NetworkEvent::Online
            } else {
                NetworkEvent::Offline
            };
            let _ = self.events_tx.send(event);
        }
    }

    /// Reports a page visibility change.
    pub fn set_visible(&self, visible: bool) {
        let event = if visible {
            NetworkEvent::PageVisible
        } else {
            NetworkEvent::PageHidden
        };
        let _ = self.events_tx.send(event);
    }
}

impl NetworkMonitor for ManualNetworkMonitor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events_tx.subscribe()
    }
}
