//! Channel adapter: one live bot channel at a time.
//!
//! A channel is the real-time conversation surface for one bot. The adapter
//! owns the active [`ConnectionCore`], swaps it out when the user moves to
//! another bot, and scopes the channel to a conversation session by sending
//! switch frames instead of reconnecting.
//!
//! The adapter's event stream outlives core swaps: consumers subscribe once
//! and keep receiving through bot changes and reconnects.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::RealtimeConfig;
use crate::domain::connection::{ConnectionState, Frame, FrameKind};
use crate::domain::foundation::{BotId, CoreError, SessionId};
use crate::ports::{CredentialProvider, NetworkMonitor, Transport};

use super::{ConnectionCore, ConnectionEvent, Subscription};

/// Frame kinds the adapter forwards to its consumers. Heartbeat traffic
/// stays internal to the core.
const FORWARDED_KINDS: [FrameKind; 7] = [
    FrameKind::Connected,
    FrameKind::SwitchSession,
    FrameKind::TypingStarted,
    FrameKind::TypingStopped,
    FrameKind::Message,
    FrameKind::Error,
    FrameKind::Unknown,
];

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Everything the adapter surfaces to its consumers.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A channel to this bot was opened.
    Opened { bot_id: BotId },

    /// The channel to this bot was closed (swap or explicit close).
    Closed { bot_id: BotId },

    /// Lifecycle event from the active connection.
    Connection(ConnectionEvent),

    /// Inbound frame from the active connection.
    Frame(Frame),
}

struct ActiveChannel {
    bot_id: BotId,
    core: ConnectionCore,
    forward_task: JoinHandle<()>,
    _subscriptions: Vec<Subscription>,
}

struct AdapterInner {
    active: Option<ActiveChannel>,
    /// Sub-topic switches requested before any channel was opened.
    pending_switches: VecDeque<SessionId>,
    /// The session the channel is currently scoped to; re-asserted after
    /// reconnects because a fresh connection starts unscoped.
    current_session: Option<SessionId>,
    typing_session: Option<SessionId>,
    typing_timer: Option<JoinHandle<()>>,
}

/// Manages the active bot channel on top of [`ConnectionCore`].
pub struct ChannelAdapter {
    config: RealtimeConfig,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    monitor: Option<Arc<dyn NetworkMonitor>>,
    events_tx: broadcast::Sender<ChannelEvent>,
    inner: Arc<StdMutex<AdapterInner>>,
}

impl ChannelAdapter {
    pub fn new(
        config: RealtimeConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            transport,
            credentials,
            monitor: None,
            events_tx,
            inner: Arc::new(StdMutex::new(AdapterInner {
                active: None,
                pending_switches: VecDeque::new(),
                current_session: None,
                typing_session: None,
                typing_timer: None,
            })),
        }
    }

    /// Wires host connectivity signals into every core this adapter creates.
    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Subscribes to channel events. The subscription survives channel
    /// swaps.
    pub fn events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events_tx.subscribe()
    }

    /// The bot whose channel is currently active, if any.
    pub fn active_bot(&self) -> Option<BotId> {
        self.inner().active.as_ref().map(|a| a.bot_id.clone())
    }

    /// State of the active connection; `Disconnected` when no channel is
    /// open.
    pub fn connection_state(&self) -> ConnectionState {
        self.inner()
            .active
            .as_ref()
            .map(|a| a.core.state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Opens (or switches to) the channel for `bot_id`.
    ///
    /// Idempotent when the channel for this bot is already connected.
    /// Switching bots tears the previous core down first; consumers see
    /// `Closed` for the old bot, then `Opened` for the new one. A session
    /// chosen before opening (via [`Self::switch_sub_topic`]) scopes the
    /// connect request itself.
    ///
    /// # Errors
    ///
    /// Propagates the connection error when the initial connect fails. The
    /// channel stays registered, so a later network-online signal or retry
    /// can still bring it up.
    pub async fn open_channel(&self, bot_id: &BotId) -> Result<(), CoreError> {
        let previous = {
            let mut inner = self.inner();
            if let Some(active) = &inner.active {
                if &active.bot_id == bot_id && active.core.state().is_connected() {
                    return Ok(());
                }
            }
            inner.active.take()
        };
        if let Some(active) = previous {
            self.teardown(active).await;
        }

        let endpoint = self.config.channel_endpoint(bot_id.as_str());
        let core = ConnectionCore::new(self.config.clone(), endpoint, self.transport.clone());
        if let Some(monitor) = &self.monitor {
            core.attach_network_monitor(monitor.clone());
        }

        let subscriptions = FORWARDED_KINDS
            .iter()
            .map(|kind| {
                let tx = self.events_tx.clone();
                core.subscribe(*kind, move |frame| {
                    let _ = tx.send(ChannelEvent::Frame(frame.clone()));
                })
            })
            .collect();

        let forward_task = tokio::spawn(Self::forward_events(
            core.clone(),
            self.events_tx.clone(),
            self.inner.clone(),
        ));

        self.inner().active = Some(ActiveChannel {
            bot_id: bot_id.clone(),
            core: core.clone(),
            forward_task,
            _subscriptions: subscriptions,
        });

        let params = {
            let inner = self.inner();
            inner
                .current_session
                .iter()
                .map(|s| ("session_id".to_string(), s.as_str().to_string()))
                .collect()
        };
        debug!(bot_id = %bot_id, "opening channel");
        core.connect(self.credentials.current(), params).await?;
        let _ = self.events_tx.send(ChannelEvent::Opened {
            bot_id: bot_id.clone(),
        });
        Ok(())
    }

    /// Closes the active channel, if any.
    pub async fn close_channel(&self) {
        let active = {
            let mut inner = self.inner();
            if let Some(timer) = inner.typing_timer.take() {
                timer.abort();
            }
            inner.typing_session = None;
            inner.current_session = None;
            inner.active.take()
        };
        if let Some(active) = active {
            self.teardown(active).await;
        }
    }

    /// Scopes the channel to another conversation session.
    ///
    /// This is a single frame on the live connection, never a reconnect.
    /// While disconnected the switch is queued and delivered when the
    /// channel comes up.
    pub async fn switch_sub_topic(&self, session_id: SessionId) {
        let core = {
            let mut inner = self.inner();
            inner.current_session = Some(session_id.clone());
            match &inner.active {
                Some(active) => Some(active.core.clone()),
                None => {
                    inner.pending_switches.push_back(session_id.clone());
                    None
                }
            }
        };
        if let Some(core) = core {
            // The core's pending-send queue covers the disconnected case.
            core.send(Frame::SwitchSession { session_id }).await;
        } else {
            debug!("no channel open, sub-topic switch parked");
        }
    }

    /// Reports typing activity in a session.
    ///
    /// The first pulse sends a typing-started frame; repeated pulses only
    /// rearm the inactivity timer. A pulse for a different session first
    /// ends the displaced session's indication, then starts the new one.
    /// After the configured quiet window a typing-stopped frame goes out
    /// automatically.
    pub async fn pulse_typing(&self, session_id: SessionId) {
        let (core, started, displaced) = {
            let mut inner = self.inner();
            let Some(active) = &inner.active else {
                return;
            };
            let core = active.core.clone();
            let started = inner.typing_session.as_ref() != Some(&session_id);
            let displaced = if started {
                inner.typing_session.take()
            } else {
                None
            };
            if let Some(timer) = inner.typing_timer.take() {
                timer.abort();
            }
            inner.typing_session = Some(session_id.clone());
            (core, started, displaced)
        };

        if let Some(previous) = displaced {
            core.send(Frame::TypingStopped {
                session_id: previous,
            })
            .await;
        }
        if started {
            core.send(Frame::TypingStarted {
                session_id: session_id.clone(),
            })
            .await;
        }

        let timer = tokio::spawn({
            let inner = self.inner.clone();
            let core = core.clone();
            let quiet = self.config.typing_stop_after();
            async move {
                tokio::time::sleep(quiet).await;
                let session = {
                    let mut inner = inner.lock().expect("adapter state lock poisoned");
                    inner.typing_timer = None;
                    inner.typing_session.take()
                };
                if let Some(session_id) = session {
                    core.send(Frame::TypingStopped { session_id }).await;
                }
            }
        });
        self.inner().typing_timer = Some(timer);
    }

    /// Ends the typing indication immediately (e.g. the message was sent).
    pub async fn stop_typing(&self) {
        let (core, session) = {
            let mut inner = self.inner();
            if let Some(timer) = inner.typing_timer.take() {
                timer.abort();
            }
            (
                inner.active.as_ref().map(|a| a.core.clone()),
                inner.typing_session.take(),
            )
        };
        if let (Some(core), Some(session_id)) = (core, session) {
            core.send(Frame::TypingStopped { session_id }).await;
        }
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, AdapterInner> {
        self.inner.lock().expect("adapter state lock poisoned")
    }

    async fn teardown(&self, active: ActiveChannel) {
        {
            let mut inner = self.inner();
            if let Some(timer) = inner.typing_timer.take() {
                timer.abort();
            }
            inner.typing_session = None;
        }
        active.forward_task.abort();
        active.core.disconnect().await;
        debug!(bot_id = %active.bot_id, "channel closed");
        let _ = self.events_tx.send(ChannelEvent::Closed {
            bot_id: active.bot_id,
        });
    }

    /// Forwards core lifecycle events and re-scopes the channel whenever the
    /// connection (re)establishes.
    async fn forward_events(
        core: ConnectionCore,
        tx: broadcast::Sender<ChannelEvent>,
        inner: Arc<StdMutex<AdapterInner>>,
    ) {
        let mut rx = core.events();
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let established = matches!(
                        event,
                        ConnectionEvent::Connected | ConnectionEvent::Reconnected
                    );
                    let _ = tx.send(ChannelEvent::Connection(event));
                    if established {
                        let switches: Vec<SessionId> = {
                            let mut inner =
                                inner.lock().expect("adapter state lock poisoned");
                            if inner.pending_switches.is_empty() {
                                inner.current_session.iter().cloned().collect()
                            } else {
                                inner.pending_switches.drain(..).collect()
                            }
                        };
                        for session_id in switches {
                            core.send(Frame::SwitchSession { session_id }).await;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "channel event forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}
