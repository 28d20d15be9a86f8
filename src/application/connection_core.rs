//! Connection lifecycle management for one transport connection.
//!
//! One `ConnectionCore` owns exactly one transport connection: it connects,
//! reconnects with exponential backoff, heartbeats, queues outbound frames
//! while disconnected, and dispatches inbound frames to subscribers by
//! frame kind.
//!
//! Re-entrant entry points are idempotent: `connect()` is single-flight (a
//! cached shared future), so a user action, a network-online event, and a
//! visibility change racing each other produce one connection attempt, not
//! three.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::RealtimeConfig;
use crate::domain::connection::{
    close_code, CloseDisposition, ConnectionState, Frame, FrameKind,
};
use crate::domain::foundation::CoreError;
use crate::ports::{
    BearerCredential, ConnectRequest, NetworkEvent, NetworkMonitor, Transport, TransportEvent,
    TransportSink,
};

/// Capacity of the connection-event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle notifications surfaced to consumers.
///
/// Failures are reported here as events, never thrown past the core
/// boundary.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The transport opened.
    Connected,

    /// The transport dropped; `code` is the close code when one was seen.
    Disconnected { code: Option<u16> },

    /// A reconnect attempt has been scheduled.
    Reconnecting { attempt: u32, delay: Duration },

    /// A reconnect attempt succeeded.
    Reconnected,

    /// The reconnect budget is exhausted; the core has given up.
    ReconnectFailed { attempts: u32 },

    /// Manual or normal closure; terminal until the next explicit connect.
    Closed,
}

/// What happened to a frame handed to [`ConnectionCore::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Transmitted immediately.
    Sent,

    /// Not connected; parked in the pending-send queue for the next flush.
    Queued,
}

type FrameHandler = Arc<dyn Fn(&Frame) + Send + Sync>;

#[derive(Default)]
struct SubscriberRegistry {
    next_id: u64,
    handlers: HashMap<FrameKind, Vec<(u64, FrameHandler)>>,
}

impl SubscriberRegistry {
    fn add(&mut self, kind: FrameKind, handler: FrameHandler) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    fn remove(&mut self, kind: FrameKind, id: u64) {
        if let Some(entries) = self.handlers.get_mut(&kind) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                self.handlers.remove(&kind);
            }
        }
    }

    /// Snapshot of the handlers for a kind, so dispatch can run without
    /// holding the registry lock.
    fn handlers_for(&self, kind: FrameKind) -> Vec<FrameHandler> {
        self.handlers
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }
}

/// RAII registration handle; dropping it (or calling `unsubscribe`) removes
/// the handler.
pub struct Subscription {
    registry: Weak<StdMutex<SubscriberRegistry>>,
    kind: FrameKind,
    id: u64,
}

impl Subscription {
    /// Removes the handler. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut registry) = registry.lock() {
                registry.remove(self.kind, self.id);
            }
        }
    }
}

type SharedConnect = Shared<BoxFuture<'static, Result<(), CoreError>>>;

/// Mutable state guarded by a synchronous lock, never held across `.await`.
struct CoreShared {
    credential: Option<BearerCredential>,
    params: Vec<(String, String)>,
    manual_close: bool,
    /// Bumped on every teardown; background tasks compare their captured
    /// generation before acting, so stale timers cannot fire against a
    /// newer connection.
    generation: u64,
    last_attempt_at: Option<Instant>,
    reconnect_attempts: u32,
    pending: VecDeque<Frame>,
    connect_in_flight: Option<SharedConnect>,
    tasks: Vec<JoinHandle<()>>,
}

struct CoreInner {
    config: RealtimeConfig,
    endpoint: String,
    transport: Arc<dyn Transport>,
    registry: Arc<StdMutex<SubscriberRegistry>>,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<ConnectionEvent>,
    sink: Mutex<Option<Box<dyn TransportSink>>>,
    shared: StdMutex<CoreShared>,
    heartbeat_paused: AtomicBool,
    last_pong: StdMutex<Option<Instant>>,
}

/// Manages the full lifecycle of one transport connection.
#[derive(Clone)]
pub struct ConnectionCore {
    inner: Arc<CoreInner>,
}

impl ConnectionCore {
    /// Creates a core for one channel endpoint. No connection is made until
    /// [`connect`](Self::connect) is called.
    pub fn new(config: RealtimeConfig, endpoint: String, transport: Arc<dyn Transport>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CoreInner {
                config,
                endpoint,
                transport,
                registry: Arc::new(StdMutex::new(SubscriberRegistry::default())),
                state_tx,
                events_tx,
                sink: Mutex::new(None),
                shared: StdMutex::new(CoreShared {
                    credential: None,
                    params: Vec::new(),
                    manual_close: false,
                    generation: 0,
                    last_attempt_at: None,
                    reconnect_attempts: 0,
                    pending: VecDeque::new(),
                    connect_in_flight: None,
                    tasks: Vec::new(),
                }),
                heartbeat_paused: AtomicBool::new(false),
                last_pong: StdMutex::new(None),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Watch channel for state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribes to lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events_tx.subscribe()
    }

    /// When the last heartbeat response was seen, if any.
    ///
    /// The core deliberately takes no action on a missing pong; callers
    /// needing strict liveness build it on top of this.
    pub fn last_pong_at(&self) -> Option<Instant> {
        *self.inner.last_pong.lock().expect("last_pong lock poisoned")
    }

    /// Number of frames parked in the pending-send queue.
    pub fn pending_len(&self) -> usize {
        self.inner.shared().pending.len()
    }

    /// Opens the connection.
    ///
    /// Idempotent: already connected with the same credential resolves
    /// immediately; a connect already in flight is joined rather than
    /// duplicated. Attempts are debounced to the configured minimum
    /// spacing.
    ///
    /// # Errors
    ///
    /// `ConnectionTimeout`, `ConnectionFailed`, or `WebSocket` when the
    /// attempt itself fails; rejections from the handshake surface as
    /// `AuthenticationRejected` / `Forbidden`.
    pub async fn connect(
        &self,
        credential: BearerCredential,
        params: Vec<(String, String)>,
    ) -> Result<(), CoreError> {
        let fut = {
            let inner = &self.inner;
            let mut shared = inner.shared();
            if self.state().is_connected() && shared.credential.as_ref() == Some(&credential) {
                return Ok(());
            }
            if let Some(fut) = &shared.connect_in_flight {
                fut.clone()
            } else {
                shared.manual_close = false;
                shared.credential = Some(credential);
                shared.params = params;
                CoreInner::start_connect(&self.inner, &mut shared)
            }
        };
        fut.await
    }

    /// Closes the connection for good.
    ///
    /// Marks the closure as manual (suppressing auto-reconnect), cancels
    /// every pending timer and background task, and closes the transport
    /// with the normal-closure code.
    pub async fn disconnect(&self) {
        let tasks = {
            let mut shared = self.inner.shared();
            shared.manual_close = true;
            shared.generation += 1;
            shared.connect_in_flight = None;
            shared.reconnect_attempts = 0;
            std::mem::take(&mut shared.tasks)
        };
        for task in tasks {
            task.abort();
        }

        if let Some(mut sink) = self.inner.sink.lock().await.take() {
            if let Err(err) = sink.close(close_code::NORMAL).await {
                debug!("close during disconnect failed: {}", err);
            }
        }

        self.inner.set_state(ConnectionState::Closed);
        self.inner.emit(ConnectionEvent::Closed);
    }

    /// Sends a frame, or queues it when not connected.
    ///
    /// Never fails under normal operation: when the transport is down the
    /// frame is parked in the bounded pending-send queue (capacity from
    /// config, drop-oldest on overflow) and flushed, in order, on the next
    /// successful connection.
    pub async fn send(&self, frame: Frame) -> SendOutcome {
        if self.state().is_connected() {
            match self.inner.transmit(frame.clone()).await {
                Ok(()) => return SendOutcome::Sent,
                Err(err) => {
                    debug!("send failed, queueing frame: {}", err);
                }
            }
        }

        let mut shared = self.inner.shared();
        if shared.pending.len() >= self.inner.config.pending_send_capacity {
            shared.pending.pop_front();
            warn!(
                capacity = self.inner.config.pending_send_capacity,
                "pending-send queue full, dropped oldest frame"
            );
        }
        shared.pending.push_back(frame);
        SendOutcome::Queued
    }

    /// Registers a handler for inbound frames of one kind.
    ///
    /// Multiple handlers per kind are allowed. `Pong` frames are intercepted
    /// by the core and never reach subscribers.
    pub fn subscribe(
        &self,
        kind: FrameKind,
        handler: impl Fn(&Frame) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self
            .inner
            .registry
            .lock()
            .expect("registry lock poisoned")
            .add(kind, Arc::new(handler));
        Subscription {
            registry: Arc::downgrade(&self.inner.registry),
            kind,
            id,
        }
    }

    /// Wires host connectivity/visibility signals into the core.
    ///
    /// `online` triggers an immediate reconnect when not connected and not
    /// manually closed; `offline` forces the state to Disconnected; page
    /// visibility pauses and resumes the heartbeat.
    pub fn attach_network_monitor(&self, monitor: Arc<dyn NetworkMonitor>) {
        let mut rx = monitor.subscribe();
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(NetworkEvent::Online) => {
                        let ready = {
                            let shared = inner.shared();
                            !shared.manual_close && shared.credential.is_some()
                        };
                        if ready && !inner.state_tx.borrow().is_connected() {
                            debug!("network online, attempting reconnect");
                            let fut = {
                                let mut shared = inner.shared();
                                match &shared.connect_in_flight {
                                    Some(fut) => fut.clone(),
                                    None => CoreInner::start_connect(&inner, &mut shared),
                                }
                            };
                            if let Err(err) = fut.await {
                                debug!("online-triggered reconnect failed: {}", err);
                            }
                        }
                    }
                    Ok(NetworkEvent::Offline) => {
                        inner.force_offline().await;
                    }
                    Ok(NetworkEvent::PageHidden) => {
                        inner.heartbeat_paused.store(true, Ordering::Relaxed);
                    }
                    Ok(NetworkEvent::PageVisible) => {
                        inner.heartbeat_paused.store(false, Ordering::Relaxed);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "network monitor receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });
        self.inner.shared().tasks.push(task);
    }
}

impl CoreInner {
    fn shared(&self) -> std::sync::MutexGuard<'_, CoreShared> {
        self.shared.lock().expect("core state lock poisoned")
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: ConnectionEvent) {
        // No receivers is fine.
        let _ = self.events_tx.send(event);
    }

    /// Caches a fresh single-flight connect future. Caller holds the lock.
    fn start_connect(inner: &Arc<CoreInner>, shared: &mut CoreShared) -> SharedConnect {
        let owner = inner.clone();
        let fut = async move {
            let result = CoreInner::establish(owner.clone()).await;
            owner.shared().connect_in_flight = None;
            result
        }
        .boxed()
        .shared();
        shared.connect_in_flight = Some(fut.clone());
        fut
    }

    /// One full connection attempt: debounce, dial, install the link.
    async fn establish(inner: Arc<CoreInner>) -> Result<(), CoreError> {
        // Debounce: keep a minimum spacing between attempts so rapid
        // UI-triggered reconnects do not storm the server.
        let wait = {
            let shared = inner.shared();
            shared.last_attempt_at.and_then(|at| {
                inner
                    .config
                    .min_connect_spacing()
                    .checked_sub(at.elapsed())
            })
        };
        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }

        let (credential, params) = {
            let mut shared = inner.shared();
            shared.last_attempt_at = Some(Instant::now());
            let credential = shared
                .credential
                .clone()
                .ok_or_else(|| CoreError::ConnectionFailed("no credential".to_string()))?;
            (credential, shared.params.clone())
        };

        inner.set_state(ConnectionState::Connecting);

        // A stale link from a previous generation gets closed first.
        if let Some(mut old) = inner.sink.lock().await.take() {
            let _ = old.close(close_code::NORMAL).await;
        }

        let request = ConnectRequest {
            endpoint: inner.endpoint.clone(),
            credential,
            params,
        };
        let timeout = inner.config.connect_timeout();
        let link = match tokio::time::timeout(timeout, inner.transport.connect(request)).await {
            Ok(Ok(link)) => link,
            Ok(Err(err)) => {
                inner.set_state(ConnectionState::Error);
                return Err(err);
            }
            Err(_) => {
                inner.set_state(ConnectionState::Error);
                return Err(CoreError::ConnectionTimeout(timeout));
            }
        };

        let generation = {
            let mut shared = inner.shared();
            shared.generation += 1;
            shared.reconnect_attempts = 0;
            shared.generation
        };

        *inner.sink.lock().await = Some(link.sink);
        inner.set_state(ConnectionState::Connected);
        inner.emit(ConnectionEvent::Connected);
        debug!(endpoint = %inner.endpoint, "transport connected");

        let reader = tokio::spawn(CoreInner::run_reader(inner.clone(), link.events, generation));
        let heartbeat = tokio::spawn(CoreInner::run_heartbeat(inner.clone(), generation));
        {
            let mut shared = inner.shared();
            shared.tasks.retain(|task| !task.is_finished());
            shared.tasks.push(reader);
            shared.tasks.push(heartbeat);
        }

        CoreInner::flush_pending(&inner).await;
        Ok(())
    }

    /// Sends one frame over the live sink.
    async fn transmit(&self, frame: Frame) -> Result<(), CoreError> {
        let mut guard = self.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => sink.send(frame).await,
            None => Err(CoreError::NetworkUnreachable(
                "transport not connected".to_string(),
            )),
        }
    }

    /// Drains the pending-send queue in original order.
    ///
    /// A mid-flush failure puts the frame back at the head and stops: order
    /// is preserved over throughput.
    async fn flush_pending(inner: &Arc<CoreInner>) {
        loop {
            let frame = inner.shared().pending.pop_front();
            let Some(frame) = frame else { break };
            if let Err(err) = inner.transmit(frame.clone()).await {
                warn!("pending-send flush halted: {}", err);
                inner.shared().pending.push_front(frame);
                break;
            }
        }
    }

    /// Consumes transport events until the link dies.
    async fn run_reader(
        inner: Arc<CoreInner>,
        mut events: mpsc::Receiver<TransportEvent>,
        generation: u64,
    ) {
        while let Some(event) = events.recv().await {
            if inner.shared().generation != generation {
                return;
            }
            match event {
                TransportEvent::Frame(frame) => {
                    if frame.kind() == FrameKind::Pong {
                        *inner.last_pong.lock().expect("last_pong lock poisoned") =
                            Some(Instant::now());
                        continue;
                    }
                    let handlers = inner
                        .registry
                        .lock()
                        .expect("registry lock poisoned")
                        .handlers_for(frame.kind());
                    for handler in handlers {
                        handler(&frame);
                    }
                }
                TransportEvent::Closed { code, reason } => {
                    CoreInner::handle_link_down(&inner, Some(code), &reason, generation).await;
                    return;
                }
                TransportEvent::Error(message) => {
                    CoreInner::handle_link_down(&inner, None, &message, generation).await;
                    return;
                }
            }
        }
        CoreInner::handle_link_down(&inner, None, "transport event stream ended", generation).await;
    }

    /// Periodic heartbeat; paused while the host page is hidden.
    async fn run_heartbeat(inner: Arc<CoreInner>, generation: u64) {
        tokio::time::sleep(inner.config.heartbeat_grace()).await;
        let mut interval = tokio::time::interval(inner.config.heartbeat_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            if inner.shared().generation != generation {
                return;
            }
            if inner.heartbeat_paused.load(Ordering::Relaxed) {
                continue;
            }
            if !inner.state_tx.borrow().is_connected() {
                return;
            }
            if let Err(err) = inner.transmit(Frame::Ping).await {
                debug!("heartbeat ping failed: {}", err);
            }
        }
    }

    /// Reacts to the link dropping: settle, stay down, or reconnect.
    async fn handle_link_down(
        inner: &Arc<CoreInner>,
        code: Option<u16>,
        reason: &str,
        generation: u64,
    ) {
        let manual = {
            let mut shared = inner.shared();
            if shared.generation != generation {
                return;
            }
            shared.generation += 1;
            shared.manual_close
        };

        *inner.sink.lock().await = None;

        if manual {
            // disconnect() already settled the state.
            return;
        }

        let disposition = match code {
            Some(code) => CloseDisposition::from_close_code(code, reason),
            None => CloseDisposition::Reconnect,
        };

        match disposition {
            CloseDisposition::Normal => {
                debug!("transport closed normally");
                inner.set_state(ConnectionState::Closed);
                inner.emit(ConnectionEvent::Closed);
            }
            CloseDisposition::Fatal(err) => {
                warn!("connection rejected, not reconnecting: {}", err);
                inner.set_state(ConnectionState::Disconnected);
                inner.emit(ConnectionEvent::Disconnected { code });
            }
            CloseDisposition::Reconnect => {
                debug!(?code, reason, "transport dropped, scheduling reconnect");
                inner.set_state(ConnectionState::Disconnected);
                inner.emit(ConnectionEvent::Disconnected { code });
                CoreInner::begin_reconnect(inner);
            }
        }
    }

    /// Spawns the backoff-paced reconnect loop.
    fn begin_reconnect(inner: &Arc<CoreInner>) {
        let owner = inner.clone();
        let task = tokio::spawn(async move {
            loop {
                let attempt = {
                    let mut shared = owner.shared();
                    if shared.manual_close {
                        return;
                    }
                    shared.reconnect_attempts += 1;
                    shared.reconnect_attempts
                };

                let policy = &owner.config.reconnect;
                if !policy.allows_attempt(attempt) {
                    warn!(
                        attempts = attempt - 1,
                        "reconnect budget exhausted, giving up"
                    );
                    owner.shared().reconnect_attempts = 0;
                    owner.set_state(ConnectionState::Disconnected);
                    owner.emit(ConnectionEvent::ReconnectFailed {
                        attempts: attempt - 1,
                    });
                    return;
                }

                let delay = policy.delay_for(attempt);
                owner.set_state(ConnectionState::Reconnecting);
                owner.emit(ConnectionEvent::Reconnecting { attempt, delay });
                tokio::time::sleep(delay).await;

                if owner.shared().manual_close {
                    return;
                }

                let fut = {
                    let mut shared = owner.shared();
                    match &shared.connect_in_flight {
                        Some(fut) => fut.clone(),
                        None => CoreInner::start_connect(&owner, &mut shared),
                    }
                };
                match fut.await {
                    Ok(()) => {
                        owner.emit(ConnectionEvent::Reconnected);
                        return;
                    }
                    Err(err) => {
                        debug!(attempt, "reconnect attempt failed: {}", err);
                    }
                }
            }
        });
        inner.shared().tasks.push(task);
    }

    /// Host went offline: tear the link down without scheduling reconnects.
    async fn force_offline(self: &Arc<Self>) {
        {
            let mut shared = self.shared();
            if shared.manual_close || self.state_tx.borrow().is_terminal() {
                return;
            }
            shared.generation += 1;
        }
        *self.sink.lock().await = None;
        self.set_state(ConnectionState::Disconnected);
        self.emit(ConnectionEvent::Disconnected { code: None });
        debug!("network offline, forced disconnect");
    }
}
