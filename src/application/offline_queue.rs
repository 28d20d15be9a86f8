//! Offline request queue: mutating requests captured while offline and
//! replayed when connectivity returns.
//!
//! The queue is priority-ordered (highest drains first, ties in arrival
//! order) and bounded: at capacity the oldest low-priority entry is evicted
//! to make room, and enqueue fails when no low-priority entry exists. Every
//! mutation persists the whole queue to the key-value store so a page reload
//! does not lose captured work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::domain::foundation::{CoreError, RequestId};
use crate::domain::queue::{Priority, QueuedRequest};
use crate::ports::{DispatchResponse, KeyValueStore, NetworkEvent, NetworkMonitor, RequestDispatcher};

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// Terminal outcome of one queued request.
#[derive(Debug, Clone)]
pub enum QueueOutcome {
    /// Replayed successfully.
    Delivered {
        request: QueuedRequest,
        response: DispatchResponse,
    },

    /// Removed without delivery: non-retryable failure or retry budget
    /// spent.
    Dropped {
        request: QueuedRequest,
        error: CoreError,
    },

    /// Evicted at capacity to make room for a newer request.
    Evicted { request: QueuedRequest },
}

/// Bounded, persistent, priority-ordered queue of offline requests.
#[derive(Clone)]
pub struct OfflineRequestQueue {
    config: QueueConfig,
    store: Arc<dyn KeyValueStore>,
    dispatcher: Arc<dyn RequestDispatcher>,
    monitor: Arc<dyn NetworkMonitor>,
    entries: Arc<StdMutex<Vec<QueuedRequest>>>,
    /// Single-flight drain guard.
    processing: Arc<AtomicBool>,
    outcomes_tx: broadcast::Sender<QueueOutcome>,
}

impl OfflineRequestQueue {
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn KeyValueStore>,
        dispatcher: Arc<dyn RequestDispatcher>,
        monitor: Arc<dyn NetworkMonitor>,
    ) -> Self {
        let (outcomes_tx, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        Self {
            config,
            store,
            dispatcher,
            monitor,
            entries: Arc::new(StdMutex::new(Vec::new())),
            processing: Arc::new(AtomicBool::new(false)),
            outcomes_tx,
        }
    }

    /// Subscribes to terminal outcomes (delivered / dropped / evicted).
    pub fn outcomes(&self) -> broadcast::Receiver<QueueOutcome> {
        self.outcomes_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Rehydrates the queue from the key-value store.
    ///
    /// Malformed persisted state is discarded with a warning rather than
    /// propagated; losing the backlog beats wedging startup.
    ///
    /// # Errors
    ///
    /// Only storage read failures propagate.
    pub async fn restore(&self) -> Result<usize, CoreError> {
        let Some(raw) = self.store.get(&self.config.storage_key).await? else {
            return Ok(0);
        };
        match serde_json::from_str::<Vec<QueuedRequest>>(&raw) {
            Ok(restored) => {
                let count = restored.len();
                *self.entries() = restored;
                debug!(count, "offline queue restored");
                Ok(count)
            }
            Err(err) => {
                warn!("discarding malformed persisted queue state: {}", err);
                if let Err(err) = self.store.remove(&self.config.storage_key).await {
                    warn!("failed to clear persisted queue state: {}", err);
                }
                Ok(0)
            }
        }
    }

    /// Adds a request to the queue.
    ///
    /// Insertion keeps the queue sorted by priority, ties in arrival order.
    /// At capacity the oldest low-priority entry is evicted; when none
    /// exists the enqueue is rejected.
    ///
    /// When the host is online, a drain starts immediately.
    ///
    /// # Errors
    ///
    /// `ValidationRejected` when the queue is full of medium/high-priority
    /// work.
    pub async fn enqueue(&self, request: QueuedRequest) -> Result<RequestId, CoreError> {
        let id = request.id;
        let evicted = {
            let mut entries = self.entries();
            let evicted = if entries.len() >= self.config.capacity {
                // Lows are grouped at the tail in arrival order, so the
                // first one found is the oldest.
                match entries.iter().position(|e| e.priority == Priority::Low) {
                    Some(pos) => Some(entries.remove(pos)),
                    None => {
                        return Err(CoreError::ValidationRejected(format!(
                            "offline queue at capacity ({}) with no low-priority entry to evict",
                            self.config.capacity
                        )));
                    }
                }
            } else {
                None
            };

            let index = entries.partition_point(|e| e.priority >= request.priority);
            entries.insert(index, request);
            evicted
        };

        if let Some(evicted) = evicted {
            warn!(request_id = %evicted.id, "offline queue full, evicted oldest low-priority request");
            let _ = self.outcomes_tx.send(QueueOutcome::Evicted { request: evicted });
        }

        self.persist().await;

        if self.monitor.is_online() {
            let queue = self.clone();
            tokio::spawn(async move { queue.process().await });
        }
        Ok(id)
    }

    /// Drains the queue, highest priority first.
    ///
    /// Re-entrant calls return immediately; one drain runs at a time. The
    /// drain stops when the queue empties, the host goes offline, or a
    /// retryable failure suggests the endpoint is still unreachable.
    pub async fn process(&self) {
        if self.processing.swap(true, Ordering::SeqCst) {
            return;
        }

        loop {
            if !self.monitor.is_online() {
                break;
            }
            let Some(request) = self.entries().first().cloned() else {
                break;
            };

            match self.dispatcher.dispatch(&request).await {
                Ok(response) => {
                    self.remove(&request.id);
                    self.persist().await;
                    debug!(request_id = %request.id, status = response.status, "queued request delivered");
                    let _ = self
                        .outcomes_tx
                        .send(QueueOutcome::Delivered { request, response });
                }
                Err(error) if error.is_retryable() => {
                    // Re-snapshot after the bump so subscribers see the
                    // spent retry count, not the pre-attempt clone.
                    let updated = {
                        let mut entries = self.entries();
                        entries.iter_mut().find(|e| e.id == request.id).map(|entry| {
                            entry.retry_count += 1;
                            entry.clone()
                        })
                    };
                    match updated {
                        Some(request)
                            if request.retries_exhausted(self.config.default_max_retries) =>
                        {
                            self.remove(&request.id);
                            self.persist().await;
                            warn!(request_id = %request.id, "retry budget spent, dropping request: {}", error);
                            let _ = self
                                .outcomes_tx
                                .send(QueueOutcome::Dropped { request, error });
                            continue;
                        }
                        _ => {
                            self.persist().await;
                            debug!(request_id = %request.id, "delivery failed, will retry on next drain: {}", error);
                            break;
                        }
                    }
                }
                Err(error) => {
                    self.remove(&request.id);
                    self.persist().await;
                    warn!(request_id = %request.id, "non-retryable failure, dropping request: {}", error);
                    let _ = self
                        .outcomes_tx
                        .send(QueueOutcome::Dropped { request, error });
                }
            }

            if !self.entries().is_empty() {
                tokio::time::sleep(self.config.drain_spacing()).await;
            }
        }

        self.processing.store(false, Ordering::SeqCst);
    }

    /// Starts draining whenever the host comes back online.
    pub fn watch_connectivity(&self) -> JoinHandle<()> {
        let queue = self.clone();
        let mut rx = self.monitor.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(NetworkEvent::Online) => {
                        debug!("network online, draining offline queue");
                        queue.process().await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "offline queue connectivity receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        })
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<QueuedRequest>> {
        self.entries.lock().expect("queue state lock poisoned")
    }

    fn remove(&self, id: &RequestId) {
        self.entries().retain(|e| &e.id != id);
    }

    /// Persists the whole queue; storage failures are logged, never fatal.
    async fn persist(&self) {
        let snapshot = self.entries().clone();
        let serialized = match serde_json::to_string(&snapshot) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("failed to serialize queue state: {}", err);
                return;
            }
        };
        if let Err(err) = self.store.put(&self.config.storage_key, &serialized).await {
            warn!("failed to persist queue state: {}", err);
        }
    }
}
