//! Session synchronization: sessions, timelines, and optimistic sends.
//!
//! The coordinator is the meeting point of the three message paths (history
//! fetch, pushed events, local sends). Everything funnels into per-session
//! [`Timeline`]s, whose dedup gate keeps the at-most-once display guarantee
//! no matter which path delivers a copy first.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::domain::connection::{Frame, PushedMessage};
use crate::domain::foundation::{BotId, CoreError, MessageId, SessionId, TempId};
use crate::domain::queue::{Priority, QueuedRequest};
use crate::domain::session::{
    ConversationSession, IngestOutcome, Message, MessageStatus, Timeline,
};
use crate::ports::{ChatApi, NetworkMonitor};

use super::{ChannelAdapter, ChannelEvent, OfflineRequestQueue, QueueOutcome};

struct SyncState {
    sessions: HashMap<SessionId, ConversationSession>,
    timelines: HashMap<SessionId, Timeline>,
    /// Sessions whose history has been fetched; selection does not refetch.
    loaded: HashSet<SessionId>,
    /// Sessions with a history fetch in flight; concurrent selects no-op.
    loading: HashSet<SessionId>,
    selected: Option<SessionId>,
}

/// Keeps local session and timeline state in sync with the platform.
#[derive(Clone)]
pub struct SessionSyncCoordinator {
    api_config: ApiConfig,
    api: Arc<dyn ChatApi>,
    queue: OfflineRequestQueue,
    monitor: Arc<dyn NetworkMonitor>,
    state: Arc<StdMutex<SyncState>>,
}

impl SessionSyncCoordinator {
    pub fn new(
        api_config: ApiConfig,
        api: Arc<dyn ChatApi>,
        queue: OfflineRequestQueue,
        monitor: Arc<dyn NetworkMonitor>,
    ) -> Self {
        Self {
            api_config,
            api,
            queue,
            monitor,
            state: Arc::new(StdMutex::new(SyncState {
                sessions: HashMap::new(),
                timelines: HashMap::new(),
                loaded: HashSet::new(),
                loading: HashSet::new(),
                selected: None,
            })),
        }
    }

    /// Sessions currently known, unordered.
    pub fn sessions(&self) -> Vec<ConversationSession> {
        self.state().sessions.values().cloned().collect()
    }

    /// Snapshot of one session's timeline in display order.
    pub fn timeline(&self, session_id: &SessionId) -> Vec<Message> {
        self.state()
            .timelines
            .get(session_id)
            .map(|t| t.messages().to_vec())
            .unwrap_or_default()
    }

    /// The session pushed events are currently scoped to, if any.
    pub fn selected_session(&self) -> Option<SessionId> {
        self.state().selected.clone()
    }

    /// Fetches the session list for a bot and replaces the local view.
    pub async fn load_sessions(
        &self,
        bot_id: &BotId,
    ) -> Result<Vec<ConversationSession>, CoreError> {
        let sessions = self.api.list_sessions(bot_id).await?;
        let mut state = self.state();
        for session in &sessions {
            state.sessions.insert(session.id.clone(), session.clone());
        }
        Ok(sessions)
    }

    /// Creates a session on the server and registers it locally.
    pub async fn create_session(
        &self,
        bot_id: &BotId,
        title: &str,
    ) -> Result<ConversationSession, CoreError> {
        let session = self.api.create_session(bot_id, title).await?;
        self.state()
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Renames a session on the server, updating the local copy on success.
    pub async fn rename_session(
        &self,
        session_id: &SessionId,
        title: &str,
    ) -> Result<ConversationSession, CoreError> {
        let session = self.api.rename_session(session_id, title).await?;
        self.state()
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Deletes a session and forgets all local state tied to it.
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<(), CoreError> {
        self.api.delete_session(session_id).await?;
        let mut state = self.state();
        state.sessions.remove(session_id);
        state.timelines.remove(session_id);
        state.loaded.remove(session_id);
        if state.selected.as_ref() == Some(session_id) {
            state.selected = None;
        }
        Ok(())
    }

    /// Makes a session the active one: loads its history (once) and scopes
    /// the channel to it via a sub-topic switch.
    ///
    /// Re-entrant: a select for a session whose history fetch is already in
    /// flight returns without doing anything.
    pub async fn select_session(
        &self,
        session_id: &SessionId,
        adapter: &ChannelAdapter,
    ) -> Result<(), CoreError> {
        let needs_fetch = {
            let mut state = self.state();
            if state.loading.contains(session_id) {
                return Ok(());
            }
            let needs_fetch = !state.loaded.contains(session_id);
            if needs_fetch {
                state.loading.insert(session_id.clone());
            }
            needs_fetch
        };

        if needs_fetch {
            let result = self.api.fetch_history(session_id).await;
            let mut state = self.state();
            state.loading.remove(session_id);
            match result {
                Ok(history) => {
                    let timeline = state.timelines.entry(session_id.clone()).or_default();
                    for message in history {
                        timeline.ingest(message);
                    }
                    state.loaded.insert(session_id.clone());
                }
                Err(err) => return Err(err),
            }
        }

        self.state().selected = Some(session_id.clone());
        adapter.switch_sub_topic(session_id.clone()).await;
        Ok(())
    }

    /// Sends a message with optimistic display.
    ///
    /// The optimistic entry (temp id, status `sending`) lands in the
    /// timeline before any network work. Online, the send goes straight to
    /// the API and the acknowledgment reconciles the entry in place.
    /// Offline, or on a retryable failure, the send is parked in the offline
    /// queue and reconciled later from the queue's outcome.
    ///
    /// # Errors
    ///
    /// Only non-retryable rejections (validation, auth) surface here; the
    /// optimistic entry is marked failed first. Queued sends return `Ok`
    /// with the entry still pending.
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        content: &str,
    ) -> Result<Message, CoreError> {
        let message = self.append_optimistic(session_id, content);
        let temp_id = message
            .temp_id
            .clone()
            .ok_or_else(|| CoreError::Unknown("optimistic message missing temp id".into()))?;

        if !self.monitor.is_online() {
            debug!(session_id = %session_id, "offline, queueing message send");
            self.enqueue_send(session_id, content, &temp_id).await?;
            return Ok(message);
        }

        match self.api.send_message(session_id, content, &temp_id).await {
            Ok(receipt) => {
                self.reconcile(
                    session_id,
                    &temp_id,
                    receipt.message_id.clone(),
                    MessageStatus::Sent,
                );
                let mut acknowledged = message;
                acknowledged.id = Some(receipt.message_id);
                acknowledged.status = MessageStatus::Sent;
                Ok(acknowledged)
            }
            Err(err) if err.is_retryable() => {
                debug!(session_id = %session_id, "send failed, queueing for replay: {}", err);
                self.enqueue_send(session_id, content, &temp_id).await?;
                Ok(message)
            }
            Err(err) => {
                warn!(session_id = %session_id, "message send rejected: {}", err);
                self.mark_failed(session_id, &temp_id);
                Err(err)
            }
        }
    }

    /// Appends an optimistic entry (generated temp id, status `sending`) to
    /// the session's timeline without any network work. [`Self::send_message`]
    /// does this as its first step; it is exposed for hosts that deliver
    /// through their own channel.
    pub fn append_optimistic(&self, session_id: &SessionId, content: &str) -> Message {
        let message = Message::optimistic(session_id.clone(), content);
        self.state()
            .timelines
            .entry(session_id.clone())
            .or_default()
            .ingest(message.clone());
        message
    }

    /// Replaces an optimistic entry's temp id with the server-assigned id
    /// and settles its status. A no-op when no entry carries `temp_id`,
    /// which happens when a pushed copy of the message wins the race.
    pub fn reconcile(
        &self,
        session_id: &SessionId,
        temp_id: &TempId,
        final_id: MessageId,
        status: MessageStatus,
    ) {
        let applied = self
            .state()
            .timelines
            .entry(session_id.clone())
            .or_default()
            .reconcile(temp_id, final_id, status);
        if !applied {
            debug!(session_id = %session_id, temp_id = %temp_id, "acknowledgment had nothing to reconcile");
        }
    }

    /// Feeds a server-pushed message through the timeline's dedup gate.
    pub fn ingest_pushed(&self, pushed: PushedMessage) -> IngestOutcome {
        let session_id = pushed.session_id.clone();
        self.state()
            .timelines
            .entry(session_id)
            .or_default()
            .ingest(Message::from_pushed(pushed))
    }

    /// Consumes the channel's event stream, ingesting pushed messages.
    pub fn watch_channel(&self, adapter: &ChannelAdapter) -> JoinHandle<()> {
        let coordinator = self.clone();
        let mut rx = adapter.events();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ChannelEvent::Frame(Frame::Message(pushed))) => {
                        coordinator.ingest_pushed(pushed);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "channel event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        })
    }

    /// Consumes queue outcomes, reconciling or failing queued sends.
    pub fn watch_queue_outcomes(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        let mut rx = self.queue.outcomes();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(outcome) => coordinator.apply_queue_outcome(outcome),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "queue outcome receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SyncState> {
        self.state.lock().expect("sync state lock poisoned")
    }

    async fn enqueue_send(
        &self,
        session_id: &SessionId,
        content: &str,
        temp_id: &TempId,
    ) -> Result<(), CoreError> {
        let url = format!(
            "{}/sessions/{}/messages",
            self.api_config.base_url.trim_end_matches('/'),
            session_id
        );
        let request = QueuedRequest::new(
            url,
            http::Method::POST,
            Some(json!({ "content": content, "tempId": temp_id })),
        )
        .with_priority(Priority::High)
        .with_metadata(json!({ "sessionId": session_id, "tempId": temp_id }));

        match self.queue.enqueue(request).await {
            Ok(_) => Ok(()),
            Err(err) => {
                // The queue refused it; the entry cannot ever be delivered.
                self.mark_failed(session_id, temp_id);
                Err(err)
            }
        }
    }

    fn mark_failed(&self, session_id: &SessionId, temp_id: &TempId) {
        if let Some(timeline) = self.state().timelines.get_mut(session_id) {
            timeline.mark_send_failed(temp_id);
        }
    }

    /// Correlates a queue outcome back to its optimistic timeline entry via
    /// the request's `{sessionId, tempId}` metadata.
    fn apply_queue_outcome(&self, outcome: QueueOutcome) {
        let (request, delivered_id, failed) = match outcome {
            QueueOutcome::Delivered { request, response } => {
                let id = response
                    .body
                    .as_ref()
                    .and_then(|body| body.get("id"))
                    .and_then(|id| id.as_str())
                    .map(|id| MessageId::new(id))
                    .transpose()
                    .unwrap_or(None);
                (request, id, false)
            }
            QueueOutcome::Dropped { request, .. } | QueueOutcome::Evicted { request } => {
                (request, None, true)
            }
        };

        let Some(metadata) = &request.metadata else {
            return;
        };
        let session_id = metadata
            .get("sessionId")
            .and_then(|v| v.as_str())
            .and_then(|v| SessionId::new(v).ok());
        let temp_id = metadata
            .get("tempId")
            .and_then(|v| v.as_str())
            .and_then(|v| TempId::new(v).ok());
        let (Some(session_id), Some(temp_id)) = (session_id, temp_id) else {
            return;
        };

        if failed {
            self.mark_failed(&session_id, &temp_id);
        } else if let Some(final_id) = delivered_id {
            self.reconcile(&session_id, &temp_id, final_id, MessageStatus::Sent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::adapters::network::ManualNetworkMonitor;
    use crate::adapters::storage::MemoryKeyValueStore;
    use crate::config::QueueConfig;
    use crate::domain::foundation::Timestamp;
    use crate::domain::session::Role;
    use crate::ports::{DispatchResponse, RequestDispatcher, SendReceipt};

    struct StubApi {
        receipts: StdMutex<VecDeque<Result<SendReceipt, CoreError>>>,
        history: StdMutex<HashMap<SessionId, Vec<Message>>>,
        history_calls: AtomicUsize,
    }

    impl StubApi {
        fn new() -> Self {
            Self {
                receipts: StdMutex::new(VecDeque::new()),
                history: StdMutex::new(HashMap::new()),
                history_calls: AtomicUsize::new(0),
            }
        }

        fn push_receipt(&self, result: Result<SendReceipt, CoreError>) {
            self.receipts.lock().unwrap().push_back(result);
        }

        fn set_history(&self, session_id: SessionId, messages: Vec<Message>) {
            self.history.lock().unwrap().insert(session_id, messages);
        }
    }

    fn session_record(id: &str, bot: &str, title: &str) -> ConversationSession {
        ConversationSession {
            id: SessionId::new(id).unwrap(),
            bot_id: BotId::new(bot).unwrap(),
            title: title.to_string(),
            created_at: Timestamp::from_unix_millis(0),
            updated_at: Timestamp::from_unix_millis(0),
        }
    }

    #[async_trait]
    impl ChatApi for StubApi {
        async fn list_sessions(
            &self,
            bot_id: &BotId,
        ) -> Result<Vec<ConversationSession>, CoreError> {
            Ok(vec![session_record("s1", bot_id.as_str(), "First")])
        }

        async fn create_session(
            &self,
            bot_id: &BotId,
            title: &str,
        ) -> Result<ConversationSession, CoreError> {
            Ok(session_record("s-new", bot_id.as_str(), title))
        }

        async fn rename_session(
            &self,
            session_id: &SessionId,
            title: &str,
        ) -> Result<ConversationSession, CoreError> {
            Ok(session_record(session_id.as_str(), "b1", title))
        }

        async fn delete_session(&self, _session_id: &SessionId) -> Result<(), CoreError> {
            Ok(())
        }

        async fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<Message>, CoreError> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .history
                .lock()
                .unwrap()
                .get(session_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn send_message(
            &self,
            _session_id: &SessionId,
            _content: &str,
            _temp_id: &TempId,
        ) -> Result<SendReceipt, CoreError> {
            self.receipts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(SendReceipt {
                    message_id: MessageId::new("m-default").unwrap(),
                    created_at: Timestamp::from_unix_millis(0),
                }))
        }
    }

    struct NoopDispatcher;

    #[async_trait]
    impl RequestDispatcher for NoopDispatcher {
        async fn dispatch(
            &self,
            _request: &QueuedRequest,
        ) -> Result<DispatchResponse, CoreError> {
            Ok(DispatchResponse {
                status: 200,
                body: None,
            })
        }
    }

    struct Fixture {
        coordinator: SessionSyncCoordinator,
        api: Arc<StubApi>,
        monitor: Arc<ManualNetworkMonitor>,
        queue: OfflineRequestQueue,
    }

    fn fixture(online: bool) -> Fixture {
        let api = Arc::new(StubApi::new());
        let monitor = Arc::new(ManualNetworkMonitor::new(online));
        let queue = OfflineRequestQueue::new(
            QueueConfig::default(),
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(NoopDispatcher),
            monitor.clone(),
        );
        let coordinator = SessionSyncCoordinator::new(
            ApiConfig::default(),
            api.clone(),
            queue.clone(),
            monitor.clone(),
        );
        Fixture {
            coordinator,
            api,
            monitor,
            queue,
        }
    }

    fn sid(id: &str) -> SessionId {
        SessionId::new(id).unwrap()
    }

    fn pushed(id: Option<&str>, temp_id: Option<&str>, session: &str, content: &str) -> PushedMessage {
        PushedMessage {
            id: id.map(|v| MessageId::new(v).unwrap()),
            temp_id: temp_id.map(|v| TempId::new(v).unwrap()),
            session_id: sid(session),
            role: Role::Assistant,
            content: content.to_string(),
            created_at: Timestamp::from_unix_millis(1_000),
        }
    }

    #[tokio::test]
    async fn online_send_reconciles_to_server_id() {
        let f = fixture(true);
        f.api.push_receipt(Ok(SendReceipt {
            message_id: MessageId::new("m1").unwrap(),
            created_at: Timestamp::from_unix_millis(500),
        }));

        let sent = f.coordinator.send_message(&sid("s1"), "hello").await.unwrap();
        assert_eq!(sent.id.as_ref().unwrap().as_str(), "m1");
        assert_eq!(sent.status, MessageStatus::Sent);

        let timeline = f.coordinator.timeline(&sid("s1"));
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].id.as_ref().unwrap().as_str(), "m1");
    }

    #[tokio::test]
    async fn manual_append_and_reconcile_settle_the_entry() {
        let f = fixture(true);

        let message = f.coordinator.append_optimistic(&sid("s1"), "hello");
        let temp_id = message.temp_id.clone().unwrap();
        assert_eq!(
            f.coordinator.timeline(&sid("s1"))[0].status,
            MessageStatus::Sending
        );

        f.coordinator.reconcile(
            &sid("s1"),
            &temp_id,
            MessageId::new("m9").unwrap(),
            MessageStatus::Sent,
        );
        let timeline = f.coordinator.timeline(&sid("s1"));
        assert_eq!(timeline[0].id.as_ref().unwrap().as_str(), "m9");
        assert_eq!(timeline[0].status, MessageStatus::Sent);

        // Reconciling an unknown temp id changes nothing.
        f.coordinator.reconcile(
            &sid("s1"),
            &TempId::new("t-ghost").unwrap(),
            MessageId::new("m10").unwrap(),
            MessageStatus::Sent,
        );
        assert_eq!(f.coordinator.timeline(&sid("s1")).len(), 1);
    }

    #[tokio::test]
    async fn offline_send_queues_and_stays_pending() {
        let f = fixture(false);

        let sent = f.coordinator.send_message(&sid("s1"), "hello").await.unwrap();
        assert!(sent.is_pending());
        assert_eq!(f.queue.len(), 1);

        let timeline = f.coordinator.timeline(&sid("s1"));
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].status, MessageStatus::Sending);
    }

    #[tokio::test]
    async fn retryable_send_failure_falls_back_to_queue() {
        let f = fixture(true);
        f.api
            .push_receipt(Err(CoreError::NetworkUnreachable("down".into())));

        let sent = f.coordinator.send_message(&sid("s1"), "hello").await.unwrap();
        assert!(sent.is_pending());
        assert_eq!(f.queue.len(), 1);
    }

    #[tokio::test]
    async fn rejected_send_marks_entry_failed() {
        let f = fixture(true);
        f.api
            .push_receipt(Err(CoreError::ValidationRejected("too long".into())));

        let result = f.coordinator.send_message(&sid("s1"), "hello").await;
        assert!(result.is_err());

        let timeline = f.coordinator.timeline(&sid("s1"));
        assert_eq!(timeline[0].status, MessageStatus::Error);
    }

    #[tokio::test]
    async fn pushed_copy_of_own_send_does_not_duplicate() {
        let f = fixture(true);
        f.api.push_receipt(Ok(SendReceipt {
            message_id: MessageId::new("m1").unwrap(),
            created_at: Timestamp::from_unix_millis(500),
        }));

        let sent = f.coordinator.send_message(&sid("s1"), "hello").await.unwrap();
        let temp_id = sent.temp_id.as_ref().unwrap().as_str();

        let outcome = f.coordinator.ingest_pushed(pushed(
            Some("m1"),
            Some(temp_id),
            "s1",
            "hello",
        ));
        assert_eq!(outcome, IngestOutcome::Duplicate);
        assert_eq!(f.coordinator.timeline(&sid("s1")).len(), 1);
    }

    #[tokio::test]
    async fn pushed_copy_arriving_before_ack_reconciles() {
        let f = fixture(false);

        let sent = f.coordinator.send_message(&sid("s1"), "hello").await.unwrap();
        let temp_id = sent.temp_id.as_ref().unwrap().as_str();

        let outcome = f.coordinator.ingest_pushed(pushed(
            Some("m1"),
            Some(temp_id),
            "s1",
            "hello",
        ));
        assert_eq!(outcome, IngestOutcome::Reconciled);

        let timeline = f.coordinator.timeline(&sid("s1"));
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].id.as_ref().unwrap().as_str(), "m1");
    }

    #[tokio::test]
    async fn history_is_fetched_once_per_session() {
        let f = fixture(true);
        f.api.set_history(
            sid("s1"),
            vec![Message {
                id: Some(MessageId::new("m1").unwrap()),
                temp_id: None,
                session_id: sid("s1"),
                role: Role::Assistant,
                content: "welcome".to_string(),
                status: MessageStatus::Sent,
                created_at: Timestamp::from_unix_millis(100),
                metadata: None,
            }],
        );

        let transport = Arc::new(crate::adapters::websocket::testing::NullTransport::default());
        let adapter = ChannelAdapter::new(
            crate::config::RealtimeConfig::default(),
            transport,
            Arc::new(crate::ports::StaticCredentialProvider::new("token")),
        );

        f.coordinator
            .select_session(&sid("s1"), &adapter)
            .await
            .unwrap();
        f.coordinator
            .select_session(&sid("s1"), &adapter)
            .await
            .unwrap();

        assert_eq!(f.api.history_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.coordinator.timeline(&sid("s1")).len(), 1);
        assert_eq!(f.coordinator.selected_session(), Some(sid("s1")));
    }

    #[tokio::test]
    async fn delivered_queue_outcome_reconciles_entry() {
        let f = fixture(false);
        let _ = f.monitor; // stays offline for this test

        let sent = f.coordinator.send_message(&sid("s1"), "hello").await.unwrap();
        let temp_id = sent.temp_id.clone().unwrap();

        let request = QueuedRequest::new("/x", http::Method::POST, None)
            .with_metadata(json!({ "sessionId": "s1", "tempId": temp_id }));
        f.coordinator.apply_queue_outcome(QueueOutcome::Delivered {
            request,
            response: DispatchResponse {
                status: 201,
                body: Some(json!({ "id": "m9" })),
            },
        });

        let timeline = f.coordinator.timeline(&sid("s1"));
        assert_eq!(timeline[0].id.as_ref().unwrap().as_str(), "m9");
        assert_eq!(timeline[0].status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn dropped_queue_outcome_marks_entry_failed() {
        let f = fixture(false);

        let sent = f.coordinator.send_message(&sid("s1"), "hello").await.unwrap();
        let temp_id = sent.temp_id.clone().unwrap();

        let request = QueuedRequest::new("/x", http::Method::POST, None)
            .with_metadata(json!({ "sessionId": "s1", "tempId": temp_id }));
        f.coordinator.apply_queue_outcome(QueueOutcome::Dropped {
            request,
            error: CoreError::ServerError {
                status: 500,
                detail: "boom".into(),
            },
        });

        let timeline = f.coordinator.timeline(&sid("s1"));
        assert_eq!(timeline[0].status, MessageStatus::Error);
    }

    #[tokio::test]
    async fn delete_session_forgets_local_state() {
        let f = fixture(true);
        f.coordinator.send_message(&sid("s1"), "hello").await.unwrap();

        f.coordinator.delete_session(&sid("s1")).await.unwrap();
        assert!(f.coordinator.timeline(&sid("s1")).is_empty());
    }
}
