//! In-memory doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use botwire::domain::connection::Frame;
use botwire::domain::foundation::{BotId, CoreError, MessageId, SessionId, TempId, Timestamp};
use botwire::domain::queue::QueuedRequest;
use botwire::domain::session::{ConversationSession, Message};
use botwire::ports::{
    ChatApi, ConnectRequest, DispatchResponse, RequestDispatcher, SendReceipt, Transport,
    TransportEvent, TransportLink, TransportSink,
};

/// Handle onto one established mock connection: drive inbound events, read
/// back what the core sent.
#[derive(Clone)]
pub struct LinkHandle {
    pub events: mpsc::Sender<TransportEvent>,
    pub sent: Arc<Mutex<Vec<Frame>>>,
}

impl LinkHandle {
    pub async fn push_frame(&self, frame: Frame) {
        let _ = self.events.send(TransportEvent::Frame(frame)).await;
    }

    pub async fn close(&self, code: u16, reason: &str) {
        let _ = self
            .events
            .send(TransportEvent::Closed {
                code,
                reason: reason.to_string(),
            })
            .await;
    }

    pub fn sent_frames(&self) -> Vec<Frame> {
        self.sent.lock().unwrap().clone()
    }
}

/// Transport double: scriptable connect failures, one [`LinkHandle`] per
/// successful connect.
#[derive(Default)]
pub struct MockTransport {
    connects: AtomicUsize,
    scripted_failures: Mutex<VecDeque<CoreError>>,
    links: Mutex<Vec<LinkHandle>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next connect attempt fail with `error`.
    pub fn fail_next(&self, error: CoreError) {
        self.scripted_failures.lock().unwrap().push_back(error);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn link(&self, index: usize) -> LinkHandle {
        self.links.lock().unwrap()[index].clone()
    }

    pub fn last_link(&self) -> LinkHandle {
        self.links
            .lock()
            .unwrap()
            .last()
            .expect("no link established")
            .clone()
    }
}

struct MockSink {
    sent: Arc<Mutex<Vec<Frame>>>,
}

#[async_trait]
impl TransportSink for MockSink {
    async fn send(&mut self, frame: Frame) -> Result<(), CoreError> {
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn close(&mut self, _code: u16) -> Result<(), CoreError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _request: ConnectRequest) -> Result<TransportLink, CoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.scripted_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let (tx, rx) = mpsc::channel(32);
        let sent = Arc::new(Mutex::new(Vec::new()));
        self.links.lock().unwrap().push(LinkHandle {
            events: tx,
            sent: sent.clone(),
        });
        Ok(TransportLink {
            sink: Box::new(MockSink { sent }),
            events: rx,
        })
    }
}

/// Chat API double with scriptable receipts and per-session history.
pub struct MockChatApi {
    pub receipts: Mutex<VecDeque<Result<SendReceipt, CoreError>>>,
    pub history: Mutex<HashMap<SessionId, Vec<Message>>>,
    pub history_calls: AtomicUsize,
}

impl MockChatApi {
    pub fn new() -> Self {
        Self {
            receipts: Mutex::new(VecDeque::new()),
            history: Mutex::new(HashMap::new()),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_receipt(&self, result: Result<SendReceipt, CoreError>) {
        self.receipts.lock().unwrap().push_back(result);
    }

    pub fn set_history(&self, session_id: SessionId, messages: Vec<Message>) {
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
impl ChatApi for MockChatApi {
    async fn list_sessions(&self, bot_id: &BotId) -> Result<Vec<ConversationSession>, CoreError> {
        Ok(vec![session_record("s1", bot_id.as_str(), "First chat")])
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

/// Dispatcher double: scriptable results, records attempted URLs in order.
#[derive(Default)]
pub struct MockDispatcher {
    pub results: Mutex<VecDeque<Result<DispatchResponse, CoreError>>>,
    pub attempted: Mutex<Vec<QueuedRequest>>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: Result<DispatchResponse, CoreError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn attempted_urls(&self) -> Vec<String> {
        self.attempted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

#[async_trait]
impl RequestDispatcher for MockDispatcher {
    async fn dispatch(&self, request: &QueuedRequest) -> Result<DispatchResponse, CoreError> {
        self.attempted.lock().unwrap().push(request.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(DispatchResponse {
                status: 200,
                body: None,
            }))
    }
}

/// Installs a test subscriber once so `RUST_LOG=botwire=debug` shows the
/// core's tracing during a failing run.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Polls `condition` under the (possibly paused) tokio clock until it holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within time budget");
}
