//! End-to-end session flows: optimistic sends, queued replays, pushed
//! events, and the dedup guarantees across all three.

mod common;

use std::sync::Arc;

use common::{wait_until, MockChatApi, MockDispatcher, MockTransport};

use botwire::adapters::network::ManualNetworkMonitor;
use botwire::adapters::storage::MemoryKeyValueStore;
use botwire::application::{ChannelAdapter, OfflineRequestQueue, SessionSyncCoordinator};
use botwire::config::{ApiConfig, QueueConfig, RealtimeConfig};
use botwire::domain::connection::{Frame, PushedMessage};
use botwire::domain::foundation::{BotId, MessageId, SessionId, TempId, Timestamp};
use botwire::domain::session::{MessageStatus, Role};
use botwire::ports::{DispatchResponse, StaticCredentialProvider};

struct Harness {
    transport: Arc<MockTransport>,
    adapter: ChannelAdapter,
    coordinator: SessionSyncCoordinator,
    queue: OfflineRequestQueue,
    monitor: Arc<ManualNetworkMonitor>,
    api: Arc<MockChatApi>,
    dispatcher: Arc<MockDispatcher>,
}

fn harness(online: bool) -> Harness {
    let transport = Arc::new(MockTransport::new());
    let monitor = Arc::new(ManualNetworkMonitor::new(online));
    let api = Arc::new(MockChatApi::new());
    let dispatcher = Arc::new(MockDispatcher::new());
    let queue = OfflineRequestQueue::new(
        QueueConfig {
            drain_spacing_ms: 0,
            ..QueueConfig::default()
        },
        Arc::new(MemoryKeyValueStore::new()),
        dispatcher.clone(),
        monitor.clone(),
    );
    let adapter = ChannelAdapter::new(
        RealtimeConfig::default(),
        transport.clone(),
        Arc::new(StaticCredentialProvider::new("token")),
    );
    let coordinator = SessionSyncCoordinator::new(
        ApiConfig::default(),
        api.clone(),
        queue.clone(),
        monitor.clone(),
    );
    Harness {
        transport,
        adapter,
        coordinator,
        queue,
        monitor,
        api,
        dispatcher,
    }
}

fn sid(id: &str) -> SessionId {
    SessionId::new(id).unwrap()
}

fn bot(id: &str) -> BotId {
    BotId::new(id).unwrap()
}

fn pushed(id: &str, temp_id: Option<&str>, session: &str, content: &str) -> PushedMessage {
    PushedMessage {
        id: Some(MessageId::new(id).unwrap()),
        temp_id: temp_id.map(|t| TempId::new(t).unwrap()),
        session_id: sid(session),
        role: Role::Assistant,
        content: content.to_string(),
        created_at: Timestamp::from_unix_millis(1_000),
    }
}

#[tokio::test]
async fn offline_send_is_reconciled_after_queue_delivery() {
    common::init_tracing();
    let h = harness(false);
    let _outcome_watcher = h.coordinator.watch_queue_outcomes();
    let _connectivity_watcher = h.queue.watch_connectivity();
    h.dispatcher.push_result(Ok(DispatchResponse {
        status: 201,
        body: Some(serde_json::json!({ "id": "m1" })),
    }));

    let sent = h
        .coordinator
        .send_message(&sid("s1"), "hello")
        .await
        .unwrap();
    assert!(sent.is_pending());
    assert_eq!(h.queue.len(), 1);

    h.monitor.set_online(true);
    wait_until(|| h.queue.is_empty()).await;
    wait_until(|| {
        h.coordinator.timeline(&sid("s1"))[0].status == MessageStatus::Sent
    })
    .await;

    let timeline = h.coordinator.timeline(&sid("s1"));
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].id.as_ref().unwrap().as_str(), "m1");

    // The queued request carried the correlation metadata it was built with.
    let replayed = h.dispatcher.attempted.lock().unwrap();
    let metadata = replayed[0].metadata.as_ref().unwrap();
    assert_eq!(metadata["sessionId"], "s1");
}

#[tokio::test]
async fn pushed_messages_flow_through_the_channel_into_the_timeline() {
    let h = harness(true);
    let _frame_watcher = h.coordinator.watch_channel(&h.adapter);

    h.adapter.open_channel(&bot("b1")).await.unwrap();
    h.coordinator
        .select_session(&sid("s1"), &h.adapter)
        .await
        .unwrap();

    let link = h.transport.last_link();
    link.push_frame(Frame::Message(pushed("m5", None, "s1", "hi there")))
        .await;
    wait_until(|| h.coordinator.timeline(&sid("s1")).len() == 1).await;

    // A redelivered copy of the same message changes nothing.
    link.push_frame(Frame::Message(pushed("m5", None, "s1", "hi there")))
        .await;
    tokio::task::yield_now().await;
    assert_eq!(h.coordinator.timeline(&sid("s1")).len(), 1);
}

#[tokio::test]
async fn selecting_a_session_scopes_the_channel_without_reconnecting() {
    let h = harness(true);

    h.adapter.open_channel(&bot("b1")).await.unwrap();
    h.coordinator
        .select_session(&sid("s1"), &h.adapter)
        .await
        .unwrap();

    wait_until(|| {
        h.transport
            .last_link()
            .sent_frames()
            .iter()
            .any(|f| matches!(f, Frame::SwitchSession { session_id } if session_id.as_str() == "s1"))
    })
    .await;
    assert_eq!(h.transport.connect_count(), 1);
    assert_eq!(h.api.history_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pushed_copy_and_queued_ack_yield_one_message() {
    // The at-most-once scenario end to end: a send queued offline, its
    // pushed copy arriving over the channel first, then the queue's own
    // acknowledgment.
    let h = harness(false);
    let _outcome_watcher = h.coordinator.watch_queue_outcomes();

    let sent = h
        .coordinator
        .send_message(&sid("s1"), "hello")
        .await
        .unwrap();
    let temp_id = sent.temp_id.clone().unwrap();

    // Pushed copy carrying both the temp id and the server id wins the race.
    h.coordinator.ingest_pushed(pushed("m1", Some(temp_id.as_str()), "s1", "hello"));
    let timeline = h.coordinator.timeline(&sid("s1"));
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].id.as_ref().unwrap().as_str(), "m1");

    // Late queue delivery for the same send must not duplicate or corrupt.
    h.dispatcher.push_result(Ok(DispatchResponse {
        status: 201,
        body: Some(serde_json::json!({ "id": "m1" })),
    }));
    h.monitor.set_online(true);
    h.queue.process().await;
    tokio::task::yield_now().await;

    let timeline = h.coordinator.timeline(&sid("s1"));
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].id.as_ref().unwrap().as_str(), "m1");
    assert_eq!(timeline[0].status, MessageStatus::Sent);
}

#[tokio::test]
async fn rejected_queued_send_surfaces_as_failed_message() {
    let h = harness(false);
    let _outcome_watcher = h.coordinator.watch_queue_outcomes();
    h.dispatcher.push_result(Err(
        botwire::domain::foundation::CoreError::ValidationRejected("content too long".into()),
    ));

    h.coordinator
        .send_message(&sid("s1"), "way too long")
        .await
        .unwrap();

    h.monitor.set_online(true);
    h.queue.process().await;
    wait_until(|| {
        h.coordinator.timeline(&sid("s1"))[0].status == MessageStatus::Error
    })
    .await;
}
