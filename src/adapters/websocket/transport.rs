//! Transport implementation over tokio-tungstenite.
//!
//! Frames travel as JSON text messages in the `{type, data, timestamp, id?}`
//! envelope. The read half runs in its own task and feeds decoded frames to
//! the core through the link's event channel; undecodable frames are logged
//! and skipped rather than killing the link.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::connection::{close_code, Frame, WireFrame};
use crate::domain::foundation::CoreError;
use crate::ports::{ConnectRequest, Transport, TransportEvent, TransportLink, TransportSink};

const EVENT_CHANNEL_CAPACITY: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production transport dialing over WebSocket.
#[derive(Debug, Default, Clone)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, request: ConnectRequest) -> Result<TransportLink, CoreError> {
        let mut endpoint = request.endpoint.clone();
        if !request.params.is_empty() {
            let query: Vec<String> = request
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            endpoint.push('?');
            endpoint.push_str(&query.join("&"));
        }

        let mut ws_request = endpoint
            .into_client_request()
            .map_err(|err| CoreError::ConnectionFailed(err.to_string()))?;
        let auth = format!("Bearer {}", request.credential.expose());
        ws_request.headers_mut().insert(
            AUTHORIZATION,
            auth.parse()
                .map_err(|_| CoreError::ConnectionFailed("credential is not header-safe".into()))?,
        );

        let (stream, _response) = connect_async(ws_request).await.map_err(map_connect_error)?;
        debug!(endpoint = %request.endpoint, "websocket handshake complete");

        let (write, read) = stream.split();
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(pump_inbound(read, events_tx));

        Ok(TransportLink {
            sink: Box::new(WsSink { write }),
            events: events_rx,
        })
    }
}

/// Maps handshake failures into the error taxonomy; HTTP-level rejections
/// keep their auth/forbidden meaning.
fn map_connect_error(err: WsError) -> CoreError {
    match err {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            let detail = response
                .body()
                .as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            CoreError::from_http_status(status, detail)
        }
        WsError::Io(err) => CoreError::NetworkUnreachable(err.to_string()),
        WsError::Url(err) => CoreError::ConnectionFailed(err.to_string()),
        other => CoreError::WebSocket(other.to_string()),
    }
}

struct WsSink {
    write: SplitSink<WsStream, WsMessage>,
}

#[async_trait]
impl TransportSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), CoreError> {
        let wire = frame.into_wire(Some(Uuid::new_v4().to_string()));
        let text = serde_json::to_string(&wire)
            .map_err(|err| CoreError::WebSocket(format!("frame encoding failed: {}", err)))?;
        self.write
            .send(WsMessage::Text(text))
            .await
            .map_err(|err| CoreError::WebSocket(err.to_string()))
    }

    async fn close(&mut self, code: u16) -> Result<(), CoreError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: std::borrow::Cow::Borrowed(""),
        };
        self.write
            .send(WsMessage::Close(Some(frame)))
            .await
            .map_err(|err| CoreError::WebSocket(err.to_string()))
    }
}

/// Reads the socket until it dies, translating messages into transport
/// events.
async fn pump_inbound(mut read: SplitStream<WsStream>, events: mpsc::Sender<TransportEvent>) {
    while let Some(item) = read.next().await {
        match item {
            Ok(WsMessage::Text(text)) => {
                let decoded = serde_json::from_str::<WireFrame>(&text)
                    .map_err(|err| CoreError::ValidationRejected(err.to_string()))
                    .and_then(Frame::from_wire);
                match decoded {
                    Ok(frame) => {
                        if events.send(TransportEvent::Frame(frame)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => warn!("discarding undecodable frame: {}", err),
                }
            }
            // Protocol-level pings are answered by tungstenite itself.
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) | Ok(WsMessage::Frame(_)) => {}
            Ok(WsMessage::Binary(_)) => {
                warn!("discarding unexpected binary message");
            }
            Ok(WsMessage::Close(frame)) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.into_owned()))
                    .unwrap_or((close_code::NORMAL, String::new()));
                let _ = events.send(TransportEvent::Closed { code, reason }).await;
                return;
            }
            Err(err) => {
                let _ = events.send(TransportEvent::Error(err.to_string())).await;
                return;
            }
        }
    }
    // Stream ended without a close handshake.
    let _ = events
        .send(TransportEvent::Error(
            "connection ended without close frame".to_string(),
        ))
        .await;
}
