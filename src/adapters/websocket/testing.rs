//! Minimal transport double for unit tests elsewhere in the crate.

use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::connection::Frame;
use crate::domain::foundation::CoreError;
use crate::ports::{ConnectRequest, Transport, TransportEvent, TransportLink, TransportSink};

/// Transport that always connects and swallows everything sent.
#[derive(Default)]
pub(crate) struct NullTransport {
    // Keeps event senders alive so links do not appear dropped.
    handles: StdMutex<Vec<mpsc::Sender<TransportEvent>>>,
}

struct NullSink;

#[async_trait]
impl TransportSink for NullSink {
    async fn send(&mut self, _frame: Frame) -> Result<(), CoreError> {
        Ok(())
    }

    async fn close(&mut self, _code: u16) -> Result<(), CoreError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for NullTransport {
    async fn connect(&self, _request: ConnectRequest) -> Result<TransportLink, CoreError> {
        let (tx, rx) = mpsc::channel(16);
        self.handles.lock().expect("handles lock poisoned").push(tx);
        Ok(TransportLink {
            sink: Box::new(NullSink),
            events: rx,
        })
    }
}
