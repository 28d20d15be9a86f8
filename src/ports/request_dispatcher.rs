//! Request dispatcher port - delivery of replayed offline requests.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::CoreError;
use crate::domain::queue::QueuedRequest;

/// Result of a successful delivery.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: u16,

    /// Parsed JSON body when the endpoint returned one. Queued message
    /// sends read the server-assigned message id out of here.
    pub body: Option<Value>,
}

/// Port that delivers one queued request to its endpoint.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Attempts delivery once.
    ///
    /// # Errors
    ///
    /// Failures map into the [`CoreError`] taxonomy; the queue consults
    /// `is_retryable()` to decide between retrying and dropping.
    async fn dispatch(&self, request: &QueuedRequest) -> Result<DispatchResponse, CoreError>;
}
