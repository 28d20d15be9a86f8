//! Request dispatcher implementation over reqwest.
//!
//! Replays offline-queued requests exactly as captured: same method, URL,
//! headers, and body, plus a fresh bearer credential (the one captured at
//! enqueue time may long since have expired).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::foundation::CoreError;
use crate::domain::queue::QueuedRequest;
use crate::ports::{CredentialProvider, DispatchResponse, RequestDispatcher};

/// Dispatcher delivering queued requests over HTTP.
pub struct HttpRequestDispatcher {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpRequestDispatcher {
    /// # Errors
    ///
    /// Fails only if the underlying HTTP client cannot be constructed.
    pub fn new(
        timeout: std::time::Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CoreError::Unknown(format!("failed to build http client: {}", err)))?;
        Ok(Self {
            client,
            credentials,
        })
    }
}

#[async_trait]
impl RequestDispatcher for HttpRequestDispatcher {
    async fn dispatch(&self, request: &QueuedRequest) -> Result<DispatchResponse, CoreError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            CoreError::ValidationRejected(format!("invalid http method: {}", request.method))
        })?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .bearer_auth(self.credentials.current().expose());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                CoreError::NetworkUnreachable(format!("request timed out: {}", err))
            } else if err.is_connect() {
                CoreError::NetworkUnreachable(err.to_string())
            } else {
                CoreError::Unknown(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        debug!(request_id = %request.id, status, "queued request dispatched");

        if (200..300).contains(&status) {
            let body = response.json::<Value>().await.ok();
            return Ok(DispatchResponse { status, body });
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let detail = response.text().await.unwrap_or_default();
        Err(match status {
            429 => CoreError::RateLimited { retry_after },
            _ => CoreError::from_http_status(status, detail),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StaticCredentialProvider;

    #[tokio::test]
    async fn invalid_method_is_rejected_before_any_network_io() {
        let dispatcher = HttpRequestDispatcher::new(
            std::time::Duration::from_secs(1),
            Arc::new(StaticCredentialProvider::new("token")),
        )
        .unwrap();

        let mut request = QueuedRequest::new("http://localhost:1/x", http::Method::POST, None);
        request.method = "NOT A METHOD".to_string();

        let result = dispatcher.dispatch(&request).await;
        assert!(matches!(result, Err(CoreError::ValidationRejected(_))));
    }
}
