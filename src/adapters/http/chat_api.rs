//! Chat API implementation over reqwest.
//!
//! Non-2xx statuses map into the [`CoreError`] taxonomy; 429 responses carry
//! the server's `Retry-After` hint so the caller's retry pacing can honor
//! it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ApiConfig;
use crate::domain::foundation::{BotId, CoreError, MessageId, SessionId, TempId, Timestamp};
use crate::domain::session::{ConversationSession, Message};
use crate::ports::{ChatApi, CredentialProvider, SendReceipt};

/// Chat API client over plain HTTP.
pub struct HttpChatApi {
    client: reqwest::Client,
    config: ApiConfig,
    credentials: Arc<dyn CredentialProvider>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageResponse {
    id: MessageId,
    created_at: Timestamp,
}

impl HttpChatApi {
    /// # Errors
    ///
    /// Fails only if the underlying HTTP client cannot be constructed.
    pub fn new(
        config: ApiConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| CoreError::Unknown(format!("failed to build http client: {}", err)))?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> CoreError {
        if err.is_timeout() {
            CoreError::ConnectionTimeout(self.config.request_timeout())
        } else if err.is_connect() {
            CoreError::NetworkUnreachable(err.to_string())
        } else {
            CoreError::Unknown(err.to_string())
        }
    }

    async fn execute(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, CoreError> {
        let mut builder = self
            .client
            .request(method.clone(), self.url(path))
            .bearer_auth(self.credentials.current().expose());
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;
        let status = response.status().as_u16();
        debug!(%method, path, status, "api request");

        if (200..300).contains(&status) {
            if status == 204 {
                return Ok(None);
            }
            return Ok(response.json::<Value>().await.ok());
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

    fn parse<T: serde::de::DeserializeOwned>(body: Option<Value>) -> Result<T, CoreError> {
        let body = body.ok_or_else(|| CoreError::Unknown("empty response body".to_string()))?;
        serde_json::from_value(body)
            .map_err(|err| CoreError::Unknown(format!("unexpected response shape: {}", err)))
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_sessions(&self, bot_id: &BotId) -> Result<Vec<ConversationSession>, CoreError> {
        let body = self
            .execute(
                reqwest::Method::GET,
                &format!("/bots/{}/sessions", bot_id),
                None,
            )
            .await?;
        Self::parse(body)
    }

    async fn create_session(
        &self,
        bot_id: &BotId,
        title: &str,
    ) -> Result<ConversationSession, CoreError> {
        let body = self
            .execute(
                reqwest::Method::POST,
                &format!("/bots/{}/sessions", bot_id),
                Some(json!({ "title": title })),
            )
            .await?;
        Self::parse(body)
    }

    async fn rename_session(
        &self,
        session_id: &SessionId,
        title: &str,
    ) -> Result<ConversationSession, CoreError> {
        let body = self
            .execute(
                reqwest::Method::PATCH,
                &format!("/sessions/{}", session_id),
                Some(json!({ "title": title })),
            )
            .await?;
        Self::parse(body)
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<(), CoreError> {
        self.execute(
            reqwest::Method::DELETE,
            &format!("/sessions/{}", session_id),
            None,
        )
        .await?;
        Ok(())
    }

    async fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<Message>, CoreError> {
        let body = self
            .execute(
                reqwest::Method::GET,
                &format!("/sessions/{}/messages", session_id),
                None,
            )
            .await?;
        Self::parse(body)
    }

    async fn send_message(
        &self,
        session_id: &SessionId,
        content: &str,
        temp_id: &TempId,
    ) -> Result<SendReceipt, CoreError> {
        let body = self
            .execute(
                reqwest::Method::POST,
                &format!("/sessions/{}/messages", session_id),
                Some(json!({ "content": content, "tempId": temp_id })),
            )
            .await?;
        let response: SendMessageResponse = Self::parse(body)?;
        Ok(SendReceipt {
            message_id: response.id,
            created_at: response.created_at,
        })
    }
}
