//! Queued mutating request awaiting replay.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{RequestId, Timestamp};

/// Drain priority of a queued request.
///
/// Ordering is `Low < Medium < High`; drains run highest first, ties in
/// arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// One mutating HTTP-style request captured while offline.
///
/// Owned by the offline queue, persisted on every queue mutation, destroyed
/// on successful delivery or once retries are exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    pub id: RequestId,
    pub url: String,
    /// HTTP method name, e.g. "POST".
    pub method: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub timestamp: Timestamp,
    pub retry_count: u32,
    /// Per-request retry budget; `None` falls back to the queue's configured
    /// default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    pub priority: Priority,
    /// Caller-supplied correlation data, e.g. `{sessionId, tempId}` for a
    /// queued message send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl QueuedRequest {
    /// Creates a request with a fresh id and zero retries.
    pub fn new(url: impl Into<String>, method: http::Method, body: Option<Value>) -> Self {
        Self {
            id: RequestId::new(),
            url: url.into(),
            method: method.to_string(),
            headers: HashMap::new(),
            body,
            timestamp: Timestamp::now(),
            retry_count: 0,
            max_retries: None,
            priority: Priority::default(),
            metadata: None,
        }
    }

    /// Sets the drain priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the retry budget, overriding the queue's configured default.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Attaches correlation metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns true once the retry budget is spent. `default_budget` applies
    /// when the request did not carry its own.
    pub fn retries_exhausted(&self, default_budget: u32) -> bool {
        self.retry_count >= self.max_retries.unwrap_or(default_budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_low_to_high() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
    }

    #[test]
    fn new_request_starts_with_zero_retries() {
        let req = QueuedRequest::new("/api/messages", http::Method::POST, None);
        assert_eq!(req.retry_count, 0);
        assert_eq!(req.method, "POST");
        assert_eq!(req.max_retries, None);
        assert!(!req.retries_exhausted(3));
    }

    #[test]
    fn retries_exhausted_at_budget() {
        let mut req = QueuedRequest::new("/x", http::Method::POST, None).with_max_retries(2);
        req.retry_count = 2;
        // The explicit budget wins over any default.
        assert!(req.retries_exhausted(5));
    }

    #[test]
    fn default_budget_applies_without_an_explicit_one() {
        let mut req = QueuedRequest::new("/x", http::Method::POST, None);
        req.retry_count = 1;
        assert!(req.retries_exhausted(1));
        assert!(!req.retries_exhausted(2));
    }

    #[test]
    fn builder_sets_fields() {
        let req = QueuedRequest::new("/x", http::Method::DELETE, None)
            .with_priority(Priority::High)
            .with_metadata(serde_json::json!({"tempId": "t1"}))
            .with_header("x-trace", "abc");

        assert_eq!(req.priority, Priority::High);
        assert_eq!(req.metadata.unwrap()["tempId"], "t1");
        assert_eq!(req.headers.get("x-trace").unwrap(), "abc");
    }

    #[test]
    fn serializes_and_rehydrates() {
        let req = QueuedRequest::new(
            "/api/messages",
            http::Method::POST,
            Some(serde_json::json!({"content": "hi"})),
        )
        .with_priority(Priority::High);

        let json = serde_json::to_string(&req).unwrap();
        let back: QueuedRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }
}
