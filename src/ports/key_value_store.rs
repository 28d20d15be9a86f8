//! Durable local storage port.
//!
//! A small key-value store used to persist the offline queue across page
//! reloads. Capacity is assumed to be limited: writes may fail, and callers
//! must tolerate that (log, don't crash).

use async_trait::async_trait;

use crate::domain::foundation::CoreError;

/// Port for durable key-value storage.
///
/// Values are whole-state JSON blobs overwritten on every mutation; the
/// store is not transactional, so concurrent writers must serialize through
/// the owning in-memory structure rather than writing keys directly.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// Removes `key` if present.
    async fn remove(&self, key: &str) -> Result<(), CoreError>;
}
