//! File-backed key-value store.
//!
//! One JSON object per store file, rewritten whole on every mutation. The
//! offline queue's state is small (tens of requests), so the simplicity of
//! whole-file rewrites wins over anything incremental.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::foundation::CoreError;
use crate::ports::KeyValueStore;

/// Durable store persisting to a single JSON file.
pub struct FileKeyValueStore {
    path: PathBuf,
    // Serializes read-modify-write cycles against the file.
    guard: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<HashMap<String, String>, CoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => Ok(entries),
                Err(err) => {
                    warn!(path = %self.path.display(), "discarding corrupt store file: {}", err);
                    Ok(HashMap::new())
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(CoreError::Unknown(format!(
                "failed to read store file {}: {}",
                self.path.display(),
                err
            ))),
        }
    }

    async fn save(&self, entries: &HashMap<String, String>) -> Result<(), CoreError> {
        let serialized = serde_json::to_string(entries)
            .map_err(|err| CoreError::Unknown(format!("failed to serialize store: {}", err)))?;
        tokio::fs::write(&self.path, serialized).await.map_err(|err| {
            CoreError::Unknown(format!(
                "failed to write store file {}: {}",
                self.path.display(),
                err
            ))
        })
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let _guard = self.guard.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let _guard = self.guard.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        let _guard = self.guard.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileKeyValueStore::new(&path);
        store.put("queue", "[1,2,3]").await.unwrap();

        let reopened = FileKeyValueStore::new(&path);
        assert_eq!(
            reopened.get("queue").await.unwrap(),
            Some("[1,2,3]".to_string())
        );
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, "{{{").await.unwrap();

        let store = FileKeyValueStore::new(&path);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_deletes_only_that_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("store.json"));
        store.put("a", "1").await.unwrap();
        store.put("b", "2").await.unwrap();

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), Some("2".to_string()));
    }
}
