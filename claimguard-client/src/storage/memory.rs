//! In-memory object storage backend
//!
//! Keeps objects in a map and records every put/delete in call order.
//! Failures can be injected per key so batch semantics can be exercised
//! without a real store.

use super::{ObjectStore, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// A recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Put {
        key: String,
        content_type: String,
        size: usize,
    },
    Delete {
        key: String,
    },
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<HashMap<String, StoredObject>>,
    calls: Mutex<Vec<StoreCall>>,
    failing_put_patterns: Mutex<Vec<String>>,
    failing_delete_patterns: Mutex<Vec<String>>,
    put_delay: Duration,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing_put_patterns: Mutex::new(Vec::new()),
            failing_delete_patterns: Mutex::new(Vec::new()),
            put_delay: Duration::ZERO,
        }
    }

    /// Delay every put, to widen the window for concurrent failures/cancellation
    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = delay;
        self
    }

    /// Fail every put whose key contains `pattern`
    pub async fn fail_puts_matching(&self, pattern: impl Into<String>) {
        self.failing_put_patterns.lock().await.push(pattern.into());
    }

    /// Fail every delete whose key contains `pattern`
    pub async fn fail_deletes_matching(&self, pattern: impl Into<String>) {
        self.failing_delete_patterns.lock().await.push(pattern.into());
    }

    /// Stop injecting failures
    pub async fn clear_failures(&self) {
        self.failing_put_patterns.lock().await.clear();
        self.failing_delete_patterns.lock().await.clear();
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().await.clone()
    }

    /// Keys currently stored, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    pub async fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }

    pub async fn bytes_of(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(key).map(|o| o.bytes.clone())
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.calls.lock().await.push(StoreCall::Put {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });

        if !self.put_delay.is_zero() {
            tokio::time::sleep(self.put_delay).await;
        }

        let should_fail = self
            .failing_put_patterns
            .lock()
            .await
            .iter()
            .any(|p| key.contains(p.as_str()));
        if should_fail {
            return Err(StorageError::Rejected {
                status: 503,
                message: format!("injected put failure for {}", key),
            });
        }

        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.url_for(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.calls.lock().await.push(StoreCall::Delete {
            key: key.to_string(),
        });

        let should_fail = self
            .failing_delete_patterns
            .lock()
            .await
            .iter()
            .any(|p| key.contains(p.as_str()));
        if should_fail {
            return Err(StorageError::Network(format!(
                "injected delete failure for {}",
                key
            )));
        }

        self.objects.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_delete_records_calls() {
        let store = MemoryObjectStore::new("https://mem.test/");

        let url = store.put("image/1-a.jpg", vec![1, 2, 3], "image/jpeg").await.unwrap();
        assert_eq!(url, "https://mem.test/image/1-a.jpg");
        assert!(store.contains("image/1-a.jpg").await);
        assert_eq!(store.content_type_of("image/1-a.jpg").await.as_deref(), Some("image/jpeg"));

        store.delete("image/1-a.jpg").await.unwrap();
        assert!(!store.contains("image/1-a.jpg").await);

        assert_eq!(
            store.calls().await,
            vec![
                StoreCall::Put {
                    key: "image/1-a.jpg".to_string(),
                    content_type: "image/jpeg".to_string(),
                    size: 3,
                },
                StoreCall::Delete {
                    key: "image/1-a.jpg".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_idempotent() {
        let store = MemoryObjectStore::default();
        assert!(store.delete("video/none.mp4").await.is_ok());
        assert!(store.delete("video/none.mp4").await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_put_failure_stores_nothing() {
        let store = MemoryObjectStore::default();
        store.fail_puts_matching("bad").await;

        let result = store.put("image/1-bad.jpg", vec![0], "image/jpeg").await;

        assert!(matches!(result, Err(StorageError::Rejected { status: 503, .. })));
        assert!(store.keys().await.is_empty());

        store.clear_failures().await;
        assert!(store.put("image/1-bad.jpg", vec![0], "image/jpeg").await.is_ok());
    }
}
