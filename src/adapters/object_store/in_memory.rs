//! In-Memory Object Store Adapter - Implementation of ObjectStore.
//!
//! Backed by a BTreeMap behind an async RwLock. Used by tests and by the
//! retry decorator's test harness: callers can count operations and inject
//! failures, either per operation name or for puts matching a key
//! substring.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::domain::document::TagMap;
use crate::ports::{ObjectStore, ObjectStoreError, PutResult};

#[derive(Debug, Clone)]
struct Entry {
    content: Vec<u8>,
    content_type: String,
    tags: TagMap,
}

/// In-memory object store for tests and local development.
#[derive(Default)]
pub struct InMemoryObjectStore {
    entries: RwLock<BTreeMap<String, Entry>>,
    op_count: AtomicU64,
    /// Remaining transient failures to inject, keyed by operation name.
    failures: RwLock<HashMap<String, u32>>,
    /// One-shot permanent failure for puts whose key contains the substring.
    put_poison: RwLock<Option<String>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total operations served, including injected failures.
    pub fn op_count(&self) -> u64 {
        self.op_count.load(Ordering::Relaxed)
    }

    /// Arranges for the next `count` calls to `operation` to fail with a
    /// transient error before succeeding.
    pub async fn fail_next(&self, operation: &str, count: u32) {
        self.failures
            .write()
            .await
            .insert(operation.to_string(), count);
    }

    /// Arranges for the next `put` whose key contains `substr` to fail
    /// permanently. One-shot.
    pub async fn fail_put_matching(&self, substr: &str) {
        *self.put_poison.write().await = Some(substr.to_string());
    }

    /// Number of objects currently stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn record(&self, operation: &str) -> Result<(), ObjectStoreError> {
        self.op_count.fetch_add(1, Ordering::Relaxed);
        let mut failures = self.failures.write().await;
        if let Some(remaining) = failures.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ObjectStoreError::transient(operation, "injected failure"));
            }
        }
        Ok(())
    }

    fn compute_etag(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.record("get").await?;
        self.entries
            .read()
            .await
            .get(key)
            .map(|e| e.content.clone())
            .ok_or_else(|| ObjectStoreError::object_not_found(key))
    }

    async fn put(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
        tags: Option<&TagMap>,
    ) -> Result<PutResult, ObjectStoreError> {
        self.record("put").await?;
        {
            let mut poison = self.put_poison.write().await;
            if let Some(substr) = poison.as_deref() {
                if key.contains(substr) {
                    *poison = None;
                    return Err(ObjectStoreError::permanent("put", "injected failure"));
                }
            }
        }
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                content: content.to_vec(),
                content_type: content_type.to_string(),
                tags: tags.cloned().unwrap_or_default(),
            },
        );
        Ok(PutResult {
            size: content.len() as u64,
            etag: Self::compute_etag(content),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        self.record("exists").await?;
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.record("delete").await?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, ObjectStoreError> {
        self.record("list").await?;
        Ok(self
            .entries
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn get_tags(&self, key: &str) -> Result<TagMap, ObjectStoreError> {
        self.record("get_tags").await?;
        self.entries
            .read()
            .await
            .get(key)
            .map(|e| e.tags.clone())
            .ok_or_else(|| ObjectStoreError::object_not_found(key))
    }

    async fn set_tags(&self, key: &str, tags: &TagMap) -> Result<(), ObjectStoreError> {
        self.record("set_tags").await?;
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| ObjectStoreError::object_not_found(key))?;
        entry.tags = tags.clone();
        Ok(())
    }

    async fn swap_tags(
        &self,
        key: &str,
        expected: &TagMap,
        next: &TagMap,
    ) -> Result<(), ObjectStoreError> {
        self.record("swap_tags").await?;
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| ObjectStoreError::object_not_found(key))?;
        if &entry.tags != expected {
            return Err(ObjectStoreError::precondition_failed(key));
        }
        entry.tags = next.clone();
        Ok(())
    }
}
