//! In-Memory Cache Adapter - Implementation of CacheBackend.
//!
//! Single-process cache for development, tests, and the redis fallback
//! path. Expiry is lazy: expired entries are dropped when read, plus a
//! periodic sweep keeps the map from accumulating dead entries under
//! write-heavy loads.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::ports::{BackendStats, CacheBackend, CacheError};

/// One `set` in every this many triggers a full expiry sweep.
const SWEEP_INTERVAL: u64 = 100;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory cache backend.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    set_count: AtomicU64,
}

impl InMemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    async fn sweep(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .await
            .retain(|_, entry| !entry.is_expired(now));
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: drop it so the map does not hold dead weight.
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        let count = self.set_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % SWEEP_INTERVAL == 0 {
            self.sweep().await;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|entry| !entry.is_expired(now)))
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<BackendStats, CacheError> {
        let now = Instant::now();
        let entries = self
            .entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count() as u64;
        Ok(BackendStats {
            entries,
            connected: true,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
