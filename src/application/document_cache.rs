//! Document Cache - typed read-through caching over a cache backend.
//!
//! Every value cached here is rebuildable from the object store, so backend
//! failures are swallowed: a read error degrades to a miss, a write error
//! to a no-op, both logged at warn. Correctness never depends on the cache.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::application::document_store::{DocumentListing, SystemHealth, VersionContent};
use crate::domain::document::DocId;
use crate::ports::CacheBackend;

/// Cache key of the system health report.
const HEALTH_KEY: &str = "paperflow:health:system";

/// Every list category a document may appear in.
const LIST_CATEGORIES: [&str; 3] = ["raw", "draft", "final"];

/// Aggregated cache statistics for health output.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    /// Hits over total requests; 0.0 when nothing was requested yet.
    pub hit_rate: f64,
    pub uptime_secs: u64,
    pub backend: &'static str,
}

/// Typed cache over document content, listings, and the health report.
pub struct DocumentCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    health_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    started_at: Instant,
}

impl DocumentCache {
    /// Creates a cache with the given default and health-report TTLs.
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration, health_ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            health_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    fn content_key(doc_id: &DocId) -> String {
        format!("paperflow:content:{doc_id}")
    }

    fn list_key(category: &str) -> String {
        format!("paperflow:list:{category}")
    }

    /// Reads and decodes a cached value; any failure counts as a miss.
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %err, "cache read failed");
                None
            }
        };
        let value = raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "discarding undecodable cache entry");
                None
            }
        });
        match value {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Encodes and writes a value; failures are logged and dropped.
    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(key, error = %err, "cache encode failed");
                return;
            }
        };
        if let Err(err) = self.backend.set(key, &encoded, Some(ttl)).await {
            warn!(key, error = %err, "cache write failed");
        }
    }

    async fn delete_quietly(&self, key: &str) {
        if let Err(err) = self.backend.delete(key).await {
            warn!(key, error = %err, "cache delete failed");
        }
    }

    /// Cached content of a document's current version.
    pub async fn get_document_content(&self, doc_id: &DocId) -> Option<VersionContent> {
        self.get_json(&Self::content_key(doc_id)).await
    }

    pub async fn set_document_content(&self, doc_id: &DocId, content: &VersionContent) {
        self.set_json(&Self::content_key(doc_id), content, self.ttl)
            .await;
    }

    /// Cached listing for a category (`raw`, `draft`, `final`).
    pub async fn get_document_list(&self, category: &str) -> Option<Vec<DocumentListing>> {
        self.get_json(&Self::list_key(category)).await
    }

    pub async fn set_document_list(&self, category: &str, listings: &[DocumentListing]) {
        self.set_json(&Self::list_key(category), &listings, self.ttl)
            .await;
    }

    /// Cached system health report (short TTL).
    pub async fn get_system_health(&self) -> Option<SystemHealth> {
        self.get_json(HEALTH_KEY).await
    }

    pub async fn set_system_health(&self, health: &SystemHealth) {
        self.set_json(HEALTH_KEY, health, self.health_ttl).await;
    }

    /// Drops a document's cached content and every cached listing, since
    /// any list may contain it. Idempotent.
    pub async fn invalidate_document(&self, doc_id: &DocId) {
        self.delete_quietly(&Self::content_key(doc_id)).await;
        self.invalidate_lists().await;
    }

    /// Drops every cached listing.
    pub async fn invalidate_lists(&self) {
        for category in LIST_CATEGORIES {
            self.delete_quietly(&Self::list_key(category)).await;
        }
    }

    /// Clears the whole backend and resets hit/miss counters.
    pub async fn invalidate_all(&self) {
        if let Err(err) = self.backend.clear().await {
            warn!(error = %err, "cache clear failed");
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Hit/miss statistics since construction (or the last full clear).
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            total_requests: total,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            uptime_secs: self.started_at.elapsed().as_secs(),
            backend: self.backend.name(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════════
