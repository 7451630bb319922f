//! Cache Backend Port - keyed cache with per-entry TTL.
//!
//! The cache is an optimization layer over the object store. Nothing
//! correctness-critical may live only in the cache: every cached value
//! must be rebuildable from store reads.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Port for a keyed string cache with optional per-entry expiry.
///
/// # Contract
///
/// Implementations must:
/// - Treat an expired entry exactly like a missing one
/// - Never return stale data past its TTL
/// - Treat `ttl: None` as "no expiry"
/// - Keep operations independent: a failure on one key must not poison
///   others
///
/// Callers are expected to swallow cache errors and fall back to the
/// source of truth; a broken cache degrades latency, not correctness.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Reads a value, or `None` if missing or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Writes a value, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Removes a value. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Checks whether a live (non-expired) value exists.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Removes every entry.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Reports backend-level statistics.
    async fn stats(&self) -> Result<BackendStats, CacheError>;

    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;
}

/// Backend-level cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Live entries currently held.
    pub entries: u64,

    /// Whether the backend is reachable.
    pub connected: bool,
}

/// Errors produced by cache backends.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("cache connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The backend rejected the operation.
    #[error("cache backend error: {message}")]
    Backend { message: String },
}

impl CacheError {
    /// Creates a connection failure error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
