//! Retrying Object Store Adapter - wraps any ObjectStore with backoff.
//!
//! Retries only errors the port classifies as transient. Permanent errors
//! (missing objects, denied permissions, lost conditional writes) pass
//! through on the first attempt.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::domain::document::TagMap;
use crate::ports::{ObjectStore, ObjectStoreError, PutResult};

/// Exponential backoff policy for transient store failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Ceiling applied to every computed delay.
    pub max_delay: Duration,
    /// Multiplier applied per additional attempt.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let delay = self.base_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Decorator adding retry-with-backoff to an inner [`ObjectStore`].
pub struct RetryingObjectStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ObjectStore> RetryingObjectStore<S> {
    /// Wraps `inner` with the given policy.
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Wraps `inner` with the default policy.
    pub fn with_defaults(inner: S) -> Self {
        Self::new(inner, RetryPolicy::default())
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn run<T, F, Fut>(
        &self,
        operation: &str,
        mut attempt_fn: F,
    ) -> Result<T, ObjectStoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ObjectStoreError>>,
    {
        let started = Instant::now();
        let attempts = self.policy.max_attempts.max(1);
        let mut last_message = String::new();
        for attempt in 1..=attempts {
            match attempt_fn().await {
                Ok(value) => {
                    debug!(
                        operation,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "object store call"
                    );
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < attempts => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient object store failure, retrying"
                    );
                    last_message = err.to_string();
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_transient() => {
                    last_message = err.to_string();
                }
                Err(err) => return Err(err),
            }
        }
        Err(ObjectStoreError::retry_exhausted(
            operation,
            attempts,
            last_message,
        ))
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for RetryingObjectStore<S> {
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.run("get", || self.inner.get(key)).await
    }

    async fn put(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
        tags: Option<&TagMap>,
    ) -> Result<PutResult, ObjectStoreError> {
        self.run("put", || self.inner.put(key, content, content_type, tags))
            .await
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        self.run("exists", || self.inner.exists(key)).await
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.run("delete", || self.inner.delete(key)).await
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, ObjectStoreError> {
        self.run("list", || self.inner.list_by_prefix(prefix, limit))
            .await
    }

    async fn get_tags(&self, key: &str) -> Result<TagMap, ObjectStoreError> {
        self.run("get_tags", || self.inner.get_tags(key)).await
    }

    async fn set_tags(&self, key: &str, tags: &TagMap) -> Result<(), ObjectStoreError> {
        self.run("set_tags", || self.inner.set_tags(key, tags)).await
    }

    async fn swap_tags(
        &self,
        key: &str,
        expected: &TagMap,
        next: &TagMap,
    ) -> Result<(), ObjectStoreError> {
        self.run("swap_tags", || self.inner.swap_tags(key, expected, next))
            .await
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════════
