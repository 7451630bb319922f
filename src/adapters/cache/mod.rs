//! Cache adapters: in-memory, redis, and the backend factory.

mod in_memory;
mod redis;

pub use in_memory::InMemoryCache;
pub use redis::RedisCache;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{CacheBackendKind, CacheConfig};
use crate::ports::CacheBackend;

/// Builds the configured cache backend.
///
/// An unreachable redis falls back to the in-memory backend with a warning
/// rather than failing startup; the cache is an optimization, not a
/// dependency.
pub async fn create_cache(config: &CacheConfig) -> Arc<dyn CacheBackend> {
    match config.backend {
        CacheBackendKind::Memory => Arc::new(InMemoryCache::new()),
        CacheBackendKind::Redis => match RedisCache::connect(&config.redis_url).await {
            Ok(cache) => {
                info!(url = %config.redis_url, "connected to redis cache");
                Arc::new(cache)
            }
            Err(err) => {
                warn!(
                    url = %config.redis_url,
                    error = %err,
                    "redis cache unavailable, falling back to in-memory cache"
                );
                Arc::new(InMemoryCache::new())
            }
        },
    }
}
