//! Cache configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Which cache backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Single-process in-memory cache
    Memory,
    /// Shared redis cache
    Redis,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Backend selection
    #[serde(default = "default_backend")]
    pub backend: CacheBackendKind,

    /// Default TTL for cached entries, in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,

    /// TTL for cached health reports, in seconds
    #[serde(default = "default_health_ttl")]
    pub health_ttl_seconds: u64,

    /// Redis connection URL, used when backend is `redis`
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl CacheConfig {
    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ttl_seconds == 0 || self.health_ttl_seconds == 0 {
            return Err(ValidationError::InvalidCacheTtl);
        }
        if self.backend == CacheBackendKind::Redis
            && !self.redis_url.starts_with("redis://")
            && !self.redis_url.starts_with("rediss://")
        {
            return Err(ValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            ttl_seconds: default_ttl(),
            health_ttl_seconds: default_health_ttl(),
            redis_url: default_redis_url(),
        }
    }
}

fn default_backend() -> CacheBackendKind {
    CacheBackendKind::Memory
}

fn default_ttl() -> u64 {
    3600
}

fn default_health_ttl() -> u64 {
    300
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
