//! Redis Cache Adapter - Implementation of CacheBackend.
//!
//! Multi-process cache for deployments where several workers share state.
//! TTLs map onto redis key expiry (SETEX), so expiry needs no bookkeeping
//! on our side.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::ports::{BackendStats, CacheBackend, CacheError};

/// Redis-backed cache.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Connects to redis and verifies the connection with a PING.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::connection_failed(e.to_string()))?;
        let mut conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| CacheError::connection_failed(e.to_string()))?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| CacheError::connection_failed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Wraps an already-established connection.
    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e: redis::RedisError| CacheError::backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => redis::cmd("SETEX")
                .arg(key)
                .arg(ttl.as_secs().max(1))
                .arg(value)
                .query_async::<_, ()>(&mut conn)
                .await
                .map_err(|e| CacheError::backend(e.to_string())),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(|e: redis::RedisError| CacheError::backend(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .del(key)
            .await
            .map_err(|e: redis::RedisError| CacheError::backend(e.to_string()))?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        conn.exists(key)
            .await
            .map_err(|e: redis::RedisError| CacheError::backend(e.to_string()))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("FLUSHDB")
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| CacheError::backend(e.to_string()))
    }

    async fn stats(&self) -> Result<BackendStats, CacheError> {
        let mut conn = self.conn.clone();
        let entries: u64 = redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| CacheError::backend(e.to_string()))?;
        let connected = redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .is_ok();
        Ok(BackendStats { entries, connected })
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
