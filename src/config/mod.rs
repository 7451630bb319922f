//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `PAPERFLOW_` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use paperflow::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Storage root: {}", config.storage.root);
//! ```

mod cache;
mod error;
mod storage;

pub use cache::{CacheBackendKind, CacheConfig};
pub use error::{ConfigError, ValidationError};
pub use storage::{RetryConfig, StorageConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Object storage configuration (root, retries, stuck threshold)
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cache configuration (backend, TTLs)
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PAPERFLOW` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PAPERFLOW__STORAGE__ROOT=/var/paperflow` -> `storage.root`
    /// - `PAPERFLOW__CACHE__BACKEND=redis` -> `cache.backend`
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAPERFLOW")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.storage.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("PAPERFLOW__STORAGE__ROOT");
        env::remove_var("PAPERFLOW__STORAGE__PROCESSING_TIMEOUT_MINUTES");
        env::remove_var("PAPERFLOW__STORAGE__RETRY__MAX_ATTEMPTS");
        env::remove_var("PAPERFLOW__CACHE__BACKEND");
        env::remove_var("PAPERFLOW__CACHE__TTL_SECONDS");
        env::remove_var("PAPERFLOW__CACHE__REDIS_URL");
    }

    #[test]
    fn test_load_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.storage.root, "./data");
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("PAPERFLOW__STORAGE__ROOT", "/var/paperflow");
        env::set_var("PAPERFLOW__CACHE__BACKEND", "redis");
        env::set_var("PAPERFLOW__CACHE__TTL_SECONDS", "120");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.storage.root, "/var/paperflow");
        assert_eq!(config.cache.backend, CacheBackendKind::Redis);
        assert_eq!(config.cache.ttl_seconds, 120);
    }

    #[test]
    fn test_nested_retry_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("PAPERFLOW__STORAGE__RETRY__MAX_ATTEMPTS", "5");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.storage.retry.max_attempts, 5);
    }
}
