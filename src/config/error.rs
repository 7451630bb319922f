//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Retry attempts must be at least 1")]
    InvalidRetryAttempts,

    #[error("Retry delays must be positive and base must not exceed max")]
    InvalidRetryDelays,

    #[error("Backoff factor must be at least 1.0")]
    InvalidBackoffFactor,

    #[error("Processing timeout must be at least 1 minute")]
    InvalidProcessingTimeout,

    #[error("Cache TTL must be positive")]
    InvalidCacheTtl,
}
