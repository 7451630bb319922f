//! Object storage configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::object_store::RetryPolicy;

/// Object storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the object store
    #[serde(default = "default_root")]
    pub root: String,

    /// Retry policy for transient store failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Minutes a document may sit in processing before counting as stuck
    #[serde(default = "default_processing_timeout")]
    pub processing_timeout_minutes: u64,
}

/// Retry policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, in seconds
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: f64,

    /// Ceiling on any computed delay, in seconds
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: f64,

    /// Multiplier applied per additional attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl StorageConfig {
    /// Validate storage configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.root.is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE__ROOT"));
        }
        if self.processing_timeout_minutes == 0 {
            return Err(ValidationError::InvalidProcessingTimeout);
        }
        self.retry.validate()
    }
}

impl RetryConfig {
    /// Validate retry configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidRetryAttempts);
        }
        if self.base_delay_secs <= 0.0 || self.base_delay_secs > self.max_delay_secs {
            return Err(ValidationError::InvalidRetryDelays);
        }
        if self.backoff_factor < 1.0 {
            return Err(ValidationError::InvalidBackoffFactor);
        }
        Ok(())
    }

    /// Build the adapter-level retry policy
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs_f64(self.base_delay_secs),
            max_delay: Duration::from_secs_f64(self.max_delay_secs),
            backoff_factor: self.backoff_factor,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            retry: RetryConfig::default(),
            processing_timeout_minutes: default_processing_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay(),
            max_delay_secs: default_max_delay(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

fn default_root() -> String {
    "./data".to_string()
}

fn default_processing_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> f64 {
    1.0
}

fn default_max_delay() -> f64 {
    60.0
}

fn default_backoff_factor() -> f64 {
    2.0
}
