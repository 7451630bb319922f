//! Object Store Port - keyed blob storage with lifecycle tags.
//!
//! The application layer talks to object storage exclusively through this
//! trait. Adapters provide the implementation (filesystem, in-memory), and
//! the retrying decorator wraps any of them.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::document::TagMap;

/// Port for keyed blob storage with per-object tags.
///
/// # Contract
///
/// Implementations must:
/// - Treat keys as opaque `/`-separated paths
/// - Store tags atomically with respect to `swap_tags`
/// - Distinguish missing objects (`ObjectNotFound`) from a missing
///   container (`ContainerNotFound`)
/// - Classify failures as transient or permanent via
///   [`ObjectStoreError::is_transient`], which drives retry policy
///
/// # Conditional writes
///
/// `swap_tags` is the concurrency primitive: it replaces an object's tag
/// set only if the current tags equal the expected set, and fails with
/// `PreconditionFailed` otherwise. State transitions are built on it so a
/// racing writer loses cleanly instead of silently clobbering.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads an object's content.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if no object exists at `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Writes an object, replacing any existing content, content type, and
    /// tags. `tags: None` writes an empty tag set.
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
        tags: Option<&TagMap>,
    ) -> Result<PutResult, ObjectStoreError>;

    /// Checks whether an object exists.
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;

    /// Deletes an object.
    ///
    /// Deleting a missing object is not an error; delete is idempotent.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// Lists up to `limit` keys starting with `prefix`, in key order.
    async fn list_by_prefix(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, ObjectStoreError>;

    /// Reads an object's tags.
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if no object exists at `key`.
    async fn get_tags(&self, key: &str) -> Result<TagMap, ObjectStoreError>;

    /// Replaces an object's tags unconditionally.
    async fn set_tags(&self, key: &str, tags: &TagMap) -> Result<(), ObjectStoreError>;

    /// Replaces an object's tags only if they currently equal `expected`.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` when the stored tags differ from
    /// `expected`, meaning another writer got there first.
    async fn swap_tags(
        &self,
        key: &str,
        expected: &TagMap,
        next: &TagMap,
    ) -> Result<(), ObjectStoreError>;
}

/// Result of a successful `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    /// Number of content bytes written.
    pub size: u64,

    /// Hex-encoded SHA-256 of the content.
    pub etag: String,
}

/// Errors produced by object store operations.
#[derive(Debug, Clone, Error)]
pub enum ObjectStoreError {
    /// No object exists at the key.
    #[error("object not found: {key}")]
    ObjectNotFound { key: String },

    /// The backing container (bucket, root directory) does not exist.
    #[error("container not found: {container}")]
    ContainerNotFound { container: String },

    /// The store refused access to the key.
    #[error("permission denied: {key}")]
    PermissionDenied { key: String },

    /// A conditional write lost to a concurrent writer.
    #[error("precondition failed for {key}: tags changed concurrently")]
    PreconditionFailed { key: String },

    /// A transient failure persisted through every retry attempt.
    #[error("{operation} failed after {attempts} attempts: {message}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        message: String,
    },

    /// Any other backend failure, classified for retry purposes.
    #[error("{operation} failed: {message}")]
    OperationFailed {
        operation: String,
        message: String,
        transient: bool,
    },
}

impl ObjectStoreError {
    /// Creates an object not found error.
    pub fn object_not_found(key: impl Into<String>) -> Self {
        Self::ObjectNotFound { key: key.into() }
    }

    /// Creates a container not found error.
    pub fn container_not_found(container: impl Into<String>) -> Self {
        Self::ContainerNotFound {
            container: container.into(),
        }
    }

    /// Creates a permission denied error.
    pub fn permission_denied(key: impl Into<String>) -> Self {
        Self::PermissionDenied { key: key.into() }
    }

    /// Creates a precondition failed error.
    pub fn precondition_failed(key: impl Into<String>) -> Self {
        Self::PreconditionFailed { key: key.into() }
    }

    /// Creates a retry exhausted error.
    pub fn retry_exhausted(
        operation: impl Into<String>,
        attempts: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::RetryExhausted {
            operation: operation.into(),
            attempts,
            message: message.into(),
        }
    }

    /// Creates a transient operation failure (eligible for retry).
    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.into(),
            transient: true,
        }
    }

    /// Creates a permanent operation failure (not retried).
    pub fn permanent(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// Whether retrying this error could plausibly succeed.
    ///
    /// Missing objects, missing containers, denied permissions, and lost
    /// conditional writes are facts about the world, not glitches.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ObjectNotFound { .. }
            | Self::ContainerNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::PreconditionFailed { .. }
            | Self::RetryExhausted { .. } => false,
            Self::OperationFailed { transient, .. } => *transient,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════════
