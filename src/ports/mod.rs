//! Ports - trait interfaces the application layer depends on.
//!
//! Adapters implement these traits; the application code never names a
//! concrete backend.

pub mod cache_backend;
pub mod object_store;

pub use cache_backend::{BackendStats, CacheBackend, CacheError};
pub use object_store::{ObjectStore, ObjectStoreError, PutResult};
