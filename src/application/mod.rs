//! Application layer: lifecycle state management, caching, and the
//! document store's public API.

pub mod document_cache;
pub mod document_store;
pub mod migration;
pub mod state_manager;

pub use document_cache::{CacheStats, DocumentCache};
pub use document_store::{
    ApprovalReport, DocumentListing, DocumentStore, DocumentStoreError, RawDocument,
    StuckDocument, SystemHealth, SystemStatus, VersionContent, VersionInfo,
};
pub use migration::{MigrationReport, PointerIssue, PointerMigration, PointerRepair};
pub use state_manager::{StateError, StateManager, StuckObject};
