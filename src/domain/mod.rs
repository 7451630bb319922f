//! Domain model: documents, versions, lifecycle stages, and key layout.

pub mod document;
pub mod foundation;
