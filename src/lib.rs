//! Paperflow - Document lifecycle and version store.
//!
//! Tracks documents and their derived output versions through an
//! ingestion -> processing -> review -> approval workflow, using metadata
//! tags on objects in a durable object store as the single source of truth
//! for state.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
