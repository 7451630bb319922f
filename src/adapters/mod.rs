//! Adapters - concrete implementations of the ports.

pub mod cache;
pub mod object_store;
