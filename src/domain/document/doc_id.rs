//! Strongly-typed document identifier.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Maximum accepted identifier length.
const MAX_LEN: usize = 64;

/// Length of generated identifiers (reference systems use 16 characters).
const GENERATED_LEN: usize = 16;

/// Opaque document identifier.
///
/// Treated as an opaque key, but constrained to ASCII alphanumeric
/// characters so it can be embedded in object-store keys without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Creates a document id, validating the format.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidDocId> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidDocId::Empty);
        }
        if id.len() > MAX_LEN {
            return Err(InvalidDocId::TooLong { len: id.len() });
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(InvalidDocId::InvalidCharacters { id });
        }
        Ok(Self(id))
    }

    /// Generates a random document id.
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..GENERATED_LEN].to_string())
    }

    /// Derives a deterministic document id from content.
    ///
    /// The same content always yields the same id, so re-ingesting an
    /// identical source file maps to the same document.
    pub fn from_content(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(digest[..GENERATED_LEN].to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocId {
    type Err = InvalidDocId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Errors produced when validating a document id.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidDocId {
    /// The id was empty.
    #[error("document id must not be empty")]
    Empty,

    /// The id exceeded the maximum length.
    #[error("document id too long: {len} characters (max {MAX_LEN})")]
    TooLong { len: usize },

    /// The id contained characters outside ASCII alphanumerics.
    #[error("document id contains invalid characters: {id}")]
    InvalidCharacters { id: String },
}
