//! Version number value object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Positive, monotonically increasing version number for a document's
/// output artifacts. Rendered as `v{n}` in keys and tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionNumber(u32);

impl VersionNumber {
    /// The first version assigned to any document.
    pub const FIRST: VersionNumber = VersionNumber(1);

    /// Creates a version number; zero is not a valid version.
    pub fn new(n: u32) -> Result<Self, InvalidVersion> {
        if n == 0 {
            return Err(InvalidVersion::Zero);
        }
        Ok(Self(n))
    }

    /// Returns the numeric value.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Returns the next version number.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for VersionNumber {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('v')
            .ok_or_else(|| InvalidVersion::Malformed { value: s.to_string() })?;
        let n: u32 = digits
            .parse()
            .map_err(|_| InvalidVersion::Malformed { value: s.to_string() })?;
        Self::new(n)
    }
}

/// Errors produced when parsing or constructing a version number.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidVersion {
    /// Version numbers start at 1.
    #[error("version number must be positive")]
    Zero,

    /// The string was not of the form `v{n}`.
    #[error("malformed version: {value} (expected v<number>)")]
    Malformed { value: String },
}
