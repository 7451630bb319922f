//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// Truncated to microseconds, the precision persisted in object tags,
    /// so an in-memory instant always equals its stored form.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(6))
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Creates a timestamp from Unix seconds.
    pub fn from_unix_secs(secs: u64) -> Self {
        use chrono::TimeZone;
        Self(Utc.timestamp_opt(secs as i64, 0).unwrap())
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> u64 {
        self.0.timestamp().max(0) as u64
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0 + Duration::seconds(secs as i64))
    }

    /// Creates a new timestamp by subtracting the specified number of minutes.
    pub fn minus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 - Duration::minutes(minutes))
    }

    /// Signed number of whole minutes elapsed from `other` to this timestamp.
    pub fn minutes_since(&self, other: &Timestamp) -> i64 {
        self.0.signed_duration_since(other.0).num_minutes()
    }

    /// Renders the timestamp as an RFC 3339 string with a trailing `Z`,
    /// the form persisted in object tags.
    pub fn to_tag_value(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parses a tag value previously produced by [`Timestamp::to_tag_value`].
    ///
    /// Accepts any RFC 3339 timestamp; returns `None` when the value is not
    /// parsable rather than failing the read path.
    pub fn parse_tag_value(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_tag_value())
    }
}
