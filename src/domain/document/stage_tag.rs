//! Structured view of the lifecycle tags carried by a stored object.

use crate::domain::document::Stage;
use crate::domain::foundation::Timestamp;
use std::collections::BTreeMap;

/// Raw key/value tags as stored alongside an object. Ordered so tag sets
/// compare deterministically in conditional writes.
pub type TagMap = BTreeMap<String, String>;

/// Tag key holding the current lifecycle stage.
pub const STAGE_TAG: &str = "stage";

/// Tag key holding the RFC 3339 instant of the last stage change.
pub const STATE_CHANGED_AT_TAG: &str = "state_changed_at";

/// Tag key holding the stage the object moved out of.
pub const PREVIOUS_STAGE_TAG: &str = "previous_stage";

/// Prefix namespacing caller-supplied metadata tags away from lifecycle ones.
pub const META_PREFIX: &str = "meta_";

/// Decoded lifecycle record of one stored object.
///
/// Converts to and from the flat [`TagMap`] persisted by the object store.
/// Unparsable auxiliary fields are dropped rather than failing the read
/// path; only a missing or unknown `stage` value makes the record absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTag {
    pub stage: Stage,
    pub state_changed_at: Option<Timestamp>,
    pub previous_stage: Option<Stage>,
    /// Caller-supplied metadata, stored with keys stripped of [`META_PREFIX`].
    pub metadata: BTreeMap<String, String>,
    /// Non-lifecycle bookkeeping tags (`doc_id`, `version`, `created_at` on
    /// version artifacts), carried verbatim across transitions.
    pub extra: TagMap,
}

impl StageTag {
    /// Creates a fresh record for `stage`, stamped now, with no history.
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            state_changed_at: Some(Timestamp::now()),
            previous_stage: None,
            metadata: BTreeMap::new(),
            extra: TagMap::new(),
        }
    }

    /// Adds a metadata entry, consuming and returning self for chaining.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Adds a verbatim bookkeeping tag, consuming and returning self.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Derives the record that results from moving this object to `next`,
    /// preserving metadata and bookkeeping tags and recording where it
    /// came from.
    pub fn advanced_to(&self, next: Stage) -> Self {
        Self {
            stage: next,
            state_changed_at: Some(Timestamp::now()),
            previous_stage: Some(self.stage),
            metadata: self.metadata.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Decodes a tag map read from the store.
    ///
    /// Returns `None` when no recognizable `stage` tag is present, which is
    /// how untagged or foreign objects surface.
    pub fn from_tags(tags: &TagMap) -> Option<Self> {
        let stage: Stage = tags.get(STAGE_TAG)?.parse().ok()?;
        let state_changed_at = tags
            .get(STATE_CHANGED_AT_TAG)
            .and_then(|v| Timestamp::parse_tag_value(v));
        let previous_stage = tags
            .get(PREVIOUS_STAGE_TAG)
            .and_then(|v| v.parse::<Stage>().ok());
        let mut metadata = BTreeMap::new();
        let mut extra = TagMap::new();
        for (key, value) in tags {
            if matches!(
                key.as_str(),
                STAGE_TAG | STATE_CHANGED_AT_TAG | PREVIOUS_STAGE_TAG
            ) {
                continue;
            }
            match key.strip_prefix(META_PREFIX) {
                Some(stripped) => {
                    metadata.insert(stripped.to_string(), value.clone());
                }
                None => {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }
        Some(Self {
            stage,
            state_changed_at,
            previous_stage,
            metadata,
            extra,
        })
    }

    /// Encodes the record into the flat tag map persisted on the object.
    pub fn into_tags(self) -> TagMap {
        let mut tags = self.extra;
        tags.insert(STAGE_TAG.to_string(), self.stage.as_str().to_string());
        if let Some(ts) = self.state_changed_at {
            tags.insert(STATE_CHANGED_AT_TAG.to_string(), ts.to_tag_value());
        }
        if let Some(prev) = self.previous_stage {
            tags.insert(
                PREVIOUS_STAGE_TAG.to_string(),
                prev.as_str().to_string(),
            );
        }
        for (key, value) in self.metadata {
            tags.insert(format!("{META_PREFIX}{key}"), value);
        }
        tags
    }
}
