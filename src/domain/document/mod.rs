//! Document domain: identifiers, versions, lifecycle stages, and the
//! object-store key layout.

mod doc_id;
pub mod keys;
mod stage;
mod stage_tag;
mod version;

pub use doc_id::{DocId, InvalidDocId};
pub use stage::{Stage, TransitionRule, UnknownStage};
pub use stage_tag::{
    StageTag, TagMap, META_PREFIX, PREVIOUS_STAGE_TAG, STAGE_TAG, STATE_CHANGED_AT_TAG,
};
pub use version::{InvalidVersion, VersionNumber};
