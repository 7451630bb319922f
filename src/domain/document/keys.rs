//! Object-store key layout.
//!
//! ```text
//! raw/{doc_id}/original.pdf                       source document
//! processed/{doc_id}/v{n}/primary.md              primary output artifact
//! processed/{doc_id}/v{n}/structured.json         structured output artifact
//! processed/{doc_id}/current_version.txt          current-version pointer
//! ```

use crate::domain::document::{DocId, VersionNumber};

/// Prefix under which source documents live.
pub const RAW_PREFIX: &str = "raw/";

/// Prefix under which output versions and pointers live.
pub const PROCESSED_PREFIX: &str = "processed/";

const ORIGINAL_FILE: &str = "original.pdf";
const POINTER_FILE: &str = "current_version.txt";

/// File name of a version's primary artifact.
pub const PRIMARY_FILE: &str = "primary.md";

/// File name of a version's structured artifact.
pub const STRUCTURED_FILE: &str = "structured.json";

/// Key of the source document.
pub fn raw_document(doc_id: &DocId) -> String {
    format!("{RAW_PREFIX}{doc_id}/{ORIGINAL_FILE}")
}

/// Prefix covering every artifact of one output version.
pub fn version_prefix(doc_id: &DocId, version: VersionNumber) -> String {
    format!("{PROCESSED_PREFIX}{doc_id}/{version}/")
}

/// Key of a version's primary (human-readable) artifact.
pub fn primary_artifact(doc_id: &DocId, version: VersionNumber) -> String {
    format!("{PROCESSED_PREFIX}{doc_id}/{version}/{PRIMARY_FILE}")
}

/// Key of a version's structured (machine-readable) artifact.
pub fn structured_artifact(doc_id: &DocId, version: VersionNumber) -> String {
    format!("{PROCESSED_PREFIX}{doc_id}/{version}/{STRUCTURED_FILE}")
}

/// Key of the pointer naming the document's current approved version.
pub fn current_version_pointer(doc_id: &DocId) -> String {
    format!("{PROCESSED_PREFIX}{doc_id}/{POINTER_FILE}")
}

/// Prefix covering everything stored for one document under `processed/`.
pub fn processed_prefix(doc_id: &DocId) -> String {
    format!("{PROCESSED_PREFIX}{doc_id}/")
}

/// Extracts the document id from any key in the layout.
pub fn doc_id_from_key(key: &str) -> Option<DocId> {
    let rest = key
        .strip_prefix(RAW_PREFIX)
        .or_else(|| key.strip_prefix(PROCESSED_PREFIX))?;
    let (id, _) = rest.split_once('/')?;
    id.parse().ok()
}

/// Extracts the version number from a `processed/` artifact key.
///
/// Pointer keys and raw keys carry no version and yield `None`.
pub fn version_from_key(key: &str) -> Option<VersionNumber> {
    let rest = key.strip_prefix(PROCESSED_PREFIX)?;
    let (_, after_id) = rest.split_once('/')?;
    let (segment, _) = after_id.split_once('/')?;
    segment.parse().ok()
}

/// Extracts the artifact file name from a versioned `processed/` key.
pub fn artifact_from_key(key: &str) -> Option<&str> {
    let rest = key.strip_prefix(PROCESSED_PREFIX)?;
    let (_, after_id) = rest.split_once('/')?;
    let (segment, file) = after_id.split_once('/')?;
    if segment.parse::<VersionNumber>().is_err() || file.is_empty() || file.contains('/') {
        return None;
    }
    Some(file)
}

/// Strips characters that are unsafe in key segments.
///
/// Keeps ASCII alphanumerics, `-`, `_`, and `.`; everything else becomes `_`.
pub fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
