//! Document Store - the crate's public API over documents and versions.
//!
//! Composes the object store, the state manager, and the document cache
//! into the operations callers actually use: intake bookkeeping, version
//! creation, the approval protocol, lookups, and health reporting. Every
//! piece of state lives in object tags; the cache only ever shortcuts
//! reads that could be answered by scanning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::document_cache::{CacheStats, DocumentCache};
use crate::application::state_manager::{StateError, StateManager};
use crate::domain::document::{keys, DocId, Stage, StageTag, TagMap, VersionNumber};
use crate::domain::foundation::Timestamp;
use crate::ports::{ObjectStore, ObjectStoreError};

/// Upper bound on keys examined by any single scan.
const SCAN_LIMIT: usize = 10_000;

/// Bookkeeping tag naming the owning document on version artifacts.
const DOC_ID_TAG: &str = "doc_id";

/// Bookkeeping tag naming the version on version artifacts.
const VERSION_TAG: &str = "version";

/// Bookkeeping tag recording when a version was created.
const CREATED_AT_TAG: &str = "created_at";

/// Failed-document share of intake above which the system is unhealthy.
const FAILED_RATIO_THRESHOLD: f64 = 0.1;

const PRIMARY_CONTENT_TYPE: &str = "text/markdown";
const STRUCTURED_CONTENT_TYPE: &str = "application/json";
const POINTER_CONTENT_TYPE: &str = "text/plain";

/// Errors produced by document store operations.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// The underlying object store failed.
    #[error(transparent)]
    Store(#[from] ObjectStoreError),

    /// A state transition failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// The requested version has no artifacts.
    #[error("version {version} of document {doc_id} not found")]
    VersionNotFound { doc_id: String, version: VersionNumber },

    /// The version's primary artifact already exists.
    #[error("version {version} of document {doc_id} already exists")]
    VersionAlreadyExists { doc_id: String, version: VersionNumber },

    /// A multi-object write stopped half way and could not be undone.
    /// The detail names what survives so an operator can repair by hand.
    #[error("partial write during {operation} for document {doc_id}: {detail}")]
    PartialWrite {
        operation: &'static str,
        doc_id: String,
        detail: String,
    },
}

/// Both artifacts of one output version, decoded as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionContent {
    /// Human-readable primary artifact (markdown).
    pub primary: String,
    /// Machine-readable structured artifact (JSON text).
    pub structured: String,
}

/// One document as it appears in a draft or final listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListing {
    pub doc_id: DocId,
    pub version: VersionNumber,
    pub stage: Stage,
    /// Creation time for drafts, last stage change for finals.
    pub updated_at: Option<Timestamp>,
    pub tags: TagMap,
}

/// A source document awaiting processing.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub doc_id: DocId,
    pub key: String,
    /// When the document entered its current stage, if recorded.
    pub uploaded_at: Option<Timestamp>,
    pub original_filename: Option<String>,
    pub tags: TagMap,
}

/// One output version of a document, with artifact presence flags.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version: VersionNumber,
    /// Stage of the primary artifact; `None` when it is missing or untagged.
    pub stage: Option<Stage>,
    pub created_at: Option<Timestamp>,
    pub has_primary: bool,
    pub has_structured: bool,
    pub tags: TagMap,
}

/// Outcome of an approval: the new final version and, if one existed,
/// the version that was archived to make room for it.
#[derive(Debug, Clone)]
pub struct ApprovalReport {
    pub doc_id: DocId,
    pub version: VersionNumber,
    pub archived: Option<VersionNumber>,
}

/// Overall system condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Aggregated health report over the whole store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Object counts per stage tag value, plus the `no_state` bucket.
    pub state_counts: BTreeMap<String, u64>,
    pub stuck_documents: u64,
    pub issues: Vec<String>,
    pub checked_at: Timestamp,
}

/// A document lingering in a stage beyond its allowed window.
#[derive(Debug, Clone)]
pub struct StuckDocument {
    /// `None` when the stuck key does not parse as a document key.
    pub doc_id: Option<DocId>,
    pub key: String,
    pub state_changed_at: Option<Timestamp>,
    pub tags: TagMap,
}

/// The document and version API.
pub struct DocumentStore {
    store: Arc<dyn ObjectStore>,
    states: StateManager,
    cache: DocumentCache,
    processing_timeout_minutes: i64,
}

impl DocumentStore {
    /// Creates a document store over the given backends.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        cache: DocumentCache,
        processing_timeout_minutes: i64,
    ) -> Self {
        Self {
            states: StateManager::new(store.clone()),
            store,
            cache,
            processing_timeout_minutes,
        }
    }

    /// Returns the underlying object store.
    pub fn object_store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Returns the state manager.
    pub fn states(&self) -> &StateManager {
        &self.states
    }

    /// Cache hit/miss statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ────────────────────────────────────────────────────────────────────
    // Intake
    // ────────────────────────────────────────────────────────────────────

    /// Lists source documents currently in the raw stage.
    pub async fn list_raw_documents(
        &self,
        limit: usize,
    ) -> Result<Vec<RawDocument>, DocumentStoreError> {
        let started = Instant::now();
        let matches = self
            .states
            .list_by_states(&[Stage::Raw], keys::RAW_PREFIX, SCAN_LIMIT)
            .await?;
        let mut docs = Vec::new();
        for (key, _, tags) in matches {
            let Some(doc_id) = keys::doc_id_from_key(&key) else {
                continue;
            };
            let record = StageTag::from_tags(&tags);
            docs.push(RawDocument {
                doc_id,
                key,
                uploaded_at: record.as_ref().and_then(|r| r.state_changed_at),
                original_filename: record
                    .as_ref()
                    .and_then(|r| r.metadata.get("original_filename").cloned()),
                tags,
            });
            if docs.len() == limit {
                break;
            }
        }
        debug!(
            found = docs.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "raw document scan"
        );
        Ok(docs)
    }

    /// Marks a source document as picked up for processing.
    pub async fn mark_processing(
        &self,
        doc_id: &DocId,
        info: Option<TagMap>,
    ) -> Result<StageTag, DocumentStoreError> {
        let mut metadata = info.unwrap_or_default();
        metadata.insert(
            "processing_started_at".to_string(),
            Timestamp::now().to_tag_value(),
        );
        let record = self
            .states
            .transition(&keys::raw_document(doc_id), Stage::Processing, Some(metadata), false)
            .await?;
        Ok(record)
    }

    /// Marks a source document as successfully processed.
    pub async fn mark_processed(
        &self,
        doc_id: &DocId,
        info: Option<TagMap>,
    ) -> Result<StageTag, DocumentStoreError> {
        let mut metadata = info.unwrap_or_default();
        metadata.insert(
            "processing_completed_at".to_string(),
            Timestamp::now().to_tag_value(),
        );
        let record = self
            .states
            .transition(&keys::raw_document(doc_id), Stage::Processed, Some(metadata), false)
            .await?;
        Ok(record)
    }

    /// Marks a source document as failed, recording why.
    ///
    /// Tag values are size-limited in real stores, so the message is
    /// truncated rather than rejected.
    pub async fn mark_failed(
        &self,
        doc_id: &DocId,
        error: &str,
        details: Option<TagMap>,
    ) -> Result<StageTag, DocumentStoreError> {
        let mut metadata = details.unwrap_or_default();
        metadata.insert("failed_at".to_string(), Timestamp::now().to_tag_value());
        let mut message = error.to_string();
        if message.len() > 256 {
            let mut cut = 256;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        metadata.insert("error_message".to_string(), message);
        let record = self
            .states
            .transition(&keys::raw_document(doc_id), Stage::Failed, Some(metadata), false)
            .await?;
        warn!(doc_id = %doc_id, error, "document marked failed");
        Ok(record)
    }

    /// Forces a document's source object back to raw for reprocessing.
    pub async fn reset_to_raw(
        &self,
        doc_id: &DocId,
        reason: Option<&str>,
    ) -> Result<StageTag, DocumentStoreError> {
        let record = self
            .states
            .reset(&keys::raw_document(doc_id), Stage::Raw, reason)
            .await?;
        self.cache.invalidate_document(doc_id).await;
        Ok(record)
    }

    /// Marks several documents as processing; per-document outcomes, never
    /// aborting on individual failures.
    pub async fn batch_mark_processing(
        &self,
        doc_ids: &[DocId],
        info: Option<TagMap>,
    ) -> BTreeMap<DocId, bool> {
        let mut outcomes = BTreeMap::new();
        for doc_id in doc_ids {
            let ok = match self.mark_processing(doc_id, info.clone()).await {
                Ok(_) => true,
                Err(err) => {
                    warn!(doc_id = %doc_id, error = %err, "batch mark_processing failed");
                    false
                }
            };
            outcomes.insert(doc_id.clone(), ok);
        }
        outcomes
    }

    // ────────────────────────────────────────────────────────────────────
    // Versions
    // ────────────────────────────────────────────────────────────────────

    /// Next free version number for a document: one past the highest
    /// version with any artifact, or `v1` when there are none.
    pub async fn next_version_number(
        &self,
        doc_id: &DocId,
    ) -> Result<VersionNumber, DocumentStoreError> {
        let existing = self
            .store
            .list_by_prefix(&keys::processed_prefix(doc_id), SCAN_LIMIT)
            .await?;
        Ok(existing
            .iter()
            .filter_map(|key| keys::version_from_key(key))
            .max()
            .map(|v| v.next())
            .unwrap_or(VersionNumber::FIRST))
    }

    /// Stores a new draft version: both artifacts, tagged identically.
    ///
    /// When `version` is absent the next free number is allocated. If the
    /// second artifact fails to write, the first is deleted again so no
    /// half version remains; only a failed rollback surfaces as
    /// `PartialWrite`.
    pub async fn create_version(
        &self,
        doc_id: &DocId,
        primary: &str,
        structured: &str,
        version: Option<VersionNumber>,
        metadata: Option<TagMap>,
    ) -> Result<VersionNumber, DocumentStoreError> {
        let started = Instant::now();
        let version = match version {
            Some(version) => version,
            None => self.next_version_number(doc_id).await?,
        };
        let primary_key = keys::primary_artifact(doc_id, version);
        if self.store.exists(&primary_key).await? {
            return Err(DocumentStoreError::VersionAlreadyExists {
                doc_id: doc_id.to_string(),
                version,
            });
        }

        let mut record = StageTag::new(Stage::Draft)
            .with_extra(DOC_ID_TAG, doc_id.to_string())
            .with_extra(VERSION_TAG, version.to_string())
            .with_extra(CREATED_AT_TAG, Timestamp::now().to_tag_value());
        if let Some(metadata) = metadata {
            record.metadata.extend(metadata);
        }
        let tags = record.into_tags();

        self.store
            .put(&primary_key, primary.as_bytes(), PRIMARY_CONTENT_TYPE, Some(&tags))
            .await?;

        let structured_key = keys::structured_artifact(doc_id, version);
        if let Err(err) = self
            .store
            .put(
                &structured_key,
                structured.as_bytes(),
                STRUCTURED_CONTENT_TYPE,
                Some(&tags),
            )
            .await
        {
            // Undo the first write so no half version remains.
            if let Err(cleanup) = self.store.delete(&primary_key).await {
                return Err(DocumentStoreError::PartialWrite {
                    operation: "create_version",
                    doc_id: doc_id.to_string(),
                    detail: format!(
                        "{primary_key} written but {structured_key} failed ({err}); \
                         rollback also failed: {cleanup}"
                    ),
                });
            }
            return Err(err.into());
        }

        self.cache.invalidate_lists().await;
        info!(
            doc_id = %doc_id,
            version = %version,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "version created"
        );
        Ok(version)
    }

    /// Lists a document's versions in ascending order, flagging which
    /// artifacts each one actually has.
    pub async fn list_versions(
        &self,
        doc_id: &DocId,
    ) -> Result<Vec<VersionInfo>, DocumentStoreError> {
        let started = Instant::now();
        let all_keys = self
            .store
            .list_by_prefix(&keys::processed_prefix(doc_id), SCAN_LIMIT)
            .await?;
        let mut presence: BTreeMap<VersionNumber, (bool, bool)> = BTreeMap::new();
        for key in &all_keys {
            let Some(version) = keys::version_from_key(key) else {
                continue; // pointer and foreign keys
            };
            let Some(artifact) = keys::artifact_from_key(key) else {
                continue;
            };
            let entry = presence.entry(version).or_insert((false, false));
            match artifact {
                keys::PRIMARY_FILE => entry.0 = true,
                keys::STRUCTURED_FILE => entry.1 = true,
                _ => {}
            }
        }

        let mut versions = Vec::with_capacity(presence.len());
        for (version, (has_primary, has_structured)) in presence {
            // Tags come from the primary artifact when it exists.
            let tag_key = if has_primary {
                keys::primary_artifact(doc_id, version)
            } else {
                keys::structured_artifact(doc_id, version)
            };
            let tags = match self.store.get_tags(&tag_key).await {
                Ok(tags) => tags,
                Err(ObjectStoreError::ObjectNotFound { .. }) => TagMap::new(),
                Err(err) => return Err(err.into()),
            };
            let record = StageTag::from_tags(&tags);
            versions.push(VersionInfo {
                version,
                stage: record.as_ref().map(|r| r.stage),
                created_at: record
                    .as_ref()
                    .and_then(|r| r.extra.get(CREATED_AT_TAG))
                    .and_then(|v| Timestamp::parse_tag_value(v)),
                has_primary,
                has_structured,
                tags,
            });
        }
        debug!(
            doc_id = %doc_id,
            found = versions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "version scan"
        );
        Ok(versions)
    }

    /// Collects one listing per document whose primary artifact is in
    /// `stage`, keeping the highest version and sorting newest first.
    async fn collect_listings(
        &self,
        stage: Stage,
    ) -> Result<Vec<DocumentListing>, DocumentStoreError> {
        let matches = self
            .states
            .list_by_states(&[stage], keys::PROCESSED_PREFIX, SCAN_LIMIT)
            .await?;
        let mut per_doc: BTreeMap<DocId, DocumentListing> = BTreeMap::new();
        for (key, stage, tags) in matches {
            if keys::artifact_from_key(&key) != Some(keys::PRIMARY_FILE) {
                continue;
            }
            let (Some(doc_id), Some(version)) =
                (keys::doc_id_from_key(&key), keys::version_from_key(&key))
            else {
                continue;
            };
            let record = StageTag::from_tags(&tags);
            let updated_at = match stage {
                Stage::Draft => record
                    .as_ref()
                    .and_then(|r| r.extra.get(CREATED_AT_TAG))
                    .and_then(|v| Timestamp::parse_tag_value(v)),
                _ => record.as_ref().and_then(|r| r.state_changed_at),
            };
            let listing = DocumentListing {
                doc_id: doc_id.clone(),
                version,
                stage,
                updated_at,
                tags,
            };
            match per_doc.get(&doc_id) {
                Some(existing) if existing.version >= version => {}
                _ => {
                    per_doc.insert(doc_id, listing);
                }
            }
        }
        let mut listings: Vec<_> = per_doc.into_values().collect();
        listings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(listings)
    }

    /// Lists documents with a draft awaiting review, newest first.
    pub async fn list_draft_documents(
        &self,
        limit: usize,
    ) -> Result<Vec<DocumentListing>, DocumentStoreError> {
        let mut listings = self.collect_listings(Stage::Draft).await?;
        listings.truncate(limit);
        Ok(listings)
    }

    /// Lists documents with an approved version, newest approval first.
    ///
    /// With `use_cache` the full listing is served from and written back
    /// to the cache; `limit` applies after the cache.
    pub async fn list_final_documents(
        &self,
        limit: usize,
        use_cache: bool,
    ) -> Result<Vec<DocumentListing>, DocumentStoreError> {
        if use_cache {
            if let Some(mut cached) = self.cache.get_document_list("final").await {
                cached.truncate(limit);
                return Ok(cached);
            }
        }
        let mut listings = self.collect_listings(Stage::Final).await?;
        if use_cache {
            self.cache.set_document_list("final", &listings).await;
        }
        listings.truncate(limit);
        Ok(listings)
    }

    /// Reads both artifacts of one version.
    ///
    /// Either artifact missing means the version is not readable and
    /// surfaces as `VersionNotFound`.
    pub async fn get_version_content(
        &self,
        doc_id: &DocId,
        version: VersionNumber,
    ) -> Result<VersionContent, DocumentStoreError> {
        let started = Instant::now();
        let not_found = || DocumentStoreError::VersionNotFound {
            doc_id: doc_id.to_string(),
            version,
        };
        let primary = match self.store.get(&keys::primary_artifact(doc_id, version)).await {
            Ok(bytes) => bytes,
            Err(ObjectStoreError::ObjectNotFound { .. }) => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };
        let structured = match self
            .store
            .get(&keys::structured_artifact(doc_id, version))
            .await
        {
            Ok(bytes) => bytes,
            Err(ObjectStoreError::ObjectNotFound { .. }) => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };
        debug!(
            doc_id = %doc_id,
            version = %version,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "version content read"
        );
        Ok(VersionContent {
            primary: String::from_utf8_lossy(&primary).into_owned(),
            structured: String::from_utf8_lossy(&structured).into_owned(),
        })
    }

    // ────────────────────────────────────────────────────────────────────
    // Approval
    // ────────────────────────────────────────────────────────────────────

    /// Moves both artifacts of a version to `to`. A failure on the second
    /// artifact leaves the pair split and surfaces as `PartialWrite`.
    async fn transition_pair(
        &self,
        doc_id: &DocId,
        version: VersionNumber,
        to: Stage,
        metadata: Option<TagMap>,
    ) -> Result<(), DocumentStoreError> {
        let primary_key = keys::primary_artifact(doc_id, version);
        let structured_key = keys::structured_artifact(doc_id, version);
        self.states
            .transition(&primary_key, to, metadata.clone(), false)
            .await?;
        if let Err(err) = self.states.transition(&structured_key, to, metadata, false).await {
            return Err(DocumentStoreError::PartialWrite {
                operation: "transition_pair",
                doc_id: doc_id.to_string(),
                detail: format!(
                    "{primary_key} moved to {to} but {structured_key} did not: {err}"
                ),
            });
        }
        Ok(())
    }

    /// Approves a draft version as the document's new final version.
    ///
    /// At most one final version may exist per document, so any current
    /// final is archived first, then the target pair is finalized, then
    /// the current-version pointer is rewritten. The pointer is advisory:
    /// a pointer write failure is logged, not raised, because lookups
    /// fall back to scanning.
    pub async fn approve_version(
        &self,
        doc_id: &DocId,
        version: VersionNumber,
        approval_info: Option<TagMap>,
    ) -> Result<ApprovalReport, DocumentStoreError> {
        let started = Instant::now();
        let primary_key = keys::primary_artifact(doc_id, version);
        let not_found = || DocumentStoreError::VersionNotFound {
            doc_id: doc_id.to_string(),
            version,
        };
        if !self.store.exists(&primary_key).await? {
            return Err(not_found());
        }
        match self.states.get_state(&primary_key).await? {
            Some(Stage::Draft) => {}
            Some(from) => {
                return Err(StateError::InvalidTransition {
                    key: primary_key,
                    from,
                    to: Stage::Final,
                }
                .into())
            }
            // Artifact exists but carries no stage record: not approvable.
            None => return Err(not_found()),
        }

        let previous_final = self
            .list_versions(doc_id)
            .await?
            .into_iter()
            .find(|info| info.stage == Some(Stage::Final) && info.version != version)
            .map(|info| info.version);

        let archived = match previous_final {
            Some(previous) => {
                self.transition_pair(doc_id, previous, Stage::Archived, None)
                    .await?;
                Some(previous)
            }
            None => None,
        };

        let mut metadata = approval_info.unwrap_or_default();
        metadata
            .entry("approved_at".to_string())
            .or_insert_with(|| Timestamp::now().to_tag_value());
        if let Err(err) = self
            .transition_pair(doc_id, version, Stage::Final, Some(metadata))
            .await
        {
            if let Some(previous) = archived {
                return Err(DocumentStoreError::PartialWrite {
                    operation: "approve_version",
                    doc_id: doc_id.to_string(),
                    detail: format!(
                        "{previous} archived but {version} not finalized: {err}"
                    ),
                });
            }
            return Err(err);
        }

        let pointer_key = keys::current_version_pointer(doc_id);
        if let Err(err) = self
            .store
            .put(
                &pointer_key,
                version.to_string().as_bytes(),
                POINTER_CONTENT_TYPE,
                None,
            )
            .await
        {
            warn!(doc_id = %doc_id, error = %err, "current-version pointer write failed");
        }

        self.cache.invalidate_document(doc_id).await;
        info!(
            doc_id = %doc_id,
            version = %version,
            archived = ?archived,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "version approved"
        );
        Ok(ApprovalReport {
            doc_id: doc_id.clone(),
            version,
            archived,
        })
    }

    // ────────────────────────────────────────────────────────────────────
    // Lookups
    // ────────────────────────────────────────────────────────────────────

    /// The document's current approved version, if any.
    ///
    /// Consults the pointer first; a missing, corrupt, or stale pointer
    /// falls back to scanning for the version whose artifacts are final.
    pub async fn get_current_version(
        &self,
        doc_id: &DocId,
    ) -> Result<Option<VersionNumber>, DocumentStoreError> {
        let started = Instant::now();
        let pointer_key = keys::current_version_pointer(doc_id);
        match self.store.get(&pointer_key).await {
            Ok(bytes) => {
                if let Some(version) = parse_pointer(&bytes) {
                    let primary_key = keys::primary_artifact(doc_id, version);
                    match self.states.get_state(&primary_key).await {
                        Ok(Some(Stage::Final)) => {
                            debug!(
                                doc_id = %doc_id,
                                version = %version,
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                "current version from pointer"
                            );
                            return Ok(Some(version));
                        }
                        Ok(stage) => {
                            warn!(doc_id = %doc_id, %version, ?stage, "stale current-version pointer");
                        }
                        Err(StateError::Store(ObjectStoreError::ObjectNotFound { .. })) => {
                            warn!(doc_id = %doc_id, %version, "pointer names a missing version");
                        }
                        Err(err) => return Err(err.into()),
                    }
                } else {
                    warn!(doc_id = %doc_id, "unreadable current-version pointer");
                }
            }
            Err(ObjectStoreError::ObjectNotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        let current = self
            .list_versions(doc_id)
            .await?
            .into_iter()
            .filter(|info| info.stage == Some(Stage::Final))
            .map(|info| info.version)
            .max();
        debug!(
            doc_id = %doc_id,
            version = ?current,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "current version from scan"
        );
        Ok(current)
    }

    /// Content of the document's current approved version, cache first.
    pub async fn get_final_content(
        &self,
        doc_id: &DocId,
        use_cache: bool,
    ) -> Result<Option<VersionContent>, DocumentStoreError> {
        let started = Instant::now();
        if use_cache {
            if let Some(content) = self.cache.get_document_content(doc_id).await {
                debug!(
                    doc_id = %doc_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "final content from cache"
                );
                return Ok(Some(content));
            }
        }
        let Some(version) = self.get_current_version(doc_id).await? else {
            return Ok(None);
        };
        let content = self.get_version_content(doc_id, version).await?;
        if use_cache {
            self.cache.set_document_content(doc_id, &content).await;
        }
        debug!(
            doc_id = %doc_id,
            version = %version,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "final content from store"
        );
        Ok(Some(content))
    }

    /// Current content of several documents at once. Per-document errors
    /// degrade to `None` so one broken document cannot sink the batch.
    pub async fn get_multiple_documents(
        &self,
        doc_ids: &[DocId],
    ) -> BTreeMap<DocId, Option<VersionContent>> {
        let mut contents = BTreeMap::new();
        for doc_id in doc_ids {
            let content = match self.get_final_content(doc_id, true).await {
                Ok(content) => content,
                Err(err) => {
                    warn!(doc_id = %doc_id, error = %err, "batch content read failed");
                    None
                }
            };
            contents.insert(doc_id.clone(), content);
        }
        contents
    }

    // ────────────────────────────────────────────────────────────────────
    // Health
    // ────────────────────────────────────────────────────────────────────

    /// Documents stuck in `stage` longer than `timeout_minutes`.
    ///
    /// Intake stages live under `raw/`, version stages under `processed/`.
    pub async fn list_stuck_documents(
        &self,
        stage: Stage,
        timeout_minutes: i64,
    ) -> Result<Vec<StuckDocument>, DocumentStoreError> {
        let prefix = match stage {
            Stage::Draft | Stage::Final | Stage::Archived => keys::PROCESSED_PREFIX,
            _ => keys::RAW_PREFIX,
        };
        let stuck = self.states.find_stuck(stage, timeout_minutes, prefix).await?;
        Ok(stuck
            .into_iter()
            .map(|object| StuckDocument {
                doc_id: keys::doc_id_from_key(&object.key),
                key: object.key,
                state_changed_at: object.state_changed_at,
                tags: object.tags,
            })
            .collect())
    }

    /// Aggregated health over intake and version artifacts, cached for a
    /// short TTL.
    ///
    /// Unhealthy when anything is stuck in processing or failures exceed
    /// ten percent of intake; degraded when any failure exists at all.
    pub async fn get_system_health(&self) -> Result<SystemHealth, DocumentStoreError> {
        let started = Instant::now();
        if let Some(cached) = self.cache.get_system_health().await {
            return Ok(cached);
        }
        let state_counts = self.states.state_statistics("").await?;
        let stuck = self
            .states
            .find_stuck(Stage::Processing, self.processing_timeout_minutes, keys::RAW_PREFIX)
            .await?;

        let count = |stage: Stage| state_counts.get(stage.as_str()).copied().unwrap_or(0);
        let failed = count(Stage::Failed);
        let intake_total =
            count(Stage::Raw) + count(Stage::Processing) + count(Stage::Processed) + failed;
        let failed_ratio = if intake_total > 0 {
            failed as f64 / intake_total as f64
        } else {
            0.0
        };

        let mut issues = Vec::new();
        if !stuck.is_empty() {
            issues.push(format!(
                "{} document(s) stuck in processing beyond {} minutes",
                stuck.len(),
                self.processing_timeout_minutes
            ));
        }
        if failed > 0 {
            issues.push(format!(
                "{failed} failed document(s) ({:.1}% of intake)",
                failed_ratio * 100.0
            ));
        }
        let status = if !stuck.is_empty() || failed_ratio > FAILED_RATIO_THRESHOLD {
            SystemStatus::Unhealthy
        } else if failed > 0 {
            SystemStatus::Degraded
        } else {
            SystemStatus::Healthy
        };

        let health = SystemHealth {
            status,
            state_counts,
            stuck_documents: stuck.len() as u64,
            issues,
            checked_at: Timestamp::now(),
        };
        self.cache.set_system_health(&health).await;
        debug!(
            status = ?health.status,
            stuck = health.stuck_documents,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "system health computed"
        );
        Ok(health)
    }
}

/// Decodes a pointer body: `v{n}` as written by approvals, or a bare
/// number left by older tooling. Shared by lookups and the pointer
/// migration so both honor the same pointers.
pub(crate) fn parse_pointer(bytes: &[u8]) -> Option<VersionNumber> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    text.parse::<VersionNumber>()
        .ok()
        .or_else(|| text.parse::<u32>().ok().and_then(|n| VersionNumber::new(n).ok()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::InMemoryCache;
    use crate::adapters::object_store::InMemoryObjectStore;
    use std::time::Duration;

    fn doc(id: &str) -> DocId {
        DocId::new(id).unwrap()
    }

    fn v(n: u32) -> VersionNumber {
        VersionNumber::new(n).unwrap()
    }

    fn store_over(backend: Arc<InMemoryObjectStore>) -> DocumentStore {
        let cache = DocumentCache::new(
            Arc::new(InMemoryCache::new()),
            Duration::from_secs(3600),
            Duration::from_secs(300),
        );
        DocumentStore::new(backend, cache, 10)
    }

    async fn seed_raw(backend: &InMemoryObjectStore, id: &str) {
        backend
            .put(
                &keys::raw_document(&doc(id)),
                b"%PDF-1.7",
                "application/pdf",
                Some(&StageTag::new(Stage::Raw).into_tags()),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn intake_pipeline_moves_raw_to_processed() {
        let backend = Arc::new(InMemoryObjectStore::new());
        seed_raw(&backend, "abc123").await;
        let docs = store_over(backend.clone());
        let id = doc("abc123");

        let raw = docs.list_raw_documents(10).await.unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].doc_id, id);
        assert!(raw[0].uploaded_at.is_some());

        let mut info = TagMap::new();
        info.insert("worker".to_string(), "w1".to_string());
        let record = docs.mark_processing(&id, Some(info)).await.unwrap();
        assert_eq!(record.stage, Stage::Processing);
        assert!(record.metadata.contains_key("processing_started_at"));
        assert_eq!(record.metadata["worker"], "w1");

        let record = docs.mark_processed(&id, None).await.unwrap();
        assert_eq!(record.stage, Stage::Processed);
        assert!(record.metadata.contains_key("processing_completed_at"));
        // Intake metadata accumulates across the pipeline.
        assert_eq!(record.metadata["worker"], "w1");

        assert!(docs.list_raw_documents(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn untagged_upload_can_enter_the_pipeline() {
        let backend = Arc::new(InMemoryObjectStore::new());
        backend
            .put(
                &keys::raw_document(&doc("abc123")),
                b"%PDF-1.7",
                "application/pdf",
                None,
            )
            .await
            .unwrap();
        let docs = store_over(backend);
        let record = docs.mark_processing(&doc("abc123"), None).await.unwrap();
        assert_eq!(record.stage, Stage::Processing);
        assert_eq!(record.previous_stage, None);
    }

    #[tokio::test]
    async fn mark_failed_records_truncated_error() {
        let backend = Arc::new(InMemoryObjectStore::new());
        seed_raw(&backend, "abc123").await;
        let docs = store_over(backend);
        let id = doc("abc123");
        docs.mark_processing(&id, None).await.unwrap();
        let long_error = "x".repeat(1000);
        let record = docs.mark_failed(&id, &long_error, None).await.unwrap();
        assert_eq!(record.stage, Stage::Failed);
        assert_eq!(record.metadata["error_message"].len(), 256);
        assert!(record.metadata.contains_key("failed_at"));
    }

    #[tokio::test]
    async fn mark_failed_truncates_multibyte_errors_on_char_boundaries() {
        let backend = Arc::new(InMemoryObjectStore::new());
        seed_raw(&backend, "abc123").await;
        let docs = store_over(backend);
        let id = doc("abc123");
        docs.mark_processing(&id, None).await.unwrap();
        // 300 bytes of three-byte characters; byte 256 is mid-character.
        let multibyte_error = "€".repeat(100);
        let record = docs.mark_failed(&id, &multibyte_error, None).await.unwrap();
        let message = &record.metadata["error_message"];
        assert!(message.len() <= 256);
        assert!(message.chars().all(|c| c == '€'));
    }

    #[tokio::test]
    async fn reset_to_raw_recovers_failed_documents() {
        let backend = Arc::new(InMemoryObjectStore::new());
        seed_raw(&backend, "abc123").await;
        let docs = store_over(backend);
        let id = doc("abc123");
        docs.mark_processing(&id, None).await.unwrap();
        docs.mark_failed(&id, "parser crash", None).await.unwrap();
        let record = docs.reset_to_raw(&id, Some("retrying")).await.unwrap();
        assert_eq!(record.stage, Stage::Raw);
        assert_eq!(record.metadata["reset_reason"], "retrying");
        assert_eq!(record.metadata["reset_from"], "failed");
    }

    #[tokio::test]
    async fn batch_mark_processing_reports_per_document() {
        let backend = Arc::new(InMemoryObjectStore::new());
        seed_raw(&backend, "good01").await;
        let docs = store_over(backend);
        let outcomes = docs
            .batch_mark_processing(&[doc("good01"), doc("absent")], None)
            .await;
        assert_eq!(outcomes[&doc("good01")], true);
        assert_eq!(outcomes[&doc("absent")], false);
    }

    #[tokio::test]
    async fn create_version_allocates_and_tags_both_artifacts() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend.clone());
        let id = doc("abc123");

        let version = docs
            .create_version(&id, "# Report", r#"{"title":"Report"}"#, None, None)
            .await
            .unwrap();
        assert_eq!(version, VersionNumber::FIRST);

        let primary_tags = backend
            .get_tags(&keys::primary_artifact(&id, version))
            .await
            .unwrap();
        let structured_tags = backend
            .get_tags(&keys::structured_artifact(&id, version))
            .await
            .unwrap();
        assert_eq!(primary_tags, structured_tags);
        let record = StageTag::from_tags(&primary_tags).unwrap();
        assert_eq!(record.stage, Stage::Draft);
        assert_eq!(record.extra["doc_id"], "abc123");
        assert_eq!(record.extra["version"], "v1");
        assert!(record.extra.contains_key("created_at"));

        let next = docs
            .create_version(&id, "# Report 2", "{}", None, None)
            .await
            .unwrap();
        assert_eq!(next, v(2));
    }

    #[tokio::test]
    async fn create_version_rejects_existing_version() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend);
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", Some(v(1)), None)
            .await
            .unwrap();
        let err = docs
            .create_version(&id, "b", "{}", Some(v(1)), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentStoreError::VersionAlreadyExists { .. }
        ));
    }

    #[tokio::test]
    async fn create_version_rolls_back_on_second_write_failure() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend.clone());
        let id = doc("abc123");
        backend.fail_put_matching("structured").await;

        let err = docs
            .create_version(&id, "a", "{}", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::Store(_)));
        // Nothing remains of the half-written version.
        assert!(backend.is_empty().await);
        assert_eq!(
            docs.next_version_number(&id).await.unwrap(),
            VersionNumber::FIRST
        );
    }

    #[tokio::test]
    async fn list_versions_reports_presence_and_stage() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend.clone());
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", None, None).await.unwrap();
        docs.create_version(&id, "b", "{}", None, None).await.unwrap();
        // Lose v1's structured artifact.
        backend
            .delete(&keys::structured_artifact(&id, v(1)))
            .await
            .unwrap();

        let versions = docs.list_versions(&id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, v(1));
        assert!(versions[0].has_primary);
        assert!(!versions[0].has_structured);
        assert_eq!(versions[1].version, v(2));
        assert!(versions[1].has_structured);
        assert_eq!(versions[0].stage, Some(Stage::Draft));
        assert!(versions[0].created_at.is_some());
    }

    #[tokio::test]
    async fn approval_archives_previous_final_and_moves_pointer() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend.clone());
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", None, None).await.unwrap();

        let mut approver = TagMap::new();
        approver.insert("approved_by".to_string(), "pat".to_string());
        let report = docs.approve_version(&id, v(1), Some(approver)).await.unwrap();
        assert_eq!(report.version, v(1));
        assert_eq!(report.archived, None);
        assert_eq!(docs.get_current_version(&id).await.unwrap(), Some(v(1)));

        docs.create_version(&id, "b", "{}", None, None).await.unwrap();
        let report = docs.approve_version(&id, v(2), None).await.unwrap();
        assert_eq!(report.archived, Some(v(1)));
        assert_eq!(docs.get_current_version(&id).await.unwrap(), Some(v(2)));

        // Never two finals: v1's pair is archived, v2's is final.
        let versions = docs.list_versions(&id).await.unwrap();
        assert_eq!(versions[0].stage, Some(Stage::Archived));
        assert_eq!(versions[1].stage, Some(Stage::Final));
        let structured_tags = backend
            .get_tags(&keys::structured_artifact(&id, v(1)))
            .await
            .unwrap();
        assert_eq!(
            StageTag::from_tags(&structured_tags).unwrap().stage,
            Stage::Archived
        );

        // Approval metadata lands on the final pair.
        let final_tags = backend
            .get_tags(&keys::primary_artifact(&id, v(2)))
            .await
            .unwrap();
        let record = StageTag::from_tags(&final_tags).unwrap();
        assert!(record.metadata.contains_key("approved_at"));
    }

    #[tokio::test]
    async fn approving_a_non_draft_is_rejected() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend);
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", None, None).await.unwrap();
        docs.approve_version(&id, v(1), None).await.unwrap();

        let err = docs.approve_version(&id, v(1), None).await.unwrap_err();
        assert!(matches!(
            err,
            DocumentStoreError::State(StateError::InvalidTransition {
                from: Stage::Final,
                ..
            })
        ));

        let err = docs.approve_version(&id, v(9), None).await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::VersionNotFound { .. }));
    }

    #[tokio::test]
    async fn stale_pointer_falls_back_to_scanning() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend.clone());
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", None, None).await.unwrap();
        docs.approve_version(&id, v(1), None).await.unwrap();

        // Corrupt the pointer; lookups must still find the final version.
        backend
            .put(&keys::current_version_pointer(&id), b"v9", "text/plain", None)
            .await
            .unwrap();
        assert_eq!(docs.get_current_version(&id).await.unwrap(), Some(v(1)));

        backend
            .put(&keys::current_version_pointer(&id), b"nonsense", "text/plain", None)
            .await
            .unwrap();
        assert_eq!(docs.get_current_version(&id).await.unwrap(), Some(v(1)));

        backend
            .delete(&keys::current_version_pointer(&id))
            .await
            .unwrap();
        assert_eq!(docs.get_current_version(&id).await.unwrap(), Some(v(1)));
    }

    #[tokio::test]
    async fn pointer_accepts_bare_numbers() {
        assert_eq!(parse_pointer(b"v3"), Some(v(3)));
        assert_eq!(parse_pointer(b"3\n"), Some(v(3)));
        assert_eq!(parse_pointer(b"0"), None);
        assert_eq!(parse_pointer(b"garbage"), None);
        assert_eq!(parse_pointer(&[0xff, 0xfe]), None);
    }

    #[tokio::test]
    async fn no_final_version_means_no_current() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend);
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", None, None).await.unwrap();
        assert_eq!(docs.get_current_version(&id).await.unwrap(), None);
        assert!(docs.get_final_content(&id, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn final_content_is_served_from_cache_on_repeat_reads() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend.clone());
        let id = doc("abc123");
        docs.create_version(&id, "# Report", r#"{"k":1}"#, None, None)
            .await
            .unwrap();
        docs.approve_version(&id, v(1), None).await.unwrap();

        let first = docs.get_final_content(&id, true).await.unwrap().unwrap();
        assert_eq!(first.primary, "# Report");
        let ops_after_first = backend.op_count();

        // Second read never touches the object store.
        let second = docs.get_final_content(&id, true).await.unwrap().unwrap();
        assert_eq!(second, first);
        assert_eq!(backend.op_count(), ops_after_first);
    }

    #[tokio::test]
    async fn approval_invalidates_cached_content() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend);
        let id = doc("abc123");
        docs.create_version(&id, "old", "{}", None, None).await.unwrap();
        docs.approve_version(&id, v(1), None).await.unwrap();
        let cached = docs.get_final_content(&id, true).await.unwrap().unwrap();
        assert_eq!(cached.primary, "old");

        docs.create_version(&id, "new", "{}", None, None).await.unwrap();
        docs.approve_version(&id, v(2), None).await.unwrap();
        let fresh = docs.get_final_content(&id, true).await.unwrap().unwrap();
        assert_eq!(fresh.primary, "new");
    }

    #[tokio::test]
    async fn draft_and_final_listings_pick_the_right_documents() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend);
        let drafted = doc("drafted");
        let approved = doc("approved");
        docs.create_version(&drafted, "a", "{}", None, None).await.unwrap();
        docs.create_version(&approved, "b", "{}", None, None).await.unwrap();
        docs.approve_version(&approved, v(1), None).await.unwrap();

        let drafts = docs.list_draft_documents(10).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].doc_id, drafted);
        assert_eq!(drafts[0].stage, Stage::Draft);

        let finals = docs.list_final_documents(10, false).await.unwrap();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].doc_id, approved);
        assert_eq!(finals[0].version, v(1));
    }

    #[tokio::test]
    async fn listings_keep_one_entry_per_document_at_highest_version() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend);
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", None, None).await.unwrap();
        docs.create_version(&id, "b", "{}", None, None).await.unwrap();

        let drafts = docs.list_draft_documents(10).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].version, v(2));
    }

    #[tokio::test]
    async fn final_listing_uses_the_cache() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend.clone());
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", None, None).await.unwrap();
        docs.approve_version(&id, v(1), None).await.unwrap();

        let first = docs.list_final_documents(10, true).await.unwrap();
        assert_eq!(first.len(), 1);
        let ops_after_first = backend.op_count();
        let second = docs.list_final_documents(10, true).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(backend.op_count(), ops_after_first);
    }

    #[tokio::test]
    async fn get_multiple_documents_degrades_per_document() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend);
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", None, None).await.unwrap();
        docs.approve_version(&id, v(1), None).await.unwrap();

        let contents = docs
            .get_multiple_documents(&[id.clone(), doc("absent")])
            .await;
        assert!(contents[&id].is_some());
        assert!(contents[&doc("absent")].is_none());
    }

    #[tokio::test]
    async fn health_is_healthy_on_a_clean_store() {
        let backend = Arc::new(InMemoryObjectStore::new());
        seed_raw(&backend, "abc123").await;
        let docs = store_over(backend);
        let health = docs.get_system_health().await.unwrap();
        assert_eq!(health.status, SystemStatus::Healthy);
        assert_eq!(health.state_counts["raw"], 1);
        assert_eq!(health.stuck_documents, 0);
        assert!(health.issues.is_empty());
    }

    #[tokio::test]
    async fn health_degrades_on_failures_and_sinks_past_the_threshold() {
        let backend = Arc::new(InMemoryObjectStore::new());
        for id in ["doc01", "doc02", "doc03", "doc04", "doc05", "doc06",
                   "doc07", "doc08", "doc09", "doc10", "doc11"] {
            seed_raw(&backend, id).await;
        }
        let docs = store_over(backend.clone());

        // 1 failure out of 11: degraded but under the ratio threshold.
        docs.mark_processing(&doc("doc01"), None).await.unwrap();
        docs.mark_failed(&doc("doc01"), "boom", None).await.unwrap();
        let health = docs.get_system_health().await.unwrap();
        assert_eq!(health.status, SystemStatus::Degraded);
        assert_eq!(health.issues.len(), 1);

        // A second failure pushes past ten percent. The first report is
        // cached, so read through a store with a fresh cache.
        docs.mark_processing(&doc("doc02"), None).await.unwrap();
        docs.mark_failed(&doc("doc02"), "boom", None).await.unwrap();
        let fresh = store_over(backend);
        let health = fresh.get_system_health().await.unwrap();
        assert_eq!(health.status, SystemStatus::Unhealthy);
    }

    #[tokio::test]
    async fn health_flags_stuck_processing() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let mut old = StageTag::new(Stage::Processing);
        old.state_changed_at = Some(Timestamp::now().minus_minutes(60));
        backend
            .put(
                &keys::raw_document(&doc("abc123")),
                b"x",
                "application/pdf",
                Some(&old.into_tags()),
            )
            .await
            .unwrap();
        let docs = store_over(backend);

        let health = docs.get_system_health().await.unwrap();
        assert_eq!(health.status, SystemStatus::Unhealthy);
        assert_eq!(health.stuck_documents, 1);

        let stuck = docs
            .list_stuck_documents(Stage::Processing, 10)
            .await
            .unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].doc_id, Some(doc("abc123")));
    }

    #[tokio::test]
    async fn stuck_scan_covers_version_artifacts() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let docs = store_over(backend.clone());
        let id = doc("abc123");
        docs.create_version(&id, "a", "{}", None, None).await.unwrap();

        // Age the draft's primary artifact far past any review window.
        let mut old = StageTag::new(Stage::Draft);
        old.state_changed_at = Some(Timestamp::now().minus_minutes(600));
        backend
            .set_tags(&keys::primary_artifact(&id, v(1)), &old.into_tags())
            .await
            .unwrap();

        let stuck = docs.list_stuck_documents(Stage::Draft, 10).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].doc_id, Some(id));
        assert_eq!(stuck[0].key, "processed/abc123/v1/primary.md");
    }

    #[tokio::test]
    async fn health_report_is_cached() {
        let backend = Arc::new(InMemoryObjectStore::new());
        seed_raw(&backend, "abc123").await;
        let docs = store_over(backend.clone());
        docs.get_system_health().await.unwrap();
        let ops_after_first = backend.op_count();
        docs.get_system_health().await.unwrap();
        assert_eq!(backend.op_count(), ops_after_first);
    }
}
