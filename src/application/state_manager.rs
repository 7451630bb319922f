//! State Manager - lifecycle stage bookkeeping on top of the object store.
//!
//! The stage recorded in an object's tags is the single source of truth.
//! Transitions validate against the lifecycle graph and are written with a
//! conditional swap, so a concurrent writer on the same key surfaces as an
//! error instead of a silently lost update.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::document::{Stage, StageTag, TagMap, STAGE_TAG};
use crate::domain::foundation::Timestamp;
use crate::ports::{ObjectStore, ObjectStoreError};

/// Upper bound on keys examined by a statistics or stuck-object scan.
const DEFAULT_SCAN_LIMIT: usize = 10_000;

/// Statistics bucket for objects carrying no stage tag.
const NO_STATE_BUCKET: &str = "no_state";

/// Errors produced by state operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// The underlying object store failed.
    #[error(transparent)]
    Store(#[from] ObjectStoreError),

    /// The lifecycle graph has no edge from the current stage.
    #[error("invalid transition for {key}: {from} -> {to}")]
    InvalidTransition { key: String, from: Stage, to: Stage },

    /// Another writer changed the object's tags mid-transition.
    #[error("concurrent modification of {key}")]
    ConcurrentModification { key: String },
}

/// An object sitting in a stage longer than its allowed window.
#[derive(Debug, Clone)]
pub struct StuckObject {
    pub key: String,
    /// When the object entered its current stage, if recorded.
    pub state_changed_at: Option<Timestamp>,
    pub tags: TagMap,
}

/// Stage bookkeeping over an [`ObjectStore`].
pub struct StateManager {
    store: Arc<dyn ObjectStore>,
}

impl StateManager {
    /// Creates a state manager over the given store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Reads the stage of an object.
    ///
    /// Returns `None` (with a warning) when the object exists but carries
    /// no recognizable stage tag; a missing object is an error.
    pub async fn get_state(&self, key: &str) -> Result<Option<Stage>, StateError> {
        let tags = self.store.get_tags(key).await?;
        match tags.get(STAGE_TAG) {
            Some(value) => match value.parse::<Stage>() {
                Ok(stage) => Ok(Some(stage)),
                Err(_) => {
                    warn!(key, stage = %value, "unrecognized stage tag");
                    Ok(None)
                }
            },
            None => {
                warn!(key, "object has no stage tag");
                Ok(None)
            }
        }
    }

    /// Moves an object to `to`, validating the edge unless `force`.
    ///
    /// Caller-supplied `metadata` is merged into the object's metadata tags.
    /// The write is conditional on the tags read at the start, so a racing
    /// transition on the same key fails with `ConcurrentModification` and
    /// leaves the winner's tags intact.
    pub async fn transition(
        &self,
        key: &str,
        to: Stage,
        metadata: Option<TagMap>,
        force: bool,
    ) -> Result<StageTag, StateError> {
        let started = Instant::now();
        let current_tags = self.store.get_tags(key).await?;
        let current = StageTag::from_tags(&current_tags);

        let mut next = match &current {
            Some(record) => {
                if !force && !record.stage.can_transition_to(to) {
                    return Err(StateError::InvalidTransition {
                        key: key.to_string(),
                        from: record.stage,
                        to,
                    });
                }
                record.advanced_to(to)
            }
            // Untagged object: adopt the target stage with no history.
            None => StageTag::new(to),
        };
        if let Some(metadata) = metadata {
            next.metadata.extend(metadata);
        }

        let result = next.clone();
        match self
            .store
            .swap_tags(key, &current_tags, &next.into_tags())
            .await
        {
            Ok(()) => {
                debug!(
                    key,
                    to = %to,
                    force,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "state transition"
                );
                Ok(result)
            }
            Err(ObjectStoreError::PreconditionFailed { .. }) => {
                Err(StateError::ConcurrentModification {
                    key: key.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Lists objects under `prefix` whose stage is in `states`, with their
    /// full tag maps. Objects with unparsable stage tags are skipped with a
    /// warning; objects deleted mid-scan are skipped silently.
    pub async fn list_by_states(
        &self,
        states: &[Stage],
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<(String, Stage, TagMap)>, StateError> {
        let started = Instant::now();
        let keys = self.store.list_by_prefix(prefix, limit).await?;
        let mut matches = Vec::new();
        for key in keys {
            let tags = match self.store.get_tags(&key).await {
                Ok(tags) => tags,
                Err(ObjectStoreError::ObjectNotFound { .. }) => continue,
                Err(err) => return Err(err.into()),
            };
            let Some(value) = tags.get(STAGE_TAG) else {
                continue;
            };
            let stage = match value.parse::<Stage>() {
                Ok(stage) => stage,
                Err(_) => {
                    warn!(key, stage = %value, "skipping object with unrecognized stage tag");
                    continue;
                }
            };
            if states.contains(&stage) {
                matches.push((key, stage, tags));
            }
        }
        debug!(
            prefix,
            found = matches.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "state scan"
        );
        Ok(matches)
    }

    /// Finds objects stuck in `stage`: entered it more than
    /// `timeout_minutes` ago, or carry no usable entry timestamp at all.
    pub async fn find_stuck(
        &self,
        stage: Stage,
        timeout_minutes: i64,
        prefix: &str,
    ) -> Result<Vec<StuckObject>, StateError> {
        let cutoff = Timestamp::now().minus_minutes(timeout_minutes);
        let candidates = self
            .list_by_states(&[stage], prefix, DEFAULT_SCAN_LIMIT)
            .await?;
        Ok(candidates
            .into_iter()
            .filter_map(|(key, _, tags)| {
                let record = StageTag::from_tags(&tags)?;
                match record.state_changed_at {
                    Some(at) if at.is_after(&cutoff) => None,
                    // Old, or no timestamp to judge by: stuck either way.
                    state_changed_at => Some(StuckObject {
                        key,
                        state_changed_at,
                        tags,
                    }),
                }
            })
            .collect())
    }

    /// Counts objects under `prefix` per stage tag value. Untagged objects
    /// land in the `no_state` bucket; unknown stage strings are counted
    /// under their own value with a warning.
    pub async fn state_statistics(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, u64>, StateError> {
        let mut counts: BTreeMap<String, u64> = Stage::ALL
            .iter()
            .map(|stage| (stage.as_str().to_string(), 0))
            .collect();
        counts.insert(NO_STATE_BUCKET.to_string(), 0);

        let keys = self.store.list_by_prefix(prefix, DEFAULT_SCAN_LIMIT).await?;
        for key in keys {
            let tags = match self.store.get_tags(&key).await {
                Ok(tags) => tags,
                Err(ObjectStoreError::ObjectNotFound { .. }) => continue,
                Err(err) => return Err(err.into()),
            };
            let bucket = match tags.get(STAGE_TAG) {
                Some(value) => {
                    if value.parse::<Stage>().is_err() {
                        warn!(key, stage = %value, "counting unrecognized stage tag");
                    }
                    value.clone()
                }
                None => NO_STATE_BUCKET.to_string(),
            };
            *counts.entry(bucket).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Forces an object back to `to` (manual recovery), stamping the reason
    /// and the stage it came from into metadata. Always logged at warn.
    pub async fn reset(
        &self,
        key: &str,
        to: Stage,
        reason: Option<&str>,
    ) -> Result<StageTag, StateError> {
        let from = self.get_state(key).await?;
        let mut metadata = TagMap::new();
        if let Some(reason) = reason {
            metadata.insert("reset_reason".to_string(), reason.to_string());
        }
        if let Some(from) = from {
            metadata.insert("reset_from".to_string(), from.as_str().to_string());
        }
        warn!(key, to = %to, ?reason, "forced state reset");
        self.transition(key, to, Some(metadata), true).await
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::object_store::InMemoryObjectStore;

    async fn seeded(key: &str, stage: Stage) -> (Arc<InMemoryObjectStore>, StateManager) {
        let store = Arc::new(InMemoryObjectStore::new());
        store
            .put(
                key,
                b"content",
                "application/pdf",
                Some(&StageTag::new(stage).into_tags()),
            )
            .await
            .unwrap();
        let manager = StateManager::new(store.clone());
        (store, manager)
    }

    #[tokio::test]
    async fn get_state_reads_the_stage_tag() {
        let (_store, manager) = seeded("raw/a/original.pdf", Stage::Raw).await;
        assert_eq!(
            manager.get_state("raw/a/original.pdf").await.unwrap(),
            Some(Stage::Raw)
        );
    }

    #[tokio::test]
    async fn get_state_is_none_for_untagged_objects() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("k", b"x", "text/plain", None).await.unwrap();
        let manager = StateManager::new(store);
        assert_eq!(manager.get_state("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_state_propagates_missing_object() {
        let manager = StateManager::new(Arc::new(InMemoryObjectStore::new()));
        let err = manager.get_state("missing").await.unwrap_err();
        assert!(matches!(
            err,
            StateError::Store(ObjectStoreError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn valid_transition_updates_tags_and_history() {
        let (store, manager) = seeded("raw/a/original.pdf", Stage::Raw).await;
        let record = manager
            .transition("raw/a/original.pdf", Stage::Processing, None, false)
            .await
            .unwrap();
        assert_eq!(record.stage, Stage::Processing);
        assert_eq!(record.previous_stage, Some(Stage::Raw));

        let tags = store.get_tags("raw/a/original.pdf").await.unwrap();
        let stored = StageTag::from_tags(&tags).unwrap();
        assert_eq!(stored.stage, Stage::Processing);
        assert_eq!(stored.previous_stage, Some(Stage::Raw));
        assert!(stored.state_changed_at.is_some());
    }

    #[tokio::test]
    async fn invalid_transition_is_rejected_and_leaves_tags_untouched() {
        let (store, manager) = seeded("raw/a/original.pdf", Stage::Raw).await;
        let before = store.get_tags("raw/a/original.pdf").await.unwrap();
        let err = manager
            .transition("raw/a/original.pdf", Stage::Final, None, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::InvalidTransition {
                from: Stage::Raw,
                to: Stage::Final,
                ..
            }
        ));
        assert_eq!(store.get_tags("raw/a/original.pdf").await.unwrap(), before);
    }

    #[tokio::test]
    async fn force_bypasses_graph_validation() {
        let (_store, manager) = seeded("raw/a/original.pdf", Stage::Raw).await;
        let record = manager
            .transition("raw/a/original.pdf", Stage::Final, None, true)
            .await
            .unwrap();
        assert_eq!(record.stage, Stage::Final);
    }

    #[tokio::test]
    async fn transition_merges_metadata() {
        let (store, manager) = seeded("raw/a/original.pdf", Stage::Raw).await;
        let mut metadata = TagMap::new();
        metadata.insert("worker".to_string(), "w1".to_string());
        manager
            .transition("raw/a/original.pdf", Stage::Processing, Some(metadata), false)
            .await
            .unwrap();
        let tags = store.get_tags("raw/a/original.pdf").await.unwrap();
        assert_eq!(tags.get("meta_worker").map(String::as_str), Some("w1"));
    }

    /// Store wrapper that rewrites an object's tags right after serving a
    /// tag read, standing in for a racing writer.
    struct RacingStore {
        inner: Arc<InMemoryObjectStore>,
        race_key: String,
        race_tags: TagMap,
        armed: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl ObjectStore for RacingStore {
        async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
            self.inner.get(key).await
        }
        async fn put(
            &self,
            key: &str,
            content: &[u8],
            content_type: &str,
            tags: Option<&TagMap>,
        ) -> Result<crate::ports::PutResult, ObjectStoreError> {
            self.inner.put(key, content, content_type, tags).await
        }
        async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
            self.inner.exists(key).await
        }
        async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
            self.inner.delete(key).await
        }
        async fn list_by_prefix(
            &self,
            prefix: &str,
            limit: usize,
        ) -> Result<Vec<String>, ObjectStoreError> {
            self.inner.list_by_prefix(prefix, limit).await
        }
        async fn get_tags(&self, key: &str) -> Result<TagMap, ObjectStoreError> {
            let tags = self.inner.get_tags(key).await?;
            if key == self.race_key
                && self.armed.swap(false, std::sync::atomic::Ordering::SeqCst)
            {
                self.inner.set_tags(key, &self.race_tags).await?;
            }
            Ok(tags)
        }
        async fn set_tags(&self, key: &str, tags: &TagMap) -> Result<(), ObjectStoreError> {
            self.inner.set_tags(key, tags).await
        }
        async fn swap_tags(
            &self,
            key: &str,
            expected: &TagMap,
            next: &TagMap,
        ) -> Result<(), ObjectStoreError> {
            self.inner.swap_tags(key, expected, next).await
        }
    }

    #[tokio::test]
    async fn concurrent_writer_surfaces_as_concurrent_modification() {
        let inner = Arc::new(InMemoryObjectStore::new());
        inner
            .put(
                "raw/a/original.pdf",
                b"x",
                "application/pdf",
                Some(&StageTag::new(Stage::Raw).into_tags()),
            )
            .await
            .unwrap();
        let racing = RacingStore {
            inner: inner.clone(),
            race_key: "raw/a/original.pdf".to_string(),
            race_tags: StageTag::new(Stage::Processing).into_tags(),
            armed: std::sync::atomic::AtomicBool::new(true),
        };
        let manager = StateManager::new(Arc::new(racing));
        let err = manager
            .transition("raw/a/original.pdf", Stage::Processing, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::ConcurrentModification { .. }));
        // The racing writer's tags survive.
        let tags = inner.get_tags("raw/a/original.pdf").await.unwrap();
        assert_eq!(
            StageTag::from_tags(&tags).unwrap().stage,
            Stage::Processing
        );
    }

    #[tokio::test]
    async fn untagged_object_adopts_target_stage() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("k", b"x", "text/plain", None).await.unwrap();
        let manager = StateManager::new(store);
        let record = manager.transition("k", Stage::Raw, None, false).await.unwrap();
        assert_eq!(record.stage, Stage::Raw);
        assert_eq!(record.previous_stage, None);
    }

    #[tokio::test]
    async fn list_by_states_filters_and_skips_unparsable() {
        let store = Arc::new(InMemoryObjectStore::new());
        store
            .put(
                "raw/a/original.pdf",
                b"x",
                "application/pdf",
                Some(&StageTag::new(Stage::Raw).into_tags()),
            )
            .await
            .unwrap();
        store
            .put(
                "raw/b/original.pdf",
                b"x",
                "application/pdf",
                Some(&StageTag::new(Stage::Processing).into_tags()),
            )
            .await
            .unwrap();
        let mut bad = TagMap::new();
        bad.insert(STAGE_TAG.to_string(), "limbo".to_string());
        store
            .put("raw/c/original.pdf", b"x", "application/pdf", Some(&bad))
            .await
            .unwrap();

        let manager = StateManager::new(store);
        let raw = manager
            .list_by_states(&[Stage::Raw], "raw/", 100)
            .await
            .unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].0, "raw/a/original.pdf");
        assert_eq!(raw[0].1, Stage::Raw);

        let both = manager
            .list_by_states(&[Stage::Raw, Stage::Processing], "raw/", 100)
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
    }

    #[tokio::test]
    async fn find_stuck_flags_old_and_timestampless_objects() {
        let store = Arc::new(InMemoryObjectStore::new());
        // Fresh object: not stuck.
        store
            .put(
                "raw/fresh/original.pdf",
                b"x",
                "application/pdf",
                Some(&StageTag::new(Stage::Processing).into_tags()),
            )
            .await
            .unwrap();
        // Entered processing an hour ago: stuck at a 10 minute timeout.
        let mut old = StageTag::new(Stage::Processing);
        old.state_changed_at = Some(Timestamp::now().minus_minutes(60));
        store
            .put("raw/old/original.pdf", b"x", "application/pdf", Some(&old.into_tags()))
            .await
            .unwrap();
        // No timestamp at all: always stuck.
        let mut bare = TagMap::new();
        bare.insert(STAGE_TAG.to_string(), "processing".to_string());
        store
            .put("raw/bare/original.pdf", b"x", "application/pdf", Some(&bare))
            .await
            .unwrap();

        let manager = StateManager::new(store);
        let stuck = manager
            .find_stuck(Stage::Processing, 10, "raw/")
            .await
            .unwrap();
        let keys: Vec<&str> = stuck.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["raw/bare/original.pdf", "raw/old/original.pdf"]);
        assert!(stuck[0].state_changed_at.is_none());
        assert!(stuck[1].state_changed_at.is_some());
    }

    #[tokio::test]
    async fn statistics_bucket_by_stage_and_no_state() {
        let store = Arc::new(InMemoryObjectStore::new());
        store
            .put(
                "raw/a/original.pdf",
                b"x",
                "application/pdf",
                Some(&StageTag::new(Stage::Raw).into_tags()),
            )
            .await
            .unwrap();
        store
            .put(
                "raw/b/original.pdf",
                b"x",
                "application/pdf",
                Some(&StageTag::new(Stage::Raw).into_tags()),
            )
            .await
            .unwrap();
        store.put("raw/c/original.pdf", b"x", "application/pdf", None).await.unwrap();

        let manager = StateManager::new(store);
        let stats = manager.state_statistics("raw/").await.unwrap();
        assert_eq!(stats["raw"], 2);
        assert_eq!(stats["no_state"], 1);
        assert_eq!(stats["processing"], 0);
    }

    #[tokio::test]
    async fn reset_forces_and_stamps_recovery_metadata() {
        let (store, manager) = seeded("raw/a/original.pdf", Stage::Processing).await;
        let record = manager
            .reset("raw/a/original.pdf", Stage::Raw, Some("manual retry"))
            .await
            .unwrap();
        assert_eq!(record.stage, Stage::Raw);

        let tags = store.get_tags("raw/a/original.pdf").await.unwrap();
        assert_eq!(
            tags.get("meta_reset_reason").map(String::as_str),
            Some("manual retry")
        );
        assert_eq!(
            tags.get("meta_reset_from").map(String::as_str),
            Some("processing")
        );
    }
}
