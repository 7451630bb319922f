//! Pointer Migration - audits and repairs current-version pointers.
//!
//! Pointers are advisory and can go missing or stale (a crashed approval,
//! an object restored from backup). This walks every document with a
//! final version, compares its pointer against the stage tags, and
//! optionally rewrites the pointers that disagree. Per-document failures
//! are collected, never aborting the run.

use tracing::{info, warn};

use crate::application::document_store::{parse_pointer, DocumentStore, DocumentStoreError};
use crate::domain::document::{keys, DocId, VersionNumber};
use crate::ports::ObjectStoreError;

/// Why a pointer needs repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerIssue {
    /// No pointer object exists for the document.
    Missing,
    /// The pointer exists but does not name the final version.
    Stale,
}

/// One pointer found in need of repair.
#[derive(Debug, Clone)]
pub struct PointerRepair {
    pub doc_id: DocId,
    /// The version the pointer should name.
    pub version: VersionNumber,
    pub issue: PointerIssue,
}

/// Outcome of one migration run.
#[derive(Debug)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub repairs: Vec<PointerRepair>,
    pub errors: Vec<String>,
}

impl MigrationReport {
    /// Whether every examined pointer was already correct.
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty() && self.errors.is_empty()
    }
}

/// Audits and repairs current-version pointers.
pub struct PointerMigration<'a> {
    docs: &'a DocumentStore,
}

impl<'a> PointerMigration<'a> {
    pub fn new(docs: &'a DocumentStore) -> Self {
        Self { docs }
    }

    /// Finds every final-version document whose pointer is missing or
    /// names the wrong version. Documents that fail to audit land in the
    /// error list instead of stopping the scan.
    pub async fn audit(&self) -> Result<(Vec<PointerRepair>, Vec<String>), DocumentStoreError> {
        let finals = self.docs.list_final_documents(usize::MAX, false).await?;
        let mut repairs = Vec::new();
        let mut errors = Vec::new();
        for listing in finals {
            match self.pointer_issue(&listing.doc_id, listing.version).await {
                Ok(Some(issue)) => repairs.push(PointerRepair {
                    doc_id: listing.doc_id,
                    version: listing.version,
                    issue,
                }),
                Ok(None) => {}
                Err(err) => {
                    errors.push(format!("{}: {err}", listing.doc_id));
                }
            }
        }
        Ok((repairs, errors))
    }

    async fn pointer_issue(
        &self,
        doc_id: &DocId,
        version: VersionNumber,
    ) -> Result<Option<PointerIssue>, DocumentStoreError> {
        let pointer_key = keys::current_version_pointer(doc_id);
        let bytes = match self.docs.object_store().get(&pointer_key).await {
            Ok(bytes) => bytes,
            Err(ObjectStoreError::ObjectNotFound { .. }) => {
                return Ok(Some(PointerIssue::Missing))
            }
            Err(err) => return Err(err.into()),
        };
        let pointed = parse_pointer(&bytes);
        Ok(if pointed == Some(version) {
            None
        } else {
            Some(PointerIssue::Stale)
        })
    }

    /// Audits and, unless `dry_run`, rewrites every broken pointer.
    pub async fn run(&self, dry_run: bool) -> Result<MigrationReport, DocumentStoreError> {
        let (repairs, mut errors) = self.audit().await?;
        if !dry_run {
            for repair in &repairs {
                let pointer_key = keys::current_version_pointer(&repair.doc_id);
                if let Err(err) = self
                    .docs
                    .object_store()
                    .put(
                        &pointer_key,
                        repair.version.to_string().as_bytes(),
                        "text/plain",
                        None,
                    )
                    .await
                {
                    warn!(doc_id = %repair.doc_id, error = %err, "pointer repair failed");
                    errors.push(format!("{}: {err}", repair.doc_id));
                } else {
                    info!(
                        doc_id = %repair.doc_id,
                        version = %repair.version,
                        issue = ?repair.issue,
                        "pointer repaired"
                    );
                }
            }
        }
        Ok(MigrationReport {
            dry_run,
            repairs,
            errors,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════════
