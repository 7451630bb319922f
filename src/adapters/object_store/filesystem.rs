//! Filesystem Object Store Adapter - Implementation of ObjectStore.
//!
//! Stores object content as plain files under a root directory, with the
//! content type and tags in a JSON sidecar next to each file. Uses atomic
//! writes (temp + rename) so a crash never leaves partial content behind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::document::TagMap;
use crate::ports::{ObjectStore, ObjectStoreError, PutResult};

/// Suffix of the sidecar file carrying an object's metadata.
const META_SUFFIX: &str = ".meta.json";

/// Suffix of in-flight temp files, excluded from listings.
const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    tags: TagMap,
}

/// Filesystem-backed object store.
///
/// # Layout
///
/// ```text
/// {root}/
/// ├── raw/
/// │   └── abc123/
/// │       ├── original.pdf
/// │       └── original.pdf.meta.json
/// └── processed/
///     └── abc123/
///         └── v1/
///             ├── primary.md
///             └── primary.md.meta.json
/// ```
///
/// # Concurrency
///
/// `swap_tags` holds an in-process mutex across its read-compare-write
/// cycle, so conditional writes from tasks sharing this store are atomic.
pub struct FilesystemObjectStore {
    root: PathBuf,
    swap_lock: Mutex<()>,
}

impl FilesystemObjectStore {
    /// Creates a store rooted at `root`. The directory must already exist;
    /// a missing root surfaces as `ContainerNotFound` on first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            swap_lock: Mutex::new(()),
        }
    }

    fn content_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{META_SUFFIX}"))
    }

    fn compute_etag(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Maps an io error on `key` into the port's taxonomy.
    fn map_io(key: &str, operation: &str, err: std::io::Error) -> ObjectStoreError {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => ObjectStoreError::object_not_found(key),
            ErrorKind::PermissionDenied => ObjectStoreError::permission_denied(key),
            ErrorKind::Interrupted
            | ErrorKind::TimedOut
            | ErrorKind::ConnectionReset
            | ErrorKind::WouldBlock => ObjectStoreError::transient(operation, err.to_string()),
            _ => ObjectStoreError::permanent(operation, err.to_string()),
        }
    }

    async fn ensure_root(&self) -> Result<(), ObjectStoreError> {
        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(ObjectStoreError::container_not_found(
                self.root.to_string_lossy(),
            )),
        }
    }

    /// Writes bytes atomically: temp file in the target directory, fsync,
    /// rename into place.
    async fn write_atomic(
        path: &Path,
        bytes: &[u8],
        key: &str,
        operation: &str,
    ) -> Result<(), ObjectStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::map_io(key, operation, e))?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);
        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| Self::map_io(key, operation, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| Self::map_io(key, operation, e))?;
        file.sync_all()
            .await
            .map_err(|e| Self::map_io(key, operation, e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| Self::map_io(key, operation, e))
    }

    async fn read_sidecar(&self, key: &str) -> Result<Sidecar, ObjectStoreError> {
        let bytes = match fs::read(self.sidecar_path(key)).await {
            Ok(bytes) => bytes,
            // Content without a sidecar is an untagged object, not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return if self.content_exists(key).await? {
                    Ok(Sidecar::default())
                } else {
                    Err(ObjectStoreError::object_not_found(key))
                };
            }
            Err(e) => return Err(Self::map_io(key, "get_tags", e)),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| ObjectStoreError::permanent("get_tags", e.to_string()))
    }

    async fn write_sidecar(&self, key: &str, sidecar: &Sidecar) -> Result<(), ObjectStoreError> {
        let bytes = serde_json::to_vec_pretty(sidecar)
            .map_err(|e| ObjectStoreError::permanent("set_tags", e.to_string()))?;
        Self::write_atomic(&self.sidecar_path(key), &bytes, key, "set_tags").await
    }

    async fn content_exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        match fs::metadata(self.content_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io(key, "exists", e)),
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.ensure_root().await?;
        fs::read(self.content_path(key))
            .await
            .map_err(|e| Self::map_io(key, "get", e))
    }

    async fn put(
        &self,
        key: &str,
        content: &[u8],
        content_type: &str,
        tags: Option<&TagMap>,
    ) -> Result<PutResult, ObjectStoreError> {
        self.ensure_root().await?;
        Self::write_atomic(&self.content_path(key), content, key, "put").await?;
        let sidecar = Sidecar {
            content_type: content_type.to_string(),
            tags: tags.cloned().unwrap_or_default(),
        };
        self.write_sidecar(key, &sidecar).await?;
        Ok(PutResult {
            size: content.len() as u64,
            etag: Self::compute_etag(content),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        self.ensure_root().await?;
        self.content_exists(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.ensure_root().await?;
        for path in [self.content_path(key), self.sidecar_path(key)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Self::map_io(key, "delete", e)),
            }
        }
        Ok(())
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, ObjectStoreError> {
        self.ensure_root().await?;
        let mut keys = Vec::new();
        let mut pending = VecDeque::from([self.root.clone()]);
        while let Some(dir) = pending.pop_front() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ObjectStoreError::transient("list", e.to_string())),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| ObjectStoreError::transient("list", e.to_string()))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| ObjectStoreError::transient("list", e.to_string()))?;
                if file_type.is_dir() {
                    pending.push_back(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let key = relative.to_string_lossy().replace('\\', "/");
                if key.ends_with(META_SUFFIX)
                    || key.ends_with(TMP_SUFFIX)
                    || !key.starts_with(prefix)
                {
                    continue;
                }
                keys.push(key);
            }
        }
        keys.sort();
        keys.truncate(limit);
        Ok(keys)
    }

    async fn get_tags(&self, key: &str) -> Result<TagMap, ObjectStoreError> {
        self.ensure_root().await?;
        Ok(self.read_sidecar(key).await?.tags)
    }

    async fn set_tags(&self, key: &str, tags: &TagMap) -> Result<(), ObjectStoreError> {
        self.ensure_root().await?;
        if !self.content_exists(key).await? {
            return Err(ObjectStoreError::object_not_found(key));
        }
        let mut sidecar = self.read_sidecar(key).await?;
        sidecar.tags = tags.clone();
        self.write_sidecar(key, &sidecar).await
    }

    async fn swap_tags(
        &self,
        key: &str,
        expected: &TagMap,
        next: &TagMap,
    ) -> Result<(), ObjectStoreError> {
        self.ensure_root().await?;
        let _guard = self.swap_lock.lock().await;
        let mut sidecar = self.read_sidecar(key).await?;
        if &sidecar.tags != expected {
            return Err(ObjectStoreError::precondition_failed(key));
        }
        sidecar.tags = next.clone();
        self.write_sidecar(key, &sidecar).await
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════════
