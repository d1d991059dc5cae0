//! Extension record store
//!
//! The single source of truth for which extensions *should* be installed.
//! Located at `<data_dir>/extensions.json`:
//!
//! ```json
//! {
//!   "schema_version": "1.0",
//!   "last_updated": "2026-01-21T10:00:00Z",
//!   "extensions": {
//!     "com.github.user.timer": {
//!       "url": "https://github.com/user/timer",
//!       "commit": "4f1c2e0",
//!       "installed_at": "2026-01-20T15:30:00Z",
//!       "updated_at": "2026-01-20T15:30:00Z"
//!     }
//!   }
//! }
//! ```
//!
//! The whole document is loaded on open and rewritten atomically after
//! every mutation. An exclusive lock on `extensions.json.lock` is held for
//! the lifetime of the store.

use chrono::Utc;
use extctl_core::ExtensionId;
use fs4::fs_std::FileExt;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::{ExtensionRecord, StoreDocument, STORE_SCHEMA_VERSION};

/// Persisted mapping from extension id to its declared source
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    document: StoreDocument,
    // Held for the lifetime of the store; released on drop
    _lock: File,
}

impl RecordStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// A missing file is an empty store and is not written until the first
    /// mutation. Unparseable content is reported as `StoreError::Corrupt`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        debug!("Opening record store at {:?}", path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let lock_path = Self::lock_path(&path);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StoreError::io(&lock_path, e))?;
        FileExt::lock_exclusive(&lock).map_err(|e| StoreError::io(&lock_path, e))?;

        let document = Self::load_document(&path)?;
        debug!("Loaded {} declared extensions", document.extensions.len());

        Ok(Self {
            path,
            document,
            _lock: lock,
        })
    }

    /// The declared set at `path`, read without locking or creating anything
    ///
    /// Used to decide whether there is work to do before committing to a
    /// locked, writable store.
    pub fn read_declared(path: impl AsRef<Path>) -> Result<BTreeSet<ExtensionId>, StoreError> {
        let document = Self::load_document(path.as_ref())?;
        Ok(document.extensions.into_keys().collect())
    }

    fn lock_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        path.with_file_name(name)
    }

    fn load_document(path: &Path) -> Result<StoreDocument, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreDocument::default());
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        if content.trim().is_empty() {
            return Ok(StoreDocument::default());
        }

        let document: StoreDocument =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let major = document.schema_version.split('.').next().unwrap_or_default();
        let supported = STORE_SCHEMA_VERSION.split('.').next().unwrap_or_default();
        if major != supported {
            return Err(StoreError::UnsupportedSchema {
                path: path.to_path_buf(),
                version: document.schema_version,
            });
        }

        Ok(document)
    }

    /// Rewrite the document: temp file in the same directory, fsync, rename
    fn save(&mut self) -> Result<(), StoreError> {
        self.document.last_updated = Utc::now();
        let content = serde_json::to_string_pretty(&self.document)?;

        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
        temp.write_all(content.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| StoreError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        debug!(
            "Saved record store with {} extensions",
            self.document.extensions.len()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &ExtensionId) -> bool {
        self.document.extensions.contains_key(id)
    }

    pub fn get(&self, id: &ExtensionId) -> Option<&ExtensionRecord> {
        self.document.extensions.get(id)
    }

    /// The declared set
    pub fn ids(&self) -> BTreeSet<ExtensionId> {
        self.document.extensions.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExtensionId, &ExtensionRecord)> {
        self.document.extensions.iter()
    }

    pub fn len(&self) -> usize {
        self.document.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.extensions.is_empty()
    }

    /// Record an extension and commit to disk
    pub(crate) fn insert(
        &mut self,
        id: ExtensionId,
        record: ExtensionRecord,
    ) -> Result<(), StoreError> {
        info!("Recording {} ({})", id, record.url);
        let previous = self.document.extensions.insert(id.clone(), record);

        if let Err(e) = self.save() {
            // Keep memory in step with disk
            match previous {
                Some(previous) => self.document.extensions.insert(id, previous),
                None => self.document.extensions.remove(&id),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Drop an extension's record and commit; returns the removed record
    pub(crate) fn remove(
        &mut self,
        id: &ExtensionId,
    ) -> Result<Option<ExtensionRecord>, StoreError> {
        let Some(record) = self.document.extensions.remove(id) else {
            return Ok(None);
        };
        info!("Removing {} from record store", id);

        if let Err(e) = self.save() {
            self.document.extensions.insert(id.clone(), record);
            return Err(e);
        }
        Ok(Some(record))
    }

    /// Update the fetched commit of a declared extension and commit
    pub(crate) fn touch_commit(
        &mut self,
        id: &ExtensionId,
        commit: Option<String>,
    ) -> Result<bool, StoreError> {
        let Some(record) = self.document.extensions.get_mut(id) else {
            return Ok(false);
        };
        let previous = record.clone();
        record.commit = commit;
        record.updated_at = Utc::now();

        if let Err(e) = self.save() {
            self.document.extensions.insert(id.clone(), previous);
            return Err(e);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> ExtensionId {
        ExtensionId::new(s).unwrap()
    }

    fn record(url: &str) -> ExtensionRecord {
        ExtensionRecord::new(url, None, Some("abc123".to_string()))
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("extensions.json");

        let store = RecordStore::open(&store_path).unwrap();
        assert!(store.is_empty());
        assert!(!store_path.exists());
    }

    #[test]
    fn test_read_declared_leaves_disk_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("data").join("extensions.json");

        assert!(RecordStore::read_declared(&store_path).unwrap().is_empty());
        assert!(!temp_dir.path().join("data").exists());

        {
            let mut store = RecordStore::open(&store_path).unwrap();
            store.insert(id("b"), record("https://x/b")).unwrap();
            store.insert(id("a"), record("https://x/a")).unwrap();
        }
        let declared: Vec<String> = RecordStore::read_declared(&store_path)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(declared, ["a", "b"]);
    }

    #[test]
    fn test_insert_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("extensions.json");

        {
            let mut store = RecordStore::open(&store_path).unwrap();
            store
                .insert(id("com.github.user.timer"), record("https://github.com/user/timer"))
                .unwrap();
        }

        let store = RecordStore::open(&store_path).unwrap();
        assert_eq!(store.len(), 1);
        let rec = store.get(&id("com.github.user.timer")).unwrap();
        assert_eq!(rec.url, "https://github.com/user/timer");
        assert_eq!(rec.commit.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_insert_same_id_does_not_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = RecordStore::open(temp_dir.path().join("extensions.json")).unwrap();

        store.insert(id("a"), record("https://x/a")).unwrap();
        store.insert(id("a"), record("https://x/a")).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("extensions.json");
        let mut store = RecordStore::open(&store_path).unwrap();

        store.insert(id("a"), record("https://x/a")).unwrap();
        let removed = store.remove(&id("a")).unwrap();
        assert!(removed.is_some());
        assert!(store.remove(&id("a")).unwrap().is_none());
        drop(store);

        assert!(RecordStore::open(&store_path).unwrap().is_empty());
    }

    #[test]
    fn test_touch_commit() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = RecordStore::open(temp_dir.path().join("extensions.json")).unwrap();

        store.insert(id("a"), record("https://x/a")).unwrap();
        assert!(store.touch_commit(&id("a"), Some("def456".into())).unwrap());
        assert_eq!(store.get(&id("a")).unwrap().commit.as_deref(), Some("def456"));
        assert!(!store.touch_commit(&id("missing"), None).unwrap());
    }

    #[test]
    fn test_ids_are_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = RecordStore::open(temp_dir.path().join("extensions.json")).unwrap();

        store.insert(id("b"), record("https://x/b")).unwrap();
        store.insert(id("a"), record("https://x/a")).unwrap();
        let ids: Vec<String> = store.ids().into_iter().map(String::from).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_corrupt_store_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("extensions.json");
        fs::write(&store_path, "{ not json").unwrap();

        let err = RecordStore::open(&store_path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_invalid_id_key_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("extensions.json");
        fs::write(
            &store_path,
            r#"{"schema_version":"1.0","last_updated":"2026-01-01T00:00:00Z",
               "extensions":{"":{"url":"u","installed_at":"2026-01-01T00:00:00Z",
               "updated_at":"2026-01-01T00:00:00Z"}}}"#,
        )
        .unwrap();

        assert!(matches!(
            RecordStore::open(&store_path).unwrap_err(),
            StoreError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_unsupported_schema() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("extensions.json");
        fs::write(
            &store_path,
            r#"{"schema_version":"2.0","last_updated":"2026-01-01T00:00:00Z","extensions":{}}"#,
        )
        .unwrap();

        assert!(matches!(
            RecordStore::open(&store_path).unwrap_err(),
            StoreError::UnsupportedSchema { .. }
        ));
    }
}
