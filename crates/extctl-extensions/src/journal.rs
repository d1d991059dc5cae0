//! Write-ahead markers for transfer operations
//!
//! Before the engine touches an extension's files it records what it is
//! about to do in `<extensions_dir>/.journal/<id>.json`. The marker is
//! cleared only after the record store has been committed, so a marker
//! left behind means the process died between the two effects. The engine
//! replays leftovers on start (see `TransferEngine::recover`).

use chrono::{DateTime, Utc};
use extctl_core::ExtensionId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Journal directory name inside the extensions directory
pub const JOURNAL_DIR: &str = ".journal";

/// Operation a marker guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalOperation {
    Install,
    Remove,
    Upgrade,
}

/// One pending operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: ExtensionId,
    pub operation: JournalOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(id: ExtensionId, operation: JournalOperation, url: Option<String>) -> Self {
        Self {
            id,
            operation,
            url,
            started_at: Utc::now(),
        }
    }
}

/// Directory of pending-operation markers
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(extensions_dir: &Path) -> Self {
        Self {
            dir: extensions_dir.join(JOURNAL_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn marker_path(&self, id: &ExtensionId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Durably record the start of an operation
    pub fn begin(&self, entry: &JournalEntry) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let content = serde_json::to_vec_pretty(entry).map_err(io::Error::other)?;
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(&content)?;
        temp.as_file().sync_all()?;
        temp.persist(self.marker_path(&entry.id)).map_err(|e| e.error)?;

        debug!("Journal: begin {:?} {}", entry.operation, entry.id);
        Ok(())
    }

    /// Clear the marker for `id`
    pub fn complete(&self, id: &ExtensionId) -> io::Result<()> {
        match fs::remove_file(self.marker_path(id)) {
            Ok(()) => {
                debug!("Journal: complete {}", id);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Whether any marker is present, checked without modifying anything
    pub fn has_pending(&self) -> bool {
        fs::read_dir(&self.dir)
            .map(|mut entries| {
                entries.any(|entry| {
                    entry.is_ok_and(|e| {
                        e.path().extension().and_then(|ext| ext.to_str()) == Some("json")
                    })
                })
            })
            .unwrap_or(false)
    }

    /// Markers left behind by interrupted operations
    ///
    /// Unreadable markers are discarded with a warning.
    pub fn pending(&self) -> io::Result<Vec<JournalEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let parsed = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<JournalEntry>(&bytes).map_err(|e| e.to_string())
                });

            match parsed {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Discarding unreadable journal marker {:?}: {}", path, e);
                    let _ = fs::remove_file(&path);
                }
            }
        }

        entries.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> ExtensionId {
        ExtensionId::new(s).unwrap()
    }

    #[test]
    fn test_begin_and_complete() {
        let temp = TempDir::new().unwrap();
        let journal = Journal::new(temp.path());

        let entry = JournalEntry::new(
            id("com.github.a.b"),
            JournalOperation::Install,
            Some("https://github.com/a/b".into()),
        );
        journal.begin(&entry).unwrap();

        assert!(journal.has_pending());
        let pending = journal.pending().unwrap();
        assert_eq!(pending, vec![entry]);

        journal.complete(&id("com.github.a.b")).unwrap();
        assert!(journal.pending().unwrap().is_empty());
        assert!(!journal.has_pending());
    }

    #[test]
    fn test_begin_leaves_only_the_marker() {
        let temp = TempDir::new().unwrap();
        let journal = Journal::new(temp.path());

        journal
            .begin(&JournalEntry::new(id("a"), JournalOperation::Remove, None))
            .unwrap();
        journal
            .begin(&JournalEntry::new(id("a"), JournalOperation::Install, None))
            .unwrap();

        let names: Vec<String> = fs::read_dir(journal.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.json"]);
        assert_eq!(
            journal.pending().unwrap()[0].operation,
            JournalOperation::Install
        );
    }

    #[test]
    fn test_complete_without_marker_is_ok() {
        let temp = TempDir::new().unwrap();
        Journal::new(temp.path()).complete(&id("x")).unwrap();
    }

    #[test]
    fn test_missing_journal_dir_has_nothing_pending() {
        let temp = TempDir::new().unwrap();
        let journal = Journal::new(temp.path());
        assert!(journal.pending().unwrap().is_empty());
        assert!(!journal.has_pending());
        assert!(!journal.dir().exists());
    }

    #[test]
    fn test_unreadable_marker_is_discarded() {
        let temp = TempDir::new().unwrap();
        let journal_dir = temp.path().join(JOURNAL_DIR);
        fs::create_dir_all(&journal_dir).unwrap();
        fs::write(journal_dir.join("broken.json"), "{").unwrap();

        let journal = Journal::new(temp.path());
        assert!(journal.pending().unwrap().is_empty());
        assert!(!journal_dir.join("broken.json").exists());
    }
}
