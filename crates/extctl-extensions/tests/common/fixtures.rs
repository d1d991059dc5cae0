//! Test environment fixtures

#![allow(dead_code)]

use extctl_extensions::manifest::MANIFEST_FILE;
use extctl_extensions::{ExtensionId, RecordStore, TransferEngine};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use super::mocks::FakeFetcher;

/// Temporary data directory laid out like a real installation
pub struct TestEnv {
    pub temp: TempDir,
    pub fetcher: FakeFetcher,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
            fetcher: FakeFetcher::new(),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.temp.path().join("extensions.json")
    }

    pub fn extensions_dir(&self) -> PathBuf {
        self.temp.path().join("extensions")
    }

    pub fn extension_path(&self, id: &str) -> PathBuf {
        self.extensions_dir().join(id)
    }

    /// Engine over this environment sharing the environment's fetcher
    ///
    /// The store lock is held until the engine is dropped.
    pub fn engine(&self) -> TransferEngine<FakeFetcher> {
        let store = RecordStore::open(self.store_path()).unwrap();
        TransferEngine::new(store, self.extensions_dir(), self.fetcher.clone()).unwrap()
    }

    /// Create an extension directory that has no record
    pub fn add_untracked(&self, id: &str, name: &str) {
        let dir = self.extension_path(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            format!(r#"{{"name":"{name}"}}"#),
        )
        .unwrap();
    }

    /// Delete an extension's files behind the engine's back
    pub fn delete_files(&self, id: &str) {
        fs::remove_dir_all(self.extension_path(id)).unwrap();
    }

    pub fn installed(&self) -> BTreeSet<ExtensionId> {
        extctl_extensions::installed_ids(&self.extensions_dir()).unwrap()
    }
}

pub fn id(s: &str) -> ExtensionId {
    ExtensionId::new(s).unwrap()
}

pub fn ids(list: &[&str]) -> BTreeSet<ExtensionId> {
    list.iter().map(|s| id(s)).collect()
}
