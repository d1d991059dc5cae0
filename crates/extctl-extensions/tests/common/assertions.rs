//! Assertion helpers for on-disk extension state

#![allow(dead_code)]

use extctl_extensions::manifest::MANIFEST_FILE;
use std::path::Path;

use super::fixtures::TestEnv;

/// Assert that an extension's files are in place
pub fn assert_files_present(env: &TestEnv, id: &str) {
    let manifest = env.extension_path(id).join(MANIFEST_FILE);
    assert!(manifest.exists(), "Expected files of '{}' at {:?}", id, manifest);
}

/// Assert that an extension's directory is gone
pub fn assert_files_absent(env: &TestEnv, id: &str) {
    let dir = env.extension_path(id);
    assert!(!dir.exists(), "Expected '{}' to be absent, found {:?}", id, dir);
}

/// Assert that no staging, trash or journal leftovers remain
pub fn assert_no_scratch(env: &TestEnv) {
    for scratch in [".staging", ".trash"] {
        let path = env.extensions_dir().join(scratch);
        assert!(
            !path.exists() || is_empty_dir(&path),
            "Leftover scratch directory {:?}",
            path
        );
    }
    let journal = env.extensions_dir().join(".journal");
    assert!(
        !journal.exists() || is_empty_dir(&journal),
        "Leftover journal markers in {:?}",
        journal
    );
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
