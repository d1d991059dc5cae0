//! Installed-set scanner
//!
//! Installed state is whatever is on disk: every visible directory directly
//! under the extensions directory whose name is a valid id, including
//! symlinks to directories. Hidden entries (staging, trash, journal), plain
//! files and dangling links are skipped.

use extctl_core::ExtensionId;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::manifest::ExtensionManifest;
use crate::types::InstalledExtension;

/// Walk `root` and report the extensions present, sorted by id
pub fn scan(root: &Path) -> std::io::Result<Vec<InstalledExtension>> {
    if !root.exists() {
        debug!("Extensions directory {:?} does not exist yet", root);
        return Ok(Vec::new());
    }

    let mut found = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"))
        })?;

        // Linked extension directories count as installed
        let is_dir = entry.file_type().is_dir()
            || (entry.path_is_symlink() && entry.path().is_dir());
        if !is_dir {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            warn!("Skipping non UTF-8 entry {:?}", entry.path());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        let id = match ExtensionId::new(name) {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping {:?}: {}", entry.path(), e);
                continue;
            }
        };

        let manifest = ExtensionManifest::load_from_dir(entry.path(), name).ok();
        found.push(InstalledExtension {
            id,
            path: entry.path().to_path_buf(),
            manifest,
        });
    }

    debug!("Found {} installed extensions in {:?}", found.len(), root);
    Ok(found)
}

/// The installed set as ids only
pub fn installed_ids(root: &Path) -> std::io::Result<BTreeSet<ExtensionId>> {
    Ok(scan(root)?.into_iter().map(|ext| ext.id).collect())
}
