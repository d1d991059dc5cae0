//! Data types shared by the store, scanner and engine

use chrono::{DateTime, Utc};
use extctl_core::ExtensionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::manifest::ExtensionManifest;

/// Schema version written into new store documents
pub const STORE_SCHEMA_VERSION: &str = "1.0";

/// Declared extension: what should be installed and where it comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    /// Source reference the extension was installed from
    pub url: String,

    /// Branch or tag, if the source pinned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Commit the materialised files were fetched at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    pub installed_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ExtensionRecord {
    pub fn new(url: impl Into<String>, git_ref: Option<String>, commit: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            url: url.into(),
            git_ref,
            commit,
            installed_at: now,
            updated_at: now,
        }
    }
}

/// Persisted record store document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub schema_version: String,

    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub extensions: BTreeMap<ExtensionId, ExtensionRecord>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            schema_version: STORE_SCHEMA_VERSION.to_string(),
            last_updated: Utc::now(),
            extensions: BTreeMap::new(),
        }
    }
}

/// Extension found on disk by the scanner
#[derive(Debug, Clone)]
pub struct InstalledExtension {
    pub id: ExtensionId,
    pub path: PathBuf,
    /// Best-effort manifest; `None` when missing or malformed
    pub manifest: Option<ExtensionManifest>,
}
