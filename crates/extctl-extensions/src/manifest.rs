//! Extension manifest resolution
//!
//! Each extension ships a `manifest.json` at its root. The resolver reads it
//! for display purposes only; nothing in install/remove/reconcile depends on
//! it succeeding.

use extctl_core::ExtensionId;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ManifestError;

/// Manifest file name at the root of every extension
pub const MANIFEST_FILE: &str = "manifest.json";

/// Extension API version implemented by the host launcher
pub const HOST_API_VERSION: &str = "2.0.0";

/// Parsed `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub developer_name: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    /// Semver requirement on the host API, e.g. `"^2"`
    #[serde(default)]
    pub required_api_version: Option<String>,
}

impl ExtensionManifest {
    /// Load and validate `manifest.json` from an extension directory
    pub fn load_from_dir(dir: &Path, id: &str) -> Result<Self, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::not_found(id));
            }
            Err(e) => return Err(ManifestError::malformed(id, e.to_string())),
        };

        let manifest: ExtensionManifest = serde_json::from_str(&content)
            .map_err(|e| ManifestError::malformed(id, e.to_string()))?;

        if manifest.name.trim().is_empty() {
            return Err(ManifestError::malformed(id, "'name' must not be empty"));
        }

        if let Some(req) = &manifest.required_api_version {
            VersionReq::parse(req).map_err(|e| {
                ManifestError::malformed(id, format!("invalid required_api_version '{req}': {e}"))
            })?;
        }

        Ok(manifest)
    }

    /// Whether this extension can run against the host API
    ///
    /// Manifests without a requirement are treated as compatible.
    pub fn is_api_compatible(&self) -> bool {
        let Some(req) = &self.required_api_version else {
            return true;
        };
        match (VersionReq::parse(req), Version::parse(HOST_API_VERSION)) {
            (Ok(req), Ok(host)) => req.matches(&host),
            _ => false,
        }
    }
}

/// Produces display metadata for an extension id
pub trait ManifestResolver {
    fn resolve(&self, id: &ExtensionId) -> Result<ExtensionManifest, ManifestError>;
}

/// Resolves manifests from `<extensions_dir>/<id>/manifest.json`
#[derive(Debug, Clone)]
pub struct DirManifestResolver {
    extensions_dir: PathBuf,
}

impl DirManifestResolver {
    pub fn new(extensions_dir: impl Into<PathBuf>) -> Self {
        Self {
            extensions_dir: extensions_dir.into(),
        }
    }
}

impl ManifestResolver for DirManifestResolver {
    fn resolve(&self, id: &ExtensionId) -> Result<ExtensionManifest, ManifestError> {
        ExtensionManifest::load_from_dir(&self.extensions_dir.join(id.as_str()), id.as_str())
    }
}

/// Human-readable name for `id`, falling back to the id itself
pub fn display_name(resolver: &dyn ManifestResolver, id: &ExtensionId) -> String {
    match resolver.resolve(id) {
        Ok(manifest) => manifest.name,
        Err(e) => {
            debug!("Showing raw id for {}: {}", id, e);
            id.to_string()
        }
    }
}
