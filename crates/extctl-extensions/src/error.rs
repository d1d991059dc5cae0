//! Error types for extctl-extensions
//!
//! Expected domain conditions (`AlreadyInstalled`, `NotInstalled`,
//! `InvalidSource`, manifest lookups) are distinct variants so callers can
//! branch on them. Store corruption is a precondition violation and is fatal.

use extctl_core::ExtensionId;
use std::path::PathBuf;
use thiserror::Error;

/// Record store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The persisted document could not be parsed
    #[error("Record store {path} is corrupted: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document was written by an incompatible version
    #[error("Record store {path} has unsupported schema version {version}")]
    UnsupportedSchema { path: PathBuf, version: String },

    /// IO error while reading, locking or writing the store
    #[error("Record store IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization of the document failed
    #[error("Failed to serialize record store: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Manifest resolution errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// No manifest.json for the extension
    #[error("No manifest found for extension '{id}'")]
    NotFound { id: String },

    /// manifest.json exists but is unusable
    #[error("Malformed manifest for extension '{id}': {reason}")]
    Malformed { id: String, reason: String },
}

impl ManifestError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Fetcher errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// The fetch program could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The fetch program ran and failed
    #[error("{program} {operation} failed: {stderr}")]
    Failed {
        program: String,
        operation: String,
        stderr: String,
    },

    /// The remote does not have the requested reference
    #[error("Reference '{reference}' not found at {url}")]
    RefNotFound { url: String, reference: String },
}

impl FetchError {
    pub fn failed(
        program: impl Into<String>,
        operation: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Failed {
            program: program.into(),
            operation: operation.into(),
            stderr: stderr.into(),
        }
    }
}

/// Transfer engine errors
#[derive(Error, Debug)]
pub enum TransferError {
    /// The id is already in the record store
    #[error("Extension '{id}' is already installed")]
    AlreadyInstalled { id: ExtensionId },

    /// The id is not in the record store
    #[error("Extension '{id}' is not installed")]
    NotInstalled { id: String },

    /// The source cannot be resolved to a valid extension
    #[error("Invalid extension source '{source_ref}': {reason}")]
    InvalidSource { source_ref: String, reason: String },

    /// Fetching the extension failed
    #[error("Failed to fetch extension '{id}': {source}")]
    Fetch {
        id: ExtensionId,
        #[source]
        source: FetchError,
    },

    /// Filesystem failure while materialising or deleting files
    #[error("Filesystem error for extension '{id}' at {path}: {source}")]
    Io {
        id: ExtensionId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The write-ahead journal could not be read or written
    #[error("Journal error at {path}: {source}")]
    Journal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record store could not be updated
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransferError {
    pub fn already_installed(id: ExtensionId) -> Self {
        Self::AlreadyInstalled { id }
    }

    pub fn not_installed(id: impl Into<String>) -> Self {
        Self::NotInstalled { id: id.into() }
    }

    pub fn invalid_source(source_ref: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            source_ref: source_ref.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(id: &ExtensionId, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            id: id.clone(),
            path: path.into(),
            source,
        }
    }

    pub(crate) fn journal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Journal {
            path: path.into(),
            source,
        }
    }

    /// True for expected domain conditions rather than operational failures
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::AlreadyInstalled { .. } | Self::NotInstalled { .. } | Self::InvalidSource { .. }
        )
    }
}

/// Reconciliation precondition violations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    /// The plan would both remove and install the same ids
    #[error("Invalid reconciliation plan: {ids:?} scheduled for both removal and install")]
    InvalidPlan { ids: Vec<String> },
}
