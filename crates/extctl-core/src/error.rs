//! Error types for extctl-core

use thiserror::Error;

/// Result type alias using extctl-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for extctl
#[derive(Error, Debug)]
pub enum Error {
    /// Extension identifier rejected
    #[error("Invalid extension id '{id}': {reason}")]
    InvalidExtensionId { id: String, reason: String },

    /// Settings file could not be parsed
    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig { path: String, message: String },

    /// No usable data directory could be determined
    #[error("Could not determine a data directory; set EXTCTL_DATA_DIR or pass --data-dir")]
    NoDataDir,

    /// Path is not valid UTF-8
    #[error("Path is not valid UTF-8: {path}")]
    NonUtf8Path { path: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid extension id error
    pub fn invalid_extension_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExtensionId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a non-UTF-8 path error
    pub fn non_utf8_path(path: impl Into<String>) -> Self {
        Self::NonUtf8Path { path: path.into() }
    }
}
