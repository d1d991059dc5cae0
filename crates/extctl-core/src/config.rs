//! Per-invocation configuration
//!
//! A `Context` is built once when a command starts and passed by reference
//! to everything that needs paths or settings. Resolution order:
//!
//! 1. `--data-dir` / `EXTCTL_DATA_DIR`
//! 2. platform data directory (`directories::ProjectDirs`)
//! 3. `~/.extctl`
//!
//! An optional `config.yaml` in the data directory can relocate the
//! extensions directory and tune the git fetcher:
//!
//! ```yaml
//! extensions_dir: /srv/launcher/extensions
//! git: /usr/bin/git
//! clone_depth: 1
//! ```

use crate::error::{Error, Result};
use crate::utils::get_home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "EXTCTL_DATA_DIR";

/// Settings file name inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Record store file name inside the data directory
pub const STORE_FILE_NAME: &str = "extensions.json";

/// Extensions directory name inside the data directory
pub const EXTENSIONS_DIR_NAME: &str = "extensions";

/// Optional user settings loaded from `config.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Override for the directory extensions are materialised into
    pub extensions_dir: Option<Utf8PathBuf>,

    /// git executable used by the fetcher
    pub git: String,

    /// Shallow clone depth (`None` for a full clone)
    pub clone_depth: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extensions_dir: None,
            git: "git".to_string(),
            clone_depth: Some(1),
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Settings = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(path.as_str(), e.to_string()))?;

        if settings.git.trim().is_empty() {
            return Err(Error::invalid_config(path.as_str(), "'git' must not be empty"));
        }

        debug!("Loaded settings from {}", path);
        Ok(settings)
    }
}

/// Filesystem locations used by one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub data_dir: Utf8PathBuf,
    pub extensions_dir: Utf8PathBuf,
    pub store_path: Utf8PathBuf,
    pub config_path: Utf8PathBuf,
}

impl Paths {
    /// Lay out all paths beneath a data directory
    pub fn from_data_dir(data_dir: impl Into<Utf8PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            extensions_dir: data_dir.join(EXTENSIONS_DIR_NAME),
            store_path: data_dir.join(STORE_FILE_NAME),
            config_path: data_dir.join(CONFIG_FILE_NAME),
            data_dir,
        }
    }

    /// Determine the default data directory for this platform
    pub fn default_data_dir() -> Result<Utf8PathBuf> {
        let dir = match ProjectDirs::from("", "", "extctl") {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => get_home_dir()?.join(".extctl"),
        };

        Utf8PathBuf::from_path_buf(dir)
            .map_err(|p| Error::non_utf8_path(p.to_string_lossy().to_string()))
    }
}

/// Explicit per-command context
#[derive(Debug, Clone)]
pub struct Context {
    /// Version of the running tool
    pub version: String,
    pub paths: Paths,
    pub settings: Settings,
}

impl Context {
    /// Build the context, honouring an explicit data directory if given
    pub fn new(data_dir: Option<Utf8PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => Paths::default_data_dir()?,
        };
        Self::with_data_dir(data_dir)
    }

    /// Build the context rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<Utf8PathBuf>) -> Result<Self> {
        let mut paths = Paths::from_data_dir(data_dir);
        let settings = Settings::load(&paths.config_path)?;

        if let Some(dir) = &settings.extensions_dir {
            paths.extensions_dir = if dir.is_absolute() {
                dir.clone()
            } else {
                paths.data_dir.join(dir)
            };
        }

        debug!(
            "Using data dir {} (extensions in {})",
            paths.data_dir, paths.extensions_dir
        );

        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            paths,
            settings,
        })
    }
}
