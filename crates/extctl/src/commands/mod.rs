//! Command implementations
//!
//! - show: list declared and installed extensions
//! - install: install from a source reference
//! - uninstall: remove a declared extension
//! - upgrade: refresh one or all extensions
//! - restore: reconcile installed extensions with the record store
//! - version: build information

pub mod install;
pub mod restore;
pub mod show;
pub mod uninstall;
pub mod upgrade;
pub mod version;

use anyhow::{Context as _, Result};
use extctl_core::{Context, ExtensionId};
use extctl_extensions::{GitFetcher, RecordStore, TransferEngine, TransferError};
use tracing::debug;

use crate::output;

/// Open the record store and build an engine over the configured paths
///
/// Interrupted operations from an earlier run are converged here and
/// reported as warnings.
pub(crate) fn open_engine(ctx: &Context) -> Result<TransferEngine<GitFetcher>> {
    let store = open_store(ctx)?;
    debug!(
        "Opened record store with {} declared extensions",
        store.len()
    );
    let fetcher = GitFetcher::new(ctx.settings.git.as_str(), ctx.settings.clone_depth);
    let engine = TransferEngine::new(store, ctx.paths.extensions_dir.as_std_path(), fetcher)?;

    for action in engine.recovered() {
        output::warning(&format!("Recovered interrupted operation: {}", action));
    }
    Ok(engine)
}

pub(crate) fn open_store(ctx: &Context) -> Result<RecordStore> {
    RecordStore::open(ctx.paths.store_path.as_std_path())
        .with_context(|| format!("Failed to open record store {}", ctx.paths.store_path))
}

/// Parse a user-supplied id
///
/// A string that cannot be an id cannot have been installed either.
pub(crate) fn parse_id(id: &str) -> Result<ExtensionId, TransferError> {
    ExtensionId::new(id).map_err(|_| TransferError::not_installed(id))
}
