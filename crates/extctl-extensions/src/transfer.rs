//! Transfer engine
//!
//! Owns every mutation of installed files and of the record store. All
//! operations follow the same shape:
//!
//! 1. Check the record store (domain errors are raised before any IO)
//! 2. Fetch into `<extensions_dir>/.staging/<id>` and validate the manifest
//! 3. Write a journal marker
//! 4. Move directories into place (old trees go through `.trash/<id>`)
//! 5. Commit the record store
//! 6. Clear the marker
//!
//! A marker left behind by a crash is converged by [`TransferEngine::recover`]
//! when the next engine is created.

use extctl_core::ExtensionId;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::TransferError;
use crate::fetch::Fetcher;
use crate::journal::{Journal, JournalEntry, JournalOperation};
use crate::manifest::ExtensionManifest;
use crate::reconcile::PlanExecutor;
use crate::source::ExtensionSource;
use crate::store::RecordStore;
use crate::types::ExtensionRecord;

/// Fetched trees land here before being moved into place
pub const STAGING_DIR: &str = ".staging";

/// Trees being replaced or deleted are parked here
pub const TRASH_DIR: &str = ".trash";

/// What recovery did for one interrupted operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Files of an uncommitted install were deleted
    RolledBack(ExtensionId),
    /// The record was committed; files kept as they are
    Kept(ExtensionId),
    /// The previous tree was moved back from the trash
    Restored(ExtensionId),
    /// An interrupted removal was completed
    RolledForward(ExtensionId),
}

impl RecoveryAction {
    pub fn id(&self) -> &ExtensionId {
        match self {
            Self::RolledBack(id) | Self::Kept(id) | Self::Restored(id) | Self::RolledForward(id) => {
                id
            }
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RolledBack(id) => write!(f, "rolled back uncommitted install of {id}"),
            Self::Kept(id) => write!(f, "kept committed files of {id}"),
            Self::Restored(id) => write!(f, "restored previous files of {id}"),
            Self::RolledForward(id) => write!(f, "completed removal of {id}"),
        }
    }
}

/// Installs, removes and upgrades extensions
pub struct TransferEngine<F: Fetcher> {
    store: RecordStore,
    extensions_dir: PathBuf,
    fetcher: F,
    journal: Journal,
    recovered: Vec<RecoveryAction>,
}

impl<F: Fetcher> TransferEngine<F> {
    /// Create an engine and converge any interrupted operations
    pub fn new(
        store: RecordStore,
        extensions_dir: impl Into<PathBuf>,
        fetcher: F,
    ) -> Result<Self, TransferError> {
        let extensions_dir = extensions_dir.into();
        fs::create_dir_all(&extensions_dir)
            .map_err(|e| TransferError::journal(&extensions_dir, e))?;

        let mut engine = Self {
            store,
            journal: Journal::new(&extensions_dir),
            extensions_dir,
            fetcher,
            recovered: Vec::new(),
        };
        engine.recovered = engine.recover()?;
        Ok(engine)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn extensions_dir(&self) -> &Path {
        &self.extensions_dir
    }

    /// Actions taken by recovery when this engine was created
    pub fn recovered(&self) -> &[RecoveryAction] {
        &self.recovered
    }

    /// Where an extension's files live
    pub fn extension_path(&self, id: &ExtensionId) -> PathBuf {
        self.extensions_dir.join(id.as_str())
    }

    fn staging_path(&self, id: &ExtensionId) -> PathBuf {
        self.extensions_dir.join(STAGING_DIR).join(id.as_str())
    }

    fn trash_path(&self, id: &ExtensionId) -> PathBuf {
        self.extensions_dir.join(TRASH_DIR).join(id.as_str())
    }

    /// Install an extension from a source reference
    pub fn install(&mut self, source: &str) -> Result<ExtensionId, TransferError> {
        let source = ExtensionSource::parse(source)?;
        let id = source.id().clone();

        if self.store.contains(&id) {
            return Err(TransferError::already_installed(id));
        }

        info!("Installing {} from {}", id, source);
        let (staged, commit) = self.stage(&source, &id)?;
        let entry = JournalEntry::new(id.clone(), JournalOperation::Install, Some(source.to_string()));
        self.begin(&entry)?;

        let target = self.extension_path(&id);
        let record = ExtensionRecord::new(
            source.url(),
            source.git_ref().map(str::to_string),
            Some(commit),
        );

        let committed = self.place_new(&id, &staged, &target).and_then(|_| {
            self.store
                .insert(id.clone(), record)
                .map_err(TransferError::from)
        });

        if let Err(e) = committed {
            warn!("Install of {} failed, rolling back: {}", id, e);
            let _ = remove_dir_if_exists(&staged);
            let _ = remove_dir_if_exists(&target);
            let _ = self.journal.complete(&id);
            return Err(e);
        }

        self.complete(&id)?;
        info!("Installed {}", id);
        Ok(id)
    }

    /// Uninstall a recorded extension
    ///
    /// Raises `NotInstalled` before touching the filesystem when `id` has no
    /// record.
    pub fn remove(&mut self, id: &ExtensionId) -> Result<(), TransferError> {
        if !self.store.contains(id) {
            return Err(TransferError::not_installed(id.as_str()));
        }

        info!("Removing {}", id);
        self.begin(&JournalEntry::new(id.clone(), JournalOperation::Remove, None))?;

        let target = self.extension_path(id);
        let trash = self.trash_path(id);
        self.park(id, &target, &trash)?;

        if let Err(e) = self.store.remove(id) {
            warn!("Failed to un-record {}, restoring files: {}", id, e);
            self.unpark(id, &target, &trash);
            return Err(e.into());
        }

        remove_dir_if_exists(&trash).map_err(|e| TransferError::io(id, &trash, e))?;
        self.complete(id)?;
        info!("Removed {}", id);
        Ok(())
    }

    /// Bring a recorded extension to the latest commit of its source
    ///
    /// Returns `Ok(false)` when it is already up to date.
    pub fn upgrade(&mut self, id: &ExtensionId) -> Result<bool, TransferError> {
        let record = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| TransferError::not_installed(id.as_str()))?;
        let source = ExtensionSource::from_record(&record.url, record.git_ref.as_deref())?;

        let latest = self
            .fetcher
            .latest_commit(&source)
            .map_err(|source| TransferError::Fetch {
                id: id.clone(),
                source,
            })?;

        if record.commit.as_deref() == Some(latest.as_str()) && self.extension_path(id).is_dir() {
            debug!("{} is already at {}", id, latest);
            return Ok(false);
        }

        info!("Upgrading {} to {}", id, latest);
        self.refresh(id, &source, JournalOperation::Upgrade)?;
        Ok(true)
    }

    /// Fetch a recorded extension again from its recorded source
    ///
    /// Used when an extension is declared but its files are gone.
    pub fn reinstall(&mut self, id: &ExtensionId) -> Result<(), TransferError> {
        let record = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| TransferError::not_installed(id.as_str()))?;
        let source = ExtensionSource::from_record(&record.url, record.git_ref.as_deref())?;

        info!("Reinstalling {} from {}", id, source);
        self.refresh(id, &source, JournalOperation::Install)
    }

    /// Delete the files of an extension that has no record
    ///
    /// Refuses with `AlreadyInstalled` when the id is recorded; recorded
    /// extensions go through [`TransferEngine::remove`].
    pub fn prune(&mut self, id: &ExtensionId) -> Result<(), TransferError> {
        if self.store.contains(id) {
            return Err(TransferError::already_installed(id.clone()));
        }

        let target = self.extension_path(id);
        if !target.exists() {
            debug!("Nothing to prune for {}", id);
            return Ok(());
        }

        info!("Pruning untracked {}", id);
        self.begin(&JournalEntry::new(id.clone(), JournalOperation::Remove, None))?;
        let trash = self.trash_path(id);
        self.park(id, &target, &trash)?;
        remove_dir_if_exists(&trash).map_err(|e| TransferError::io(id, &trash, e))?;
        self.complete(id)?;
        Ok(())
    }

    /// Converge interrupted operations left in the journal
    pub fn recover(&mut self) -> Result<Vec<RecoveryAction>, TransferError> {
        let pending = self
            .journal
            .pending()
            .map_err(|e| TransferError::journal(self.journal.dir(), e))?;

        let mut actions = Vec::with_capacity(pending.len());
        for entry in pending {
            let action = self.converge(&entry)?;
            warn!("Recovered interrupted {:?}: {}", entry.operation, action);
            self.complete(&entry.id)?;
            actions.push(action);
        }

        for scratch in [STAGING_DIR, TRASH_DIR] {
            let path = self.extensions_dir.join(scratch);
            if path.exists() {
                debug!("Purging {:?}", path);
                if let Err(e) = fs::remove_dir_all(&path) {
                    warn!("Failed to purge {:?}: {}", path, e);
                }
            }
        }

        Ok(actions)
    }

    fn converge(&mut self, entry: &JournalEntry) -> Result<RecoveryAction, TransferError> {
        let id = &entry.id;
        let target = self.extension_path(id);
        let trash = self.trash_path(id);

        match entry.operation {
            JournalOperation::Install | JournalOperation::Upgrade => {
                if !self.store.contains(id) {
                    remove_dir_if_exists(&target).map_err(|e| TransferError::io(id, &target, e))?;
                    Ok(RecoveryAction::RolledBack(id.clone()))
                } else if !target.exists() && trash.exists() {
                    fs::rename(&trash, &target).map_err(|e| TransferError::io(id, &target, e))?;
                    Ok(RecoveryAction::Restored(id.clone()))
                } else {
                    Ok(RecoveryAction::Kept(id.clone()))
                }
            }
            JournalOperation::Remove => {
                remove_dir_if_exists(&target).map_err(|e| TransferError::io(id, &target, e))?;
                self.store.remove(id)?;
                Ok(RecoveryAction::RolledForward(id.clone()))
            }
        }
    }

    /// Fetch into the staging area and validate the manifest
    fn stage(
        &self,
        source: &ExtensionSource,
        id: &ExtensionId,
    ) -> Result<(PathBuf, String), TransferError> {
        let staged = self.staging_path(id);
        remove_dir_if_exists(&staged).map_err(|e| TransferError::io(id, &staged, e))?;
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::io(id, parent, e))?;
        }

        debug!("Fetching {} into {:?}", source, staged);
        let commit = match self.fetcher.fetch(source, &staged) {
            Ok(commit) => commit,
            Err(e) => {
                let _ = remove_dir_if_exists(&staged);
                return Err(TransferError::Fetch {
                    id: id.clone(),
                    source: e,
                });
            }
        };

        if let Err(e) = ExtensionManifest::load_from_dir(&staged, id.as_str()) {
            let _ = remove_dir_if_exists(&staged);
            return Err(TransferError::invalid_source(source.to_string(), e.to_string()));
        }

        Ok((staged, commit))
    }

    /// Replace the files of a recorded extension with a fresh fetch
    fn refresh(
        &mut self,
        id: &ExtensionId,
        source: &ExtensionSource,
        operation: JournalOperation,
    ) -> Result<(), TransferError> {
        let (staged, commit) = self.stage(source, id)?;
        self.begin(&JournalEntry::new(id.clone(), operation, Some(source.to_string())))?;

        let target = self.extension_path(id);
        let trash = self.trash_path(id);

        let swapped = self.park(id, &target, &trash).and_then(|_| {
            fs::rename(&staged, &target).map_err(|e| TransferError::io(id, &target, e))
        });
        if let Err(e) = swapped {
            warn!("Failed to swap files of {}, restoring: {}", id, e);
            let _ = remove_dir_if_exists(&staged);
            self.unpark(id, &target, &trash);
            return Err(e);
        }

        // The new tree is in place; a failed commit only leaves a stale hash
        self.store.touch_commit(id, Some(commit))?;
        remove_dir_if_exists(&trash).map_err(|e| TransferError::io(id, &trash, e))?;
        self.complete(id)?;
        info!("Refreshed {}", id);
        Ok(())
    }

    /// Move a fresh tree into place, replacing any untracked directory
    fn place_new(
        &self,
        id: &ExtensionId,
        staged: &Path,
        target: &Path,
    ) -> Result<(), TransferError> {
        if target.exists() {
            warn!("Replacing untracked directory {:?}", target);
            remove_dir_if_exists(target).map_err(|e| TransferError::io(id, target, e))?;
        }
        fs::rename(staged, target).map_err(|e| TransferError::io(id, target, e))
    }

    /// Move `target` into the trash, if it exists
    fn park(&self, id: &ExtensionId, target: &Path, trash: &Path) -> Result<(), TransferError> {
        if !target.exists() {
            return Ok(());
        }
        remove_dir_if_exists(trash).map_err(|e| TransferError::io(id, trash, e))?;
        if let Some(parent) = trash.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::io(id, parent, e))?;
        }
        debug!("Moving {:?} to {:?}", target, trash);
        fs::rename(target, trash).map_err(|e| TransferError::io(id, target, e))
    }

    /// Move a parked tree back after a failed operation
    ///
    /// The marker is cleared only once the tree is back in place; otherwise
    /// it stays so that recovery restores the tree instead of purging it.
    fn unpark(&self, id: &ExtensionId, target: &Path, trash: &Path) {
        if trash.exists() && !target.exists() {
            if let Err(e) = fs::rename(trash, target) {
                warn!(
                    "Failed to move {:?} back, leaving it for recovery: {}",
                    trash, e
                );
                return;
            }
        }
        if let Err(e) = self.journal.complete(id) {
            warn!("Failed to clear journal marker for {}: {}", id, e);
        }
    }

    fn begin(&self, entry: &JournalEntry) -> Result<(), TransferError> {
        self.journal
            .begin(entry)
            .map_err(|e| TransferError::journal(self.journal.dir(), e))
    }

    fn complete(&self, id: &ExtensionId) -> Result<(), TransferError> {
        self.journal
            .complete(id)
            .map_err(|e| TransferError::journal(self.journal.dir(), e))
    }
}

/// Reconciliation drives the engine through its lenient operations: the ids
/// a plan removes are never recorded, and the ids it installs always are.
impl<F: Fetcher> PlanExecutor for TransferEngine<F> {
    type Error = TransferError;

    fn remove(&mut self, id: &ExtensionId) -> Result<(), TransferError> {
        self.prune(id)
    }

    fn install(&mut self, id: &ExtensionId) -> Result<(), TransferError> {
        self.reinstall(id)
    }
}

fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
