//! Extension management for extctl
//!
//! This crate handles:
//! - The record store of declared extensions
//! - Scanning the extensions directory for what is actually installed
//! - Manifest resolution for display
//! - Source parsing and git fetching
//! - Install/remove/upgrade through the transfer engine
//! - Reconciling the declared set against the installed set

pub mod error;
pub mod fetch;
pub mod journal;
pub mod manifest;
pub mod reconcile;
pub mod scanner;
pub mod source;
pub mod store;
pub mod transfer;
pub mod types;

pub use error::{FetchError, ManifestError, ReconcileError, StoreError, TransferError};
pub use fetch::{Fetcher, GitFetcher};
pub use journal::{Journal, JournalEntry, JournalOperation};
pub use manifest::{display_name, DirManifestResolver, ExtensionManifest, ManifestResolver};
pub use reconcile::{
    plan, ApplyOutcome, OperationKind, OperationOutcome, OperationStatus, PlanExecutor,
    PlannedOperation, ReconcileReport, ReconciliationPlan, Reconciler,
};
pub use scanner::{installed_ids, scan};
pub use source::ExtensionSource;
pub use store::RecordStore;
pub use transfer::{RecoveryAction, TransferEngine};
pub use types::{ExtensionRecord, InstalledExtension, StoreDocument};

pub use extctl_core::ExtensionId;
