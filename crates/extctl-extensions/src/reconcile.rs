//! Declared/installed reconciliation
//!
//! [`plan`] is a pure set difference. [`Reconciler::apply`] presents the plan,
//! asks for confirmation and drives a [`PlanExecutor`], running every removal
//! before any install. A failing item is recorded in the report and the
//! remaining items still run.

use extctl_core::ExtensionId;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::manifest::{display_name, ManifestResolver};

/// Compute the operations that make `installed` equal to `declared`
///
/// Ids present in both sets are left alone.
pub fn plan(
    declared: &BTreeSet<ExtensionId>,
    installed: &BTreeSet<ExtensionId>,
) -> ReconciliationPlan {
    ReconciliationPlan {
        to_remove: installed.difference(declared).cloned().collect(),
        to_install: declared.difference(installed).cloned().collect(),
    }
}

/// Removals and installs, disjoint by construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    to_remove: BTreeSet<ExtensionId>,
    to_install: BTreeSet<ExtensionId>,
}

impl ReconciliationPlan {
    /// Build a plan from explicit sets, rejecting overlap
    pub fn new(
        to_remove: BTreeSet<ExtensionId>,
        to_install: BTreeSet<ExtensionId>,
    ) -> Result<Self, ReconcileError> {
        let plan = Self {
            to_remove,
            to_install,
        };
        plan.check_disjoint()?;
        Ok(plan)
    }

    fn check_disjoint(&self) -> Result<(), ReconcileError> {
        let overlap: Vec<String> = self
            .to_remove
            .intersection(&self.to_install)
            .map(|id| id.to_string())
            .collect();
        if overlap.is_empty() {
            Ok(())
        } else {
            Err(ReconcileError::InvalidPlan { ids: overlap })
        }
    }

    pub fn to_remove(&self) -> &BTreeSet<ExtensionId> {
        &self.to_remove
    }

    pub fn to_install(&self) -> &BTreeSet<ExtensionId> {
        &self.to_install
    }

    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_install.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_remove.len() + self.to_install.len()
    }

    /// Every item in execution order: removals, then installs
    pub fn items(&self) -> impl Iterator<Item = (OperationKind, &ExtensionId)> {
        self.to_remove
            .iter()
            .map(|id| (OperationKind::Remove, id))
            .chain(self.to_install.iter().map(|id| (OperationKind::Install, id)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Install,
    Remove,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => f.write_str("install"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// A plan item with its resolved display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOperation {
    pub id: ExtensionId,
    pub kind: OperationKind,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Succeeded,
    Failed(String),
}

/// Result of one plan item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub id: ExtensionId,
    pub kind: OperationKind,
    pub status: OperationStatus,
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Succeeded
    }
}

/// Per-item outcomes of an applied plan, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub outcomes: Vec<OperationOutcome>,
}

impl ReconcileReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(OperationOutcome::is_success)
    }

    /// `"N succeeded, M failed"`
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.succeeded().count(),
            self.failed().count()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The plan was empty; nothing was asked or done
    NothingToDo,
    /// Confirmation was refused; nothing was done
    Declined,
    Applied(ReconcileReport),
}

/// Performs the side effects of plan items
pub trait PlanExecutor {
    type Error: fmt::Display;

    fn remove(&mut self, id: &ExtensionId) -> Result<(), Self::Error>;

    fn install(&mut self, id: &ExtensionId) -> Result<(), Self::Error>;
}

/// Presents and applies reconciliation plans
pub struct Reconciler<'a> {
    resolver: &'a dyn ManifestResolver,
}

impl<'a> Reconciler<'a> {
    pub fn new(resolver: &'a dyn ManifestResolver) -> Self {
        Self { resolver }
    }

    /// Plan items with display names; unresolvable names show the raw id
    pub fn describe(&self, plan: &ReconciliationPlan) -> Vec<PlannedOperation> {
        plan.items()
            .map(|(kind, id)| PlannedOperation {
                id: id.clone(),
                kind,
                display_name: display_name(self.resolver, id),
            })
            .collect()
    }

    /// Confirm and execute `plan`
    ///
    /// `confirm` is not called for an empty plan. Names are resolved before
    /// anything runs, so removed extensions are still shown by name.
    pub fn apply<C, E>(
        &self,
        plan: &ReconciliationPlan,
        confirm: C,
        executor: &mut E,
    ) -> Result<ApplyOutcome, ReconcileError>
    where
        C: FnOnce(&[PlannedOperation]) -> bool,
        E: PlanExecutor,
    {
        plan.check_disjoint()?;

        if plan.is_empty() {
            debug!("Reconciliation plan is empty");
            return Ok(ApplyOutcome::NothingToDo);
        }

        let operations = self.describe(plan);
        if !confirm(&operations) {
            info!("Reconciliation declined");
            return Ok(ApplyOutcome::Declined);
        }

        let mut report = ReconcileReport::default();
        for op in &operations {
            let result = match op.kind {
                OperationKind::Remove => executor.remove(&op.id),
                OperationKind::Install => executor.install(&op.id),
            };

            let status = match result {
                Ok(()) => {
                    debug!("{} {}: ok", op.kind, op.id);
                    OperationStatus::Succeeded
                }
                Err(e) => {
                    warn!("{} {} failed: {}", op.kind, op.id, e);
                    OperationStatus::Failed(e.to_string())
                }
            };
            report.outcomes.push(OperationOutcome {
                id: op.id.clone(),
                kind: op.kind,
                status,
            });
        }

        info!("Reconciliation finished: {}", report.summary());
        Ok(ApplyOutcome::Applied(report))
    }
}
