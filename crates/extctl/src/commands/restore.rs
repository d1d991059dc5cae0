//! Restore command
//!
//! Makes the extensions directory match the record store: undeclared
//! directories are removed, declared extensions with missing files are
//! fetched again from their recorded source.

use anyhow::{anyhow, bail, Context as _, Result};
use dialoguer::Confirm;
use extctl_core::{Context, ExtensionId};
use extctl_extensions::{
    installed_ids, plan, ApplyOutcome, DirManifestResolver, GitFetcher, Journal, OperationKind,
    OperationStatus, PlanExecutor, PlannedOperation, ReconcileReport, RecordStore, Reconciler,
    TransferEngine, TransferError,
};
use std::collections::HashMap;

use super::open_engine;
use crate::cli::RestoreArgs;
use crate::output;

/// Drives the engine while printing per-item progress
struct ProgressExecutor<'a> {
    engine: &'a mut TransferEngine<GitFetcher>,
    names: HashMap<ExtensionId, String>,
}

impl ProgressExecutor<'_> {
    fn name(&self, id: &ExtensionId) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn run(
        &mut self,
        kind: OperationKind,
        id: &ExtensionId,
    ) -> Result<(), TransferError> {
        let name = self.name(id);
        let (doing, done) = match kind {
            OperationKind::Remove => ("Removing", "Removed"),
            OperationKind::Install => ("Installing", "Installed"),
        };

        let spinner = output::spinner(&format!("{} {}", doing, name));
        let result = match kind {
            OperationKind::Remove => PlanExecutor::remove(&mut *self.engine, id),
            OperationKind::Install => PlanExecutor::install(&mut *self.engine, id),
        };
        spinner.finish_and_clear();

        match &result {
            Ok(()) => output::success(&format!("{} {}", done, name)),
            Err(e) => output::warning(&format!("Failed to {} {}: {}", kind, name, e)),
        }
        result
    }
}

impl PlanExecutor for ProgressExecutor<'_> {
    type Error = TransferError;

    fn remove(&mut self, id: &ExtensionId) -> Result<(), TransferError> {
        self.run(OperationKind::Remove, id)
    }

    fn install(&mut self, id: &ExtensionId) -> Result<(), TransferError> {
        self.run(OperationKind::Install, id)
    }
}

/// Reconcile installed extensions with the record store
///
/// Supports:
/// - Interactive: `extctl restore`
/// - Unattended: `extctl restore --yes`
pub fn run(ctx: &Context, args: RestoreArgs) -> Result<()> {
    if is_settled(ctx)? {
        output::info("Nothing to restore");
        return Ok(());
    }

    let mut engine = open_engine(ctx)?;

    let declared = engine.store().ids();
    let installed = installed_ids(engine.extensions_dir())
        .with_context(|| format!("Failed to scan {}", ctx.paths.extensions_dir))?;
    let restore_plan = plan(&declared, &installed);

    let resolver = DirManifestResolver::new(engine.extensions_dir());
    let reconciler = Reconciler::new(&resolver);

    let names = reconciler
        .describe(&restore_plan)
        .into_iter()
        .map(|op| (op.id, op.display_name))
        .collect();
    let mut executor = ProgressExecutor {
        engine: &mut engine,
        names,
    };

    let mut prompt_error = None;
    let outcome = reconciler.apply(
        &restore_plan,
        |operations| {
            print_plan(operations);
            if args.yes {
                return true;
            }
            match Confirm::new()
                .with_prompt("Apply these changes?")
                .default(false)
                .interact()
            {
                Ok(confirmed) => confirmed,
                Err(e) => {
                    prompt_error = Some(e);
                    false
                }
            }
        },
        &mut executor,
    )?;

    if let Some(e) = prompt_error {
        return Err(anyhow!(e).context("Failed to read confirmation"));
    }

    match outcome {
        ApplyOutcome::NothingToDo => output::info("Nothing to restore"),
        ApplyOutcome::Declined => output::info("Cancelled"),
        ApplyOutcome::Applied(report) => finish(&report)?,
    }
    Ok(())
}

/// Read-only check: nothing to reconcile and no interrupted work to recover
fn is_settled(ctx: &Context) -> Result<bool> {
    let extensions_dir = ctx.paths.extensions_dir.as_std_path();
    if Journal::new(extensions_dir).has_pending() {
        return Ok(false);
    }

    let declared = RecordStore::read_declared(ctx.paths.store_path.as_std_path())
        .with_context(|| format!("Failed to open record store {}", ctx.paths.store_path))?;
    let installed = installed_ids(extensions_dir)
        .with_context(|| format!("Failed to scan {}", ctx.paths.extensions_dir))?;
    Ok(plan(&declared, &installed).is_empty())
}

fn print_plan(operations: &[PlannedOperation]) {
    output::header("Restore plan");
    for op in operations {
        let sign = match op.kind {
            OperationKind::Remove => "-",
            OperationKind::Install => "+",
        };
        if op.display_name == op.id.as_str() {
            println!("  {} {} {}", sign, op.kind, op.id);
        } else {
            println!("  {} {} {} ({})", sign, op.kind, op.display_name, op.id);
        }
    }
    println!();
}

fn finish(report: &ReconcileReport) -> Result<()> {
    if report.is_success() {
        output::success(&format!("Restore complete: {}", report.summary()));
        return Ok(());
    }

    let reasons: Vec<String> = report
        .failed()
        .map(|outcome| match &outcome.status {
            OperationStatus::Failed(reason) => format!("{} ({})", outcome.id, reason),
            OperationStatus::Succeeded => outcome.id.to_string(),
        })
        .collect();
    bail!(
        "Restore finished with failures: {}: {}",
        report.summary(),
        reasons.join("; ")
    )
}
