//! Upgrade command

use anyhow::{bail, Result};
use extctl_core::{Context, ExtensionId};
use extctl_extensions::{
    display_name, DirManifestResolver, GitFetcher, TransferEngine, TransferError,
};

use super::{open_engine, parse_id};
use crate::cli::UpgradeArgs;
use crate::output;

/// Upgrade one extension, or every declared extension
///
/// In batch mode a failing extension does not stop the others; the command
/// fails at the end if any of them failed.
pub fn run(ctx: &Context, args: UpgradeArgs) -> Result<()> {
    let mut engine = open_engine(ctx)?;

    if let Some(id) = args.id {
        let id = parse_id(&id)?;
        upgrade_one(&mut engine, &id)?;
        return Ok(());
    }

    let ids = engine.store().ids();
    if ids.is_empty() {
        output::info("No extensions installed");
        return Ok(());
    }

    let mut failures = Vec::new();
    for id in &ids {
        if let Err(e) = upgrade_one(&mut engine, id) {
            output::warning(&format!("Failed to upgrade {}: {}", id, e));
            failures.push(id.to_string());
        }
    }

    let summary = format!(
        "{} succeeded, {} failed",
        ids.len() - failures.len(),
        failures.len()
    );
    if !failures.is_empty() {
        bail!("Upgrade finished with failures ({}): {}", summary, failures.join(", "));
    }
    output::success(&format!("Upgrade complete: {}", summary));
    Ok(())
}

fn upgrade_one(
    engine: &mut TransferEngine<GitFetcher>,
    id: &ExtensionId,
) -> Result<(), TransferError> {
    let spinner = output::spinner(&format!("Checking {}", id));
    let result = engine.upgrade(id);
    spinner.finish_and_clear();

    let name = display_name(&DirManifestResolver::new(engine.extensions_dir()), id);
    if result? {
        output::success(&format!("Upgraded {}", name));
    } else {
        output::info(&format!("{} is already up to date", name));
    }
    Ok(())
}
