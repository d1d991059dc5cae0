//! Uninstall command

use anyhow::Result;
use dialoguer::Confirm;
use extctl_core::Context;
use extctl_extensions::{display_name, DirManifestResolver, TransferError};

use super::{open_engine, parse_id};
use crate::cli::UninstallArgs;
use crate::output;

/// Remove an installed extension
///
/// Supports:
/// - Remove with confirmation: `extctl uninstall com.github.user.timer`
/// - Skip confirmation: `extctl uninstall com.github.user.timer -y`
pub fn run(ctx: &Context, args: UninstallArgs) -> Result<()> {
    let id = parse_id(&args.id)?;
    let mut engine = open_engine(ctx)?;

    let Some(record) = engine.store().get(&id) else {
        return Err(TransferError::not_installed(id.as_str()).into());
    };

    let resolver = DirManifestResolver::new(engine.extensions_dir());
    let name = display_name(&resolver, &id);

    output::info(&format!("This will remove {}", name));
    output::kv("id", id.as_str());
    output::kv("source", &record.url);

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Are you sure you want to remove '{}'?", name))
            .default(false)
            .interact()?;

        if !confirmed {
            output::info("Cancelled");
            return Ok(());
        }
    }

    let spinner = output::spinner(&format!("Removing {}", name));
    let result = engine.remove(&id);
    spinner.finish_and_clear();
    result?;

    output::success(&format!("Removed {}", name));
    Ok(())
}
