//! Install command

use anyhow::Result;
use extctl_core::Context;
use extctl_extensions::{display_name, DirManifestResolver};

use super::open_engine;
use crate::cli::InstallArgs;
use crate::output;

/// Install an extension
///
/// Supports:
/// - URL: `extctl install https://github.com/user/timer`
/// - Pinned reference: `extctl install https://github.com/user/timer#v2`
/// - Shorthand: `extctl install github:user/timer`
pub fn run(ctx: &Context, args: InstallArgs) -> Result<()> {
    let mut engine = open_engine(ctx)?;

    let spinner = output::spinner(&format!("Installing {}", args.source));
    let result = engine.install(&args.source);
    spinner.finish_and_clear();
    let id = result?;

    let resolver = DirManifestResolver::new(engine.extensions_dir());
    let name = display_name(&resolver, &id);
    if name == id.as_str() {
        output::success(&format!("Installed {}", id));
    } else {
        output::success(&format!("Installed {} ({})", name, id));
    }
    Ok(())
}
