//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// extctl - manage launcher extensions
#[derive(Parser, Debug)]
#[command(name = "extctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Data directory holding the record store and extensions
    #[arg(long, global = true, env = "EXTCTL_DATA_DIR")]
    pub data_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List declared and installed extensions
    Show(ShowArgs),

    /// Install an extension from a source reference
    Install(InstallArgs),

    /// Uninstall an extension
    Uninstall(UninstallArgs),

    /// Upgrade one or all extensions
    Upgrade(UpgradeArgs),

    /// Make installed extensions match the declared ones
    Restore(RestoreArgs),

    /// Show version information
    Version(VersionArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Source reference: URL, git@host:owner/repo or github:owner/repo,
    /// optionally followed by #branch-or-tag
    pub source: String,
}

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Extension id as shown by `extctl show`
    pub id: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Extension id (upgrades every declared extension if omitted)
    pub id: Option<String>,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Apply the plan without asking
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["extctl", "restore", "--yes", "-vv", "--data-dir", "/tmp/x"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.data_dir, Some(Utf8PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Commands::Restore(RestoreArgs { yes: true })));
    }

    #[test]
    fn test_upgrade_id_is_optional() {
        let cli = Cli::try_parse_from(["extctl", "upgrade"]).unwrap();
        assert!(matches!(cli.command, Commands::Upgrade(UpgradeArgs { id: None })));
    }

    #[test]
    fn test_install_requires_source() {
        assert!(Cli::try_parse_from(["extctl", "install"]).is_err());
    }
}
