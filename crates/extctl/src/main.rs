//! extctl - launcher extension manager
//!
//! Entry point: parses arguments, sets up tracing, builds the per-invocation
//! context and dispatches to a command.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use extctl_core::Context;
use extctl_extensions::TransferError;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir;

    match cli.command {
        Commands::Show(args) => commands::show::run(&Context::new(data_dir)?, args),
        Commands::Install(args) => commands::install::run(&Context::new(data_dir)?, args),
        Commands::Uninstall(args) => commands::uninstall::run(&Context::new(data_dir)?, args),
        Commands::Upgrade(args) => commands::upgrade::run(&Context::new(data_dir)?, args),
        Commands::Restore(args) => commands::restore::run(&Context::new(data_dir)?, args),
        Commands::Version(args) => commands::version::run(args),
    }
}

/// Print a failed command as a single line
///
/// Expected conditions (already installed, not installed, bad source) are
/// shown as warnings; everything else as an error with its cause chain.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<TransferError>() {
        Some(e) if e.is_expected() => output::warning(&e.to_string()),
        _ => output::error(&format!("{:#}", err)),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
