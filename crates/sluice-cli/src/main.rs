//! Sluice CLI - Command-line utility for ingesting dataset uploads.

mod cli;
mod commands;
mod config;
mod error;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "sluice_core=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);
    let show_progress = progress::CliProgress::should_show(cli.quiet, cli.json);
    let config_file = cli.config.as_deref();

    match &cli.command {
        cli::Commands::Ingest(args) => {
            commands::ingest::execute(args, config_file, &*formatter, show_progress)
        }
        cli::Commands::Checksum(args) => commands::checksum::execute(args, &*formatter),
        cli::Commands::Plan(args) => commands::plan::execute(args, config_file, &*formatter),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    }
}
