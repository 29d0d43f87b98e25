//! Unn CLI - Inspect rate curves and simulate deposit markets.

mod cli;
mod commands;
mod output;
mod scenario;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{run_curve, run_rates, run_simulate};

/// Logs go to stderr so table and JSON output on stdout stay clean.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Rates(args) => {
            run_rates(&args, cli.format)?;
        }
        Commands::Curve(args) => {
            run_curve(&args, cli.format)?;
        }
        Commands::Simulate(args) => {
            run_simulate(&args, cli.format)?;
        }
    }

    Ok(())
}
