//! Scenario simulation command.

use anyhow::{Context, Result};

use crate::cli::{OutputFormat, SimulateArgs};
use crate::commands::load_config;
use crate::output::format_simulation;
use crate::scenario::{run_scenario, Scenario};

pub fn run_simulate(args: &SimulateArgs, format: OutputFormat) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("Failed to read scenario {}", args.scenario.display()))?;
    let scenario = Scenario::from_json(&raw)?;

    let report = run_scenario(&config, &scenario)?;

    match format {
        OutputFormat::Table => {
            println!("{}", format_simulation(&report));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
    }

    Ok(())
}
