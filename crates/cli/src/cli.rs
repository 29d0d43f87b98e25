//! CLI argument definitions using clap.

use std::path::PathBuf;
use std::str::FromStr;

use alloy_primitives::U256;
use clap::{Parser, Subcommand, ValueEnum};

/// Unn CLI - Inspect rate curves and simulate deposit markets
#[derive(Parser, Debug)]
#[command(name = "unn")]
#[command(about = "CLI tool for inspecting and simulating Unn deposit markets", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Log market transitions at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show borrow and supply rates for given market balances
    Rates(RatesArgs),
    /// Sample the rate curve over utilization
    Curve(CurveArgs),
    /// Run a JSON scenario against an in-memory market
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
pub struct RatesArgs {
    /// Market configuration file (defaults to the built-in sample market)
    #[arg(long, short, env = "UNN_MARKET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Underlying cash held by the market, in base units
    #[arg(long, default_value = "0", value_parser = parse_amount)]
    pub cash: U256,

    /// Outstanding borrows, in base units
    #[arg(long, default_value = "0", value_parser = parse_amount)]
    pub borrows: U256,

    /// Reserves, in base units
    #[arg(long, default_value = "0", value_parser = parse_amount)]
    pub reserves: U256,
}

#[derive(Parser, Debug)]
pub struct CurveArgs {
    /// Market configuration file (defaults to the built-in sample market)
    #[arg(long, short, env = "UNN_MARKET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of utilization intervals between 0% and 100%
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub steps: u32,
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Scenario file
    pub scenario: PathBuf,

    /// Market configuration file (defaults to the built-in sample market)
    #[arg(long, short, env = "UNN_MARKET_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Parses a base-unit amount, decimal or 0x-prefixed hex
pub fn parse_amount(s: &str) -> Result<U256, String> {
    U256::from_str(s.trim()).map_err(|e| format!("Invalid amount '{}': {}", s, e))
}
