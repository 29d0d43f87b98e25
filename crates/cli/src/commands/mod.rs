//! Command implementations.

pub mod curve;
pub mod rates;
pub mod simulate;

use std::path::Path;

use anyhow::{Context, Result};
use unn_rs_market::MarketConfig;

pub use curve::{run_curve, CurvePoint};
pub use rates::{run_rates, RateReport};
pub use simulate::run_simulate;

/// Sample market used when no configuration file is given:
/// 5% base, 45% multiplier, 500% jump, 95% kink, 10% reserve factor
const DEFAULT_MARKET_CONFIG: &str = r#"{
    "name": "Unn Sample Token",
    "symbol": "uST",
    "decimals": 8,
    "underlying": "0x00000000000000000000000000000000000000ee",
    "initial_exchange_rate": "0.02",
    "reserve_factor": "0.1",
    "rate_model": {
        "base_rate_per_year": "0.05",
        "multiplier_per_year": "0.45",
        "jump_multiplier_per_year": "5",
        "kink": "0.95"
    }
}"#;

/// Load a market configuration from `path`, or the built-in sample market.
pub fn load_config(path: Option<&Path>) -> Result<MarketConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read market config {}", path.display()))?;
            MarketConfig::from_json(&raw)
                .with_context(|| format!("Failed to parse market config {}", path.display()))?
        }
        None => MarketConfig::from_json(DEFAULT_MARKET_CONFIG)
            .context("Failed to parse built-in market config")?,
    };

    config
        .validate()
        .context("Invalid market configuration")?;
    Ok(config)
}
