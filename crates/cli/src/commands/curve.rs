//! Rate curve sampling.

use alloy_primitives::U256;
use anyhow::Result;
use serde::Serialize;
use unn_rs_market::{rate_to_apy, rate_to_f64, InterestRateModel, JumpRateModel, WAD};

use crate::cli::{CurveArgs, OutputFormat};
use crate::commands::load_config;
use crate::output::format_curve_table;

/// One sample of the rate curve
#[derive(Debug, Clone, Serialize)]
pub struct CurvePoint {
    pub utilization: f64,
    pub borrow_rate_per_block: String,
    pub supply_rate_per_block: String,
    pub borrow_apy: f64,
    pub supply_apy: f64,
    pub above_kink: bool,
}

/// Samples `steps + 1` evenly spaced utilizations from 0% to 100%.
///
/// Utilization `u` is modelled as a market with `1 - u` cash and `u` borrows.
pub fn sample_curve(
    model: &JumpRateModel,
    reserve_factor: U256,
    blocks_per_year: u64,
    steps: u32,
) -> Result<Vec<CurvePoint>> {
    let steps = U256::from(steps.max(1));
    let mut points = Vec::new();

    let mut i = U256::ZERO;
    while i <= steps {
        let utilization = WAD * i / steps;
        let cash = WAD - utilization;

        let borrow_rate = model.get_borrow_rate(cash, utilization, U256::ZERO)?;
        let supply_rate = model.get_supply_rate(cash, utilization, U256::ZERO, reserve_factor)?;

        points.push(CurvePoint {
            utilization: rate_to_f64(utilization),
            borrow_rate_per_block: borrow_rate.to_string(),
            supply_rate_per_block: supply_rate.to_string(),
            borrow_apy: rate_to_apy(borrow_rate, blocks_per_year),
            supply_apy: rate_to_apy(supply_rate, blocks_per_year),
            above_kink: utilization > model.kink(),
        });
        i += U256::from(1);
    }

    Ok(points)
}

pub fn run_curve(args: &CurveArgs, format: OutputFormat) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let (model, params) = config.build()?;

    let points = sample_curve(
        &model,
        params.reserve_factor,
        config.rate_model.blocks_per_year,
        args.steps,
    )?;

    match format {
        OutputFormat::Table => {
            println!("{}", format_curve_table(&points));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&points)?;
            println!("{}", json);
        }
    }

    Ok(())
}
