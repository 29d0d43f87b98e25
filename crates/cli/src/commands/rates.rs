//! Point-in-time rate query.

use alloy_primitives::U256;
use anyhow::Result;
use serde::Serialize;
use unn_rs_market::{
    rate_to_apy, rate_to_f64, utilization_rate, InterestRateModel, JumpRateModel,
};

use crate::cli::{OutputFormat, RatesArgs};
use crate::commands::load_config;
use crate::output::format_rate_report;

/// Rates for one set of market balances
#[derive(Debug, Clone, Serialize)]
pub struct RateReport {
    pub cash: String,
    pub borrows: String,
    pub reserves: String,
    pub reserve_factor: f64,
    pub utilization: f64,
    pub borrow_rate_per_block: String,
    pub supply_rate_per_block: String,
    pub borrow_apy: f64,
    pub supply_apy: f64,
    pub kink: f64,
}

impl RateReport {
    pub fn compute(
        model: &JumpRateModel,
        reserve_factor: U256,
        blocks_per_year: u64,
        cash: U256,
        borrows: U256,
        reserves: U256,
    ) -> Result<Self> {
        let utilization = utilization_rate(cash, borrows, reserves)?;
        let borrow_rate = model.get_borrow_rate(cash, borrows, reserves)?;
        let supply_rate = model.get_supply_rate(cash, borrows, reserves, reserve_factor)?;

        Ok(Self {
            cash: cash.to_string(),
            borrows: borrows.to_string(),
            reserves: reserves.to_string(),
            reserve_factor: rate_to_f64(reserve_factor),
            utilization: rate_to_f64(utilization),
            borrow_rate_per_block: borrow_rate.to_string(),
            supply_rate_per_block: supply_rate.to_string(),
            borrow_apy: rate_to_apy(borrow_rate, blocks_per_year),
            supply_apy: rate_to_apy(supply_rate, blocks_per_year),
            kink: rate_to_f64(model.kink()),
        })
    }
}

pub fn run_rates(args: &RatesArgs, format: OutputFormat) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let (model, params) = config.build()?;

    let report = RateReport::compute(
        &model,
        params.reserve_factor,
        config.rate_model.blocks_per_year,
        args.cash,
        args.borrows,
        args.reserves,
    )?;

    match format {
        OutputFormat::Table => {
            println!("{}", format_rate_report(&report, &params.symbol));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
    }

    Ok(())
}
