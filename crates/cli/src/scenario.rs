//! Scenario files for the `simulate` command.
//!
//! A scenario funds a set of accounts with the underlying asset and then
//! replays a list of steps against a fresh in-memory market:
//!
//! ```json
//! {
//!   "start_block": 1,
//!   "accounts": [
//!     { "address": "0x00000000000000000000000000000000000a11ce", "balance": "1000000000000000000000" }
//!   ],
//!   "steps": [
//!     { "action": "mint", "account": "0x00000000000000000000000000000000000a11ce", "amount": "100000000000000000000" },
//!     { "action": "advance", "blocks": 100 },
//!     { "action": "accrue" }
//!   ]
//! }
//! ```
//!
//! Amounts are strings in base units, decimal or `0x` hex. A failing step is
//! recorded with its error kind and the run continues with the next step.

use std::collections::BTreeSet;

use alloy_primitives::{address, Address, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use unn_rs_market::{
    rate_to_apy, rate_to_f64, BlockClock, InMemoryUnderlying, ManualClock, Market, MarketConfig,
    MarketError, MarketEvent, SimulatedMarket,
};

use crate::cli::parse_amount;

/// Account holding the market's cash in the in-memory ledger
pub const MARKET_CUSTODY: Address = address!("000000000000000000000000000000000000c0de");

fn default_start_block() -> u64 {
    1
}

fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_amount(&raw).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_start_block")]
    pub start_block: u64,
    #[serde(default)]
    pub accounts: Vec<Funding>,
    pub steps: Vec<Step>,
}

/// Initial underlying balance of an account
#[derive(Debug, Clone, Deserialize)]
pub struct Funding {
    pub address: Address,
    #[serde(deserialize_with = "deserialize_amount")]
    pub balance: U256,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Advance {
        blocks: u64,
    },
    Accrue,
    Mint {
        account: Address,
        #[serde(deserialize_with = "deserialize_amount")]
        amount: U256,
    },
    Redeem {
        account: Address,
        #[serde(deserialize_with = "deserialize_amount")]
        shares: U256,
    },
    RedeemUnderlying {
        account: Address,
        #[serde(deserialize_with = "deserialize_amount")]
        amount: U256,
    },
    Borrow {
        account: Address,
        #[serde(deserialize_with = "deserialize_amount")]
        amount: U256,
    },
    Repay {
        account: Address,
        #[serde(deserialize_with = "deserialize_amount")]
        amount: U256,
    },
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Advance { .. } => "advance",
            Step::Accrue => "accrue",
            Step::Mint { .. } => "mint",
            Step::Redeem { .. } => "redeem",
            Step::RedeemUnderlying { .. } => "redeem_underlying",
            Step::Borrow { .. } => "borrow",
            Step::Repay { .. } => "repay",
        }
    }

    pub fn account(&self) -> Option<Address> {
        match self {
            Step::Advance { .. } | Step::Accrue => None,
            Step::Mint { account, .. }
            | Step::Redeem { account, .. }
            | Step::RedeemUnderlying { account, .. }
            | Step::Borrow { account, .. }
            | Step::Repay { account, .. } => Some(*account),
        }
    }
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse scenario")
    }

    /// Every account that is funded or acts in a step
    pub fn accounts(&self) -> BTreeSet<Address> {
        self.accounts
            .iter()
            .map(|funding| funding.address)
            .chain(self.steps.iter().filter_map(Step::account))
            .collect()
    }
}

/// Result of one scenario step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub block: u64,
    pub action: &'static str,
    pub account: Option<Address>,
    pub ok: bool,
    pub detail: String,
    pub error_kind: Option<String>,
}

/// Aggregate market figures after the run
#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    pub name: String,
    pub symbol: String,
    pub block: u64,
    pub accrual_block_number: u64,
    pub total_cash: String,
    pub total_borrows: String,
    pub total_reserves: String,
    pub total_supply: String,
    pub borrow_index: String,
    pub exchange_rate: String,
    pub utilization: f64,
    pub borrow_apy: f64,
    pub supply_apy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub address: Address,
    pub wallet: String,
    pub shares: String,
    pub supplied: String,
    pub debt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub market: MarketSummary,
    pub steps: Vec<StepOutcome>,
    pub accounts: Vec<AccountSummary>,
    pub events: Vec<MarketEvent>,
}

impl SimulationReport {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|step| !step.ok).count()
    }
}

/// Runs `scenario` against a fresh market built from `config`.
pub fn run_scenario(config: &MarketConfig, scenario: &Scenario) -> Result<SimulationReport> {
    let (model, params) = config.build().context("Invalid market configuration")?;

    let clock = ManualClock::new(scenario.start_block);
    let mut underlying = InMemoryUnderlying::new(MARKET_CUSTODY);
    for funding in &scenario.accounts {
        underlying
            .mint_to(funding.address, funding.balance)
            .with_context(|| format!("Failed to fund {}", funding.address))?;
    }

    let mut market = Market::new(params, model, clock.clone(), underlying)?;

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let result = apply_step(&mut market, &clock, step);
        debug!(index, action = step.action(), ok = result.is_ok(), "scenario step");

        let (ok, detail, error_kind) = match result {
            Ok(detail) => (true, detail, None),
            Err(err) => (false, err.to_string(), Some(err.kind().to_string())),
        };
        steps.push(StepOutcome {
            index,
            block: clock.current_block(),
            action: step.action(),
            account: step.account(),
            ok,
            detail,
            error_kind,
        });
    }

    let accounts = scenario
        .accounts()
        .into_iter()
        .map(|address| summarize_account(&market, address))
        .collect::<Result<Vec<_>>>()?;

    Ok(SimulationReport {
        market: summarize_market(&market, config.rate_model.blocks_per_year)?,
        steps,
        accounts,
        events: market.take_events(),
    })
}

fn apply_step(
    market: &mut SimulatedMarket,
    clock: &ManualClock,
    step: &Step,
) -> Result<String, MarketError> {
    match step {
        Step::Advance { blocks } => Ok(format!("now at block {}", clock.advance(*blocks))),
        Step::Accrue => Ok(match market.accrue_interest()? {
            Some(accrual) => format!(
                "accrued {} over {} blocks",
                accrual.interest_accumulated, accrual.block_delta
            ),
            None => "already accrued this block".to_string(),
        }),
        Step::Mint { account, amount } => market
            .mint(*account, *amount)
            .map(|shares| format!("minted {} shares for {}", shares, amount)),
        Step::Redeem { account, shares } => market
            .redeem(*account, *shares)
            .map(|amount| format!("redeemed {} shares for {}", shares, amount)),
        Step::RedeemUnderlying { account, amount } => market
            .redeem_underlying(*account, *amount)
            .map(|shares| format!("redeemed {} shares for {}", shares, amount)),
        Step::Borrow { account, amount } => market
            .borrow(*account, *amount)
            .map(|debt| format!("borrowed {}, debt now {}", amount, debt)),
        Step::Repay { account, amount } => market
            .repay_borrow(*account, *amount)
            .map(|repaid| format!("repaid {}", repaid)),
    }
}

fn summarize_market(market: &SimulatedMarket, blocks_per_year: u64) -> Result<MarketSummary> {
    let state = market.state();
    let params = market.params();

    Ok(MarketSummary {
        name: params.name.clone(),
        symbol: params.symbol.clone(),
        block: market.clock().current_block(),
        accrual_block_number: state.accrual_block_number,
        total_cash: state.total_cash.to_string(),
        total_borrows: state.total_borrows.to_string(),
        total_reserves: state.total_reserves.to_string(),
        total_supply: state.total_supply.to_string(),
        borrow_index: state.borrow_index.to_string(),
        exchange_rate: market.exchange_rate_stored()?.to_string(),
        utilization: rate_to_f64(market.utilization()?),
        borrow_apy: rate_to_apy(market.get_borrow_rate()?, blocks_per_year),
        supply_apy: rate_to_apy(market.get_supply_rate()?, blocks_per_year),
    })
}

fn summarize_account(market: &SimulatedMarket, address: Address) -> Result<AccountSummary> {
    Ok(AccountSummary {
        address,
        wallet: market.underlying().balance_of(address).to_string(),
        shares: market.balance_of(address).to_string(),
        supplied: market.balance_of_underlying(address)?.to_string(),
        debt: market.borrow_balance_stored(address)?.to_string(),
    })
}
