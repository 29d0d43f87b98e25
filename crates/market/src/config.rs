//! Market configuration loaded from JSON.
//!
//! Fractions are written as decimals (`"0.05"` for 5%) and converted to WAD
//! mantissas when the market is built.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};
use crate::irm::JumpRateModel;
use crate::market::{MarketParams, DEFAULT_MAX_BORROW_RATE_PER_BLOCK};
use crate::math::{checked_mul, BLOCKS_PER_YEAR};

const WAD_DECIMALS: u32 = 18;

/// Annualized jump rate model parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateModelConfig {
    pub base_rate_per_year: Decimal,
    pub multiplier_per_year: Decimal,
    pub jump_multiplier_per_year: Decimal,
    /// Utilization at which the jump multiplier kicks in, in [0, 1]
    pub kink: Decimal,
    #[serde(default = "default_blocks_per_year")]
    pub blocks_per_year: u64,
}

/// Everything needed to create a market.
///
/// # Example
///
/// ```json
/// {
///   "name": "Unn Sample Token",
///   "symbol": "uST",
///   "decimals": 8,
///   "underlying": "0x00000000000000000000000000000000000000ee",
///   "initial_exchange_rate": "0.02",
///   "reserve_factor": "0.1",
///   "rate_model": {
///     "base_rate_per_year": "0.05",
///     "multiplier_per_year": "0.45",
///     "jump_multiplier_per_year": "5",
///     "kink": "0.95"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub underlying: Address,
    /// Underlying per share while the market is empty
    pub initial_exchange_rate: Decimal,
    #[serde(default)]
    pub reserve_factor: Decimal,
    pub rate_model: RateModelConfig,
    /// Per-block ceiling; defaults to 0.0005%
    #[serde(default)]
    pub max_borrow_rate_per_block: Option<Decimal>,
}

fn default_blocks_per_year() -> u64 {
    BLOCKS_PER_YEAR
}

impl MarketConfig {
    /// Parses a configuration from JSON text
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checks that the configuration builds a valid market
    pub fn validate(&self) -> Result<()> {
        self.build().map(|_| ())
    }

    /// Converts the configuration into a rate model and market parameters.
    ///
    /// # Errors
    ///
    /// - [`MarketError::InvalidParameter`] for negative or unrepresentable
    ///   decimals, a kink above one, zero blocks per year, or parameters
    ///   rejected by [`MarketParams::validate`]
    pub fn build(&self) -> Result<(JumpRateModel, MarketParams)> {
        let model = self.rate_model.build()?;

        let max_borrow_rate_per_block = match self.max_borrow_rate_per_block {
            Some(max) => decimal_to_wad("max_borrow_rate_per_block", max)?,
            None => DEFAULT_MAX_BORROW_RATE_PER_BLOCK,
        };

        let params = MarketParams::new(
            self.underlying,
            self.name.clone(),
            self.symbol.clone(),
            self.decimals,
            decimal_to_wad("initial_exchange_rate", self.initial_exchange_rate)?,
        )
        .with_reserve_factor(decimal_to_wad("reserve_factor", self.reserve_factor)?)
        .with_max_borrow_rate_per_block(max_borrow_rate_per_block);
        params.validate()?;

        Ok((model, params))
    }
}

impl RateModelConfig {
    pub fn build(&self) -> Result<JumpRateModel> {
        JumpRateModel::from_annual(
            decimal_to_wad("base_rate_per_year", self.base_rate_per_year)?,
            decimal_to_wad("multiplier_per_year", self.multiplier_per_year)?,
            decimal_to_wad("jump_multiplier_per_year", self.jump_multiplier_per_year)?,
            decimal_to_wad("kink", self.kink)?,
            self.blocks_per_year,
        )
    }
}

/// Converts a non-negative decimal into a WAD mantissa, truncating digits
/// beyond the 18th decimal place.
pub fn decimal_to_wad(name: &'static str, value: Decimal) -> Result<U256> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MarketError::invalid(name, format!("{value} is negative")));
    }

    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let scale = value.scale();

    if scale <= WAD_DECIMALS {
        let factor = U256::from(10u64).pow(U256::from(WAD_DECIMALS - scale));
        checked_mul(mantissa, factor, "decimal_to_wad")
            .map_err(|_| MarketError::invalid(name, format!("{value} is too large")))
    } else {
        let divisor = U256::from(10u64).pow(U256::from(scale - WAD_DECIMALS));
        Ok(mantissa / divisor)
    }
}
