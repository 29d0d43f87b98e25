//! Jump rate interest rate model.
//!
//! The borrow rate is a piecewise-linear function of utilization with a kink:
//!
//! ```text
//! borrow_rate(u) ^
//!                │                                 .
//!                │                               .
//!                │                             .    slope = jump multiplier
//!                │                           .
//!   r0 + k * m   +─────────────────────────+
//!                │                     .   │
//!                │               .         │
//!                │         .               │    slope = multiplier
//!                │   .                     │
//!            r0  +                         │
//!                │                         │
//!               0└─────────────────────────+───────────────>
//!                0                         k   1           u
//! ```
//!
//! Utilization is `borrows / (cash + borrows)` and is defined as zero for an
//! empty market. All rates are per block and WAD-scaled.
//!
//! # Example
//!
//! ```rust
//! use unn_rs_market::irm::{InterestRateModel, JumpRateModel};
//! use unn_rs_market::{BLOCKS_PER_YEAR, WAD};
//! use alloy_primitives::U256;
//!
//! let percent = WAD / U256::from(100);
//! let model = JumpRateModel::from_annual(
//!     percent * U256::from(5),   // 5% base rate
//!     percent * U256::from(45),  // 45% multiplier
//!     U256::from(5) * WAD,       // 500% jump multiplier
//!     percent * U256::from(95),  // kink at 95% utilization
//!     BLOCKS_PER_YEAR,
//! )
//! .unwrap();
//!
//! // An empty market pays the base rate
//! let rate = model.get_borrow_rate(U256::ZERO, U256::ZERO, U256::ZERO).unwrap();
//! assert_eq!(rate, model.base_rate_per_block());
//! ```

use alloy_primitives::U256;

use crate::error::{MarketError, Result};
use crate::math::{checked_add, checked_sub, w_div_down, w_mul_down, WAD};

/// Interface the accrual engine uses to price borrows.
///
/// Implementations must be pure: the same inputs always produce the same rate.
pub trait InterestRateModel {
    /// Per-block borrow rate for the given market balances (WAD-scaled)
    fn get_borrow_rate(&self, cash: U256, borrows: U256, reserves: U256) -> Result<U256>;

    /// Per-block rate earned by share holders, net of the reserve factor.
    ///
    /// `utilization * borrow_rate * (1 - reserve_factor)`
    fn get_supply_rate(
        &self,
        cash: U256,
        borrows: U256,
        reserves: U256,
        reserve_factor: U256,
    ) -> Result<U256> {
        if reserve_factor > WAD {
            return Err(MarketError::invalid(
                "reserve_factor",
                format!("{reserve_factor} is above 1.0"),
            ));
        }
        let utilization = utilization_rate(cash, borrows, reserves)?;
        let borrow_rate = self.get_borrow_rate(cash, borrows, reserves)?;
        let rate_to_pool = w_mul_down(borrow_rate, WAD - reserve_factor)?;
        w_mul_down(utilization, rate_to_pool)
    }
}

/// Calculate the utilization rate (WAD-scaled)
///
/// Utilization = borrows / (cash + borrows), or zero when the market is empty.
/// Reserves are part of the rate model interface but do not enter the ratio.
pub fn utilization_rate(cash: U256, borrows: U256, _reserves: U256) -> Result<U256> {
    let total = checked_add(cash, borrows, "utilization_rate")?;
    if total.is_zero() {
        return Ok(U256::ZERO);
    }
    w_div_down(borrows, total)
}

/// Piecewise-linear rate model with a kink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpRateModel {
    base_rate_per_block: U256,
    multiplier_per_block: U256,
    jump_multiplier_per_block: U256,
    kink: U256,
}

impl JumpRateModel {
    /// Creates a model from per-block parameters.
    ///
    /// # Errors
    ///
    /// - [`MarketError::InvalidParameter`] if `kink` is above 1.0
    pub fn new(
        base_rate_per_block: U256,
        multiplier_per_block: U256,
        jump_multiplier_per_block: U256,
        kink: U256,
    ) -> Result<Self> {
        if kink > WAD {
            return Err(MarketError::invalid(
                "kink",
                format!("{kink} is outside [0, 1e18]"),
            ));
        }

        Ok(Self {
            base_rate_per_block,
            multiplier_per_block,
            jump_multiplier_per_block,
            kink,
        })
    }

    /// Creates a model from annualized parameters, spreading each rate evenly
    /// over `blocks_per_year` (truncating).
    pub fn from_annual(
        base_rate_per_year: U256,
        multiplier_per_year: U256,
        jump_multiplier_per_year: U256,
        kink: U256,
        blocks_per_year: u64,
    ) -> Result<Self> {
        if blocks_per_year == 0 {
            return Err(MarketError::invalid("blocks_per_year", "must be non-zero"));
        }
        let blocks = U256::from(blocks_per_year);

        Self::new(
            base_rate_per_year / blocks,
            multiplier_per_year / blocks,
            jump_multiplier_per_year / blocks,
            kink,
        )
    }

    pub fn base_rate_per_block(&self) -> U256 {
        self.base_rate_per_block
    }

    pub fn multiplier_per_block(&self) -> U256 {
        self.multiplier_per_block
    }

    pub fn jump_multiplier_per_block(&self) -> U256 {
        self.jump_multiplier_per_block
    }

    pub fn kink(&self) -> U256 {
        self.kink
    }

    /// Borrow rate at a given utilization (WAD-scaled, expected in [0, 1e18])
    pub fn borrow_rate_at(&self, utilization: U256) -> Result<U256> {
        if utilization <= self.kink {
            let slope = w_mul_down(utilization, self.multiplier_per_block)?;
            return checked_add(self.base_rate_per_block, slope, "borrow_rate_at");
        }

        let normal_rate = checked_add(
            self.base_rate_per_block,
            w_mul_down(self.kink, self.multiplier_per_block)?,
            "borrow_rate_at",
        )?;
        let excess_utilization = checked_sub(utilization, self.kink, "borrow_rate_at")?;
        let jump = w_mul_down(excess_utilization, self.jump_multiplier_per_block)?;

        checked_add(normal_rate, jump, "borrow_rate_at")
    }
}

impl InterestRateModel for JumpRateModel {
    fn get_borrow_rate(&self, cash: U256, borrows: U256, reserves: U256) -> Result<U256> {
        let utilization = utilization_rate(cash, borrows, reserves)?;
        self.borrow_rate_at(utilization)
    }
}
