//! WAD fixed-point helpers.
//!
//! All amounts, rates and indices are `U256` values scaled by [`WAD`] (1e18).
//! Every operation here is checked: an overflow or a division by zero is
//! reported as a [`MarketError`] instead of wrapping or panicking, so a
//! transition that hits one aborts before it commits anything.

use alloy_primitives::U256;

use crate::error::{MarketError, Result};

/// 1.0 in fixed-point (1e18)
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Default number of blocks per year used to turn annual rates into per-block rates
/// (one block every 15 seconds).
pub const BLOCKS_PER_YEAR: u64 = 2_102_400;

/// Rounding direction for fixed-point divisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingDirection {
    Up,
    Down,
}

pub fn checked_add(x: U256, y: U256, op: &'static str) -> Result<U256> {
    x.checked_add(y).ok_or(MarketError::MathOverflow { op })
}

pub fn checked_sub(x: U256, y: U256, op: &'static str) -> Result<U256> {
    x.checked_sub(y).ok_or(MarketError::MathOverflow { op })
}

pub fn checked_mul(x: U256, y: U256, op: &'static str) -> Result<U256> {
    x.checked_mul(y).ok_or(MarketError::MathOverflow { op })
}

/// (x * y) / d rounded down
pub fn mul_div_down(x: U256, y: U256, d: U256) -> Result<U256> {
    if d.is_zero() {
        return Err(MarketError::DivisionByZero { op: "mul_div_down" });
    }
    Ok(checked_mul(x, y, "mul_div_down")? / d)
}

/// (x * y) / d rounded up
pub fn mul_div_up(x: U256, y: U256, d: U256) -> Result<U256> {
    if d.is_zero() {
        return Err(MarketError::DivisionByZero { op: "mul_div_up" });
    }
    let product = checked_mul(x, y, "mul_div_up")?;
    let quotient = product / d;
    if (product % d).is_zero() {
        Ok(quotient)
    } else {
        checked_add(quotient, U256::from(1), "mul_div_up")
    }
}

/// (x * y) / d rounded in the given direction
pub fn mul_div(x: U256, y: U256, d: U256, rounding: RoundingDirection) -> Result<U256> {
    match rounding {
        RoundingDirection::Down => mul_div_down(x, y, d),
        RoundingDirection::Up => mul_div_up(x, y, d),
    }
}

/// x * y / WAD rounded down
pub fn w_mul_down(x: U256, y: U256) -> Result<U256> {
    mul_div_down(x, y, WAD)
}

/// x * WAD / y rounded down
pub fn w_div_down(x: U256, y: U256) -> Result<U256> {
    mul_div(x, WAD, y, RoundingDirection::Down)
}

/// x * WAD / y rounded up
pub fn w_div_up(x: U256, y: U256) -> Result<U256> {
    mul_div(x, WAD, y, RoundingDirection::Up)
}

/// max(x - y, 0)
pub fn zero_floor_sub(x: U256, y: U256) -> U256 {
    x.saturating_sub(y)
}

pub fn min(x: U256, y: U256) -> U256 {
    if x < y {
        x
    } else {
        y
    }
}

/// Converts a WAD-scaled value to `f64` (lossy, for display only)
pub fn rate_to_f64(value: U256) -> f64 {
    let whole = value / WAD;
    let frac = value % WAD;
    whole.saturating_to::<u128>() as f64 + frac.saturating_to::<u128>() as f64 / 1e18
}

/// Converts a per-block rate to an APY, compounding once per day:
/// `(1 + rate * blocks_per_day) ^ 365 - 1`
pub fn rate_to_apy(rate_per_block: U256, blocks_per_year: u64) -> f64 {
    let blocks_per_day = blocks_per_year as f64 / 365.0;
    (1.0 + rate_to_f64(rate_per_block) * blocks_per_day).powi(365) - 1.0
}
