//! Error types for the market engine.
//!
//! Every failing transition aborts as a whole: when an operation returns one of
//! these errors the market state is exactly what it was before the call.

use std::fmt;

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Coarse classification of a [`MarketError`].
///
/// Fatal kinds signal a misconfiguration or a broken invariant; the remaining
/// kinds are ordinary input rejections the caller may retry with other amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    BlockNumberRegression,
    RateTooHigh,
    MathOverflow,
    ZeroMint,
    ZeroAmount,
    InsufficientCash,
    InsufficientShares,
    InsufficientBalance,
}

impl ErrorKind {
    /// Returns true for kinds that are never recovered from.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidParameter
                | ErrorKind::BlockNumberRegression
                | ErrorKind::RateTooHigh
                | ErrorKind::MathOverflow
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::BlockNumberRegression => "block_number_regression",
            ErrorKind::RateTooHigh => "rate_too_high",
            ErrorKind::MathOverflow => "math_overflow",
            ErrorKind::ZeroMint => "zero_mint",
            ErrorKind::ZeroAmount => "zero_amount",
            ErrorKind::InsufficientCash => "insufficient_cash",
            ErrorKind::InsufficientShares => "insufficient_shares",
            ErrorKind::InsufficientBalance => "insufficient_balance",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while configuring or operating a market
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    /// A construction parameter is out of range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The block clock went backwards relative to the last accrual
    #[error("Block number regression: current block {current} is before last accrual block {last_accrual}")]
    BlockNumberRegression { current: u64, last_accrual: u64 },

    /// The rate model returned a borrow rate above the configured ceiling
    #[error("Borrow rate {rate} per block exceeds maximum {max}")]
    RateTooHigh { rate: U256, max: U256 },

    /// A fixed-point operation overflowed
    #[error("Arithmetic overflow in {op}")]
    MathOverflow { op: &'static str },

    /// A fixed-point operation divided by zero
    #[error("Division by zero in {op}")]
    DivisionByZero { op: &'static str },

    /// The deposit is too small to be worth a single share unit
    #[error("Mint of {amount} underlying at exchange rate {exchange_rate} yields zero shares")]
    ZeroMint { amount: U256, exchange_rate: U256 },

    /// A zero amount was passed where a positive one is required
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// The market does not hold enough cash to pay out
    #[error("Insufficient cash: requested {requested}, available {available}")]
    InsufficientCash { requested: U256, available: U256 },

    /// The account holds fewer shares than it tries to redeem
    #[error("Insufficient shares for account {account}: have {have}, need {need}")]
    InsufficientShares {
        account: Address,
        have: U256,
        need: U256,
    },

    /// The underlying asset ledger refused a transfer
    #[error("Insufficient underlying balance for account {account}: have {have}, need {need}")]
    InsufficientBalance {
        account: Address,
        have: U256,
        need: U256,
    },
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            MarketError::BlockNumberRegression { .. } => ErrorKind::BlockNumberRegression,
            MarketError::RateTooHigh { .. } => ErrorKind::RateTooHigh,
            MarketError::MathOverflow { .. } | MarketError::DivisionByZero { .. } => {
                ErrorKind::MathOverflow
            }
            MarketError::ZeroMint { .. } => ErrorKind::ZeroMint,
            MarketError::ZeroAmount => ErrorKind::ZeroAmount,
            MarketError::InsufficientCash { .. } => ErrorKind::InsufficientCash,
            MarketError::InsufficientShares { .. } => ErrorKind::InsufficientShares,
            MarketError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
        }
    }

    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        MarketError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type alias for market operations.
pub type Result<T> = std::result::Result<T, MarketError>;
