//! Notifications recorded by the market after each committed transition.

use alloy_primitives::{Address, U256};
use serde::Serialize;

/// An event emitted by a successful market transition.
///
/// Events are appended only after the transition's state has been committed;
/// a failed transition never leaves an event behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MarketEvent {
    /// Interest was accrued over one or more blocks
    AccrueInterest {
        cash_prior: U256,
        interest_accumulated: U256,
        borrow_index: U256,
        total_borrows: U256,
    },
    /// Underlying was deposited in exchange for shares
    Mint {
        minter: Address,
        mint_amount: U256,
        mint_tokens: U256,
    },
    /// Shares were burned in exchange for underlying
    Redeem {
        redeemer: Address,
        redeem_amount: U256,
        redeem_tokens: U256,
    },
    /// Underlying was lent out
    Borrow {
        borrower: Address,
        borrow_amount: U256,
        account_borrows: U256,
        total_borrows: U256,
    },
    /// A borrow was (partially) paid back
    RepayBorrow {
        payer: Address,
        repay_amount: U256,
        account_borrows: U256,
        total_borrows: U256,
    },
}

impl MarketEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MarketEvent::AccrueInterest { .. } => "AccrueInterest",
            MarketEvent::Mint { .. } => "Mint",
            MarketEvent::Redeem { .. } => "Redeem",
            MarketEvent::Borrow { .. } => "Borrow",
            MarketEvent::RepayBorrow { .. } => "RepayBorrow",
        }
    }
}
