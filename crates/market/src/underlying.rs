//! Custody of the underlying asset.
//!
//! The market never moves tokens itself: it asks an [`UnderlyingAsset`] to pull
//! deposits in and push withdrawals out. A transfer either succeeds completely
//! or fails without side effects, and the market only commits its own state
//! after the transfer went through.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};

use crate::error::{MarketError, Result};
use crate::math::{checked_add, checked_sub};

/// Transfer capability for the underlying asset.
pub trait UnderlyingAsset {
    /// Moves `amount` from `from` into the market's custody
    fn transfer_in(&mut self, from: Address, amount: U256) -> Result<()>;

    /// Moves `amount` out of the market's custody to `to`
    fn transfer_out(&mut self, to: Address, amount: U256) -> Result<()>;
}

/// In-memory balance ledger standing in for an underlying token.
///
/// `custody` is the account holding the market's cash.
#[derive(Debug, Clone)]
pub struct InMemoryUnderlying {
    custody: Address,
    balances: HashMap<Address, U256>,
}

impl InMemoryUnderlying {
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            balances: HashMap::new(),
        }
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Credits `amount` of freshly created tokens to `account`
    pub fn mint_to(&mut self, account: Address, amount: U256) -> Result<()> {
        let balance = checked_add(self.balance_of(account), amount, "mint_to")?;
        self.balances.insert(account, balance);
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        if from == to {
            return Err(MarketError::invalid(
                "account",
                format!("{from} is the custody account and cannot be a counterparty"),
            ));
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(MarketError::InsufficientBalance {
                account: from,
                have: from_balance,
                need: amount,
            });
        }
        let to_balance = checked_add(self.balance_of(to), amount, "transfer")?;
        let from_balance = checked_sub(from_balance, amount, "transfer")?;

        self.balances.insert(from, from_balance);
        self.balances.insert(to, to_balance);
        Ok(())
    }
}

impl UnderlyingAsset for InMemoryUnderlying {
    fn transfer_in(&mut self, from: Address, amount: U256) -> Result<()> {
        self.transfer(from, self.custody, amount)
    }

    fn transfer_out(&mut self, to: Address, amount: U256) -> Result<()> {
        self.transfer(self.custody, to, amount)
    }
}
