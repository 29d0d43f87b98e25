//! Market state and the accrual engine.
//!
//! This module implements the [`Market`] struct: a single interest-bearing
//! deposit market that owns its aggregate balances, accrues interest per
//! block, and converts between underlying amounts and share tokens.
//!
//! # Overview
//!
//! - **Supply side**: depositors [`Market::mint`] shares and [`Market::redeem`] them later
//! - **Borrow side**: [`Market::borrow`] / [`Market::repay_borrow`] grow and shrink `total_borrows`
//! - **Accrual**: [`Market::accrue_interest`] compounds the rate model's borrow rate
//!   over the blocks elapsed since the last accrual
//! - **Exchange rate**: `(cash + borrows - reserves) / supply`, or the initial
//!   exchange rate while no shares exist
//!
//! Every mutating operation accrues first and then works on a private copy of
//! the state. The copy is committed only once every check and the underlying
//! transfer have succeeded, so a failed call leaves the market untouched.
//!
//! # Example
//!
//! ```rust
//! use unn_rs_market::{
//!     InMemoryUnderlying, JumpRateModel, ManualClock, Market, MarketEvent, MarketParams, WAD,
//! };
//! use alloy_primitives::{address, Address, U256};
//!
//! let alice = address!("00000000000000000000000000000000000a11ce");
//! let custody = address!("0000000000000000000000000000000000000001");
//!
//! let mut token = InMemoryUnderlying::new(custody);
//! token.mint_to(alice, U256::from(1_000) * WAD).unwrap();
//!
//! let clock = ManualClock::new(1);
//! let model = JumpRateModel::new(U256::ZERO, U256::ZERO, U256::ZERO, WAD).unwrap();
//! // One share is worth 0.02 underlying
//! let params = MarketParams::new(Address::ZERO, "Unn Token", "uTKN", 8, WAD / U256::from(50));
//! let mut market = Market::new(params, model, clock.clone(), token).unwrap();
//!
//! let shares = market.mint(alice, U256::from(100) * WAD).unwrap();
//! assert_eq!(shares, U256::from(5_000) * WAD);
//! assert!(matches!(market.events().last(), Some(MarketEvent::Mint { .. })));
//!
//! let underlying = market.redeem(alice, shares).unwrap();
//! assert_eq!(underlying, U256::from(100) * WAD);
//! ```

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{BlockClock, ManualClock};
use crate::error::{MarketError, Result};
use crate::events::MarketEvent;
use crate::irm::{utilization_rate, InterestRateModel, JumpRateModel};
use crate::math::{
    checked_add, checked_mul, checked_sub, min, mul_div_down, w_div_down, w_div_up, w_mul_down,
    zero_floor_sub, WAD,
};
use crate::underlying::{InMemoryUnderlying, UnderlyingAsset};

/// Ceiling on the per-block borrow rate accepted from the rate model (0.0005% per block)
pub const DEFAULT_MAX_BORROW_RATE_PER_BLOCK: U256 = U256::from_limbs([5_000_000_000_000, 0, 0, 0]);

/// Market configured with the in-memory collaborators, as used by simulations
pub type SimulatedMarket = Market<JumpRateModel, ManualClock, InMemoryUnderlying>;

/// Immutable market configuration, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketParams {
    /// The underlying asset backing the market
    pub underlying: Address,
    /// Share token name
    pub name: String,
    /// Share token symbol
    pub symbol: String,
    /// Share token decimals
    pub decimals: u8,
    /// Exchange rate used while no shares are outstanding (WAD-scaled)
    pub initial_exchange_rate: U256,
    /// Fraction of accrued interest retained as reserves (WAD-scaled)
    pub reserve_factor: U256,
    /// Borrow rates above this ceiling abort accrual (WAD-scaled per block)
    pub max_borrow_rate_per_block: U256,
}

impl MarketParams {
    /// Creates parameters with no reserve factor and the default borrow rate ceiling
    pub fn new(
        underlying: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        initial_exchange_rate: U256,
    ) -> Self {
        Self {
            underlying,
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            initial_exchange_rate,
            reserve_factor: U256::ZERO,
            max_borrow_rate_per_block: DEFAULT_MAX_BORROW_RATE_PER_BLOCK,
        }
    }

    pub fn with_reserve_factor(mut self, reserve_factor: U256) -> Self {
        self.reserve_factor = reserve_factor;
        self
    }

    pub fn with_max_borrow_rate_per_block(mut self, max_borrow_rate_per_block: U256) -> Self {
        self.max_borrow_rate_per_block = max_borrow_rate_per_block;
        self
    }

    /// Checks the parameters a market can be created with.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MarketError::invalid("name", "must not be empty"));
        }
        if self.symbol.trim().is_empty() {
            return Err(MarketError::invalid("symbol", "must not be empty"));
        }
        if self.initial_exchange_rate.is_zero() {
            return Err(MarketError::invalid(
                "initial_exchange_rate",
                "must be greater than zero",
            ));
        }
        if self.reserve_factor > WAD {
            return Err(MarketError::invalid(
                "reserve_factor",
                format!("{} is above 1.0", self.reserve_factor),
            ));
        }
        Ok(())
    }
}

/// Aggregate balances of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketState {
    /// Underlying held by the market
    pub total_cash: U256,
    /// Outstanding principal plus accrued interest
    pub total_borrows: U256,
    /// Protocol share of accrued interest
    pub total_reserves: U256,
    /// Outstanding share tokens
    pub total_supply: U256,
    /// Block at which interest was last accrued
    pub accrual_block_number: u64,
    /// Accumulated compounding factor, starting at 1.0 (WAD-scaled)
    pub borrow_index: U256,
}

impl MarketState {
    /// Empty market created at `accrual_block_number`
    pub fn new(accrual_block_number: u64) -> Self {
        Self {
            total_cash: U256::ZERO,
            total_borrows: U256::ZERO,
            total_reserves: U256::ZERO,
            total_supply: U256::ZERO,
            accrual_block_number,
            borrow_index: WAD,
        }
    }

    /// Underlying owed to share holders: cash + borrows - reserves
    pub fn backing(&self) -> Result<U256> {
        let gross = checked_add(self.total_cash, self.total_borrows, "backing")?;
        checked_sub(gross, self.total_reserves, "backing")
    }

    /// Exchange rate between shares and underlying (WAD-scaled).
    ///
    /// Falls back to `initial_exchange_rate` while no shares are outstanding.
    pub fn exchange_rate(&self, initial_exchange_rate: U256) -> Result<U256> {
        if self.total_supply.is_zero() {
            return Ok(initial_exchange_rate);
        }
        mul_div_down(self.backing()?, WAD, self.total_supply)
    }

    pub fn utilization(&self) -> Result<U256> {
        utilization_rate(self.total_cash, self.total_borrows, self.total_reserves)
    }

    /// Computes the state after accruing interest up to `current_block`.
    ///
    /// Returns `Ok(None)` when interest has already been accrued in this block.
    /// The receiver is never modified; committing the result is up to the caller.
    ///
    /// # Errors
    ///
    /// - [`MarketError::BlockNumberRegression`] if `current_block` is before the last accrual
    /// - [`MarketError::RateTooHigh`] if the model's rate exceeds `max_borrow_rate_per_block`
    /// - [`MarketError::MathOverflow`] if any intermediate value overflows
    pub fn accrue<M: InterestRateModel + ?Sized>(
        &self,
        current_block: u64,
        rate_model: &M,
        reserve_factor: U256,
        max_borrow_rate_per_block: U256,
    ) -> Result<Option<Accrual>> {
        if current_block == self.accrual_block_number {
            return Ok(None);
        }
        if current_block < self.accrual_block_number {
            return Err(MarketError::BlockNumberRegression {
                current: current_block,
                last_accrual: self.accrual_block_number,
            });
        }
        let block_delta = current_block - self.accrual_block_number;

        let borrow_rate =
            rate_model.get_borrow_rate(self.total_cash, self.total_borrows, self.total_reserves)?;
        if borrow_rate > max_borrow_rate_per_block {
            return Err(MarketError::RateTooHigh {
                rate: borrow_rate,
                max: max_borrow_rate_per_block,
            });
        }

        let simple_interest_factor =
            checked_mul(borrow_rate, U256::from(block_delta), "simple_interest_factor")?;
        let interest_accumulated = w_mul_down(simple_interest_factor, self.total_borrows)?;

        let total_borrows = checked_add(self.total_borrows, interest_accumulated, "total_borrows")?;
        let total_reserves = checked_add(
            self.total_reserves,
            w_mul_down(interest_accumulated, reserve_factor)?,
            "total_reserves",
        )?;
        let borrow_index = checked_add(
            self.borrow_index,
            w_mul_down(simple_interest_factor, self.borrow_index)?,
            "borrow_index",
        )?;

        Ok(Some(Accrual {
            block_delta,
            borrow_rate,
            cash_prior: self.total_cash,
            interest_accumulated,
            state: MarketState {
                total_borrows,
                total_reserves,
                borrow_index,
                accrual_block_number: current_block,
                ..*self
            },
        }))
    }
}

/// Outcome of a non-trivial accrual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accrual {
    /// Blocks elapsed since the previous accrual
    pub block_delta: u64,
    /// Per-block borrow rate applied over the period
    pub borrow_rate: U256,
    /// Cash before accrual
    pub cash_prior: U256,
    /// Interest added to total borrows
    pub interest_accumulated: U256,
    /// The state after accrual
    pub state: MarketState,
}

/// Per-account borrow record.
///
/// The current debt is `principal * borrow_index / interest_index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BorrowSnapshot {
    /// Debt at the time of the account's last borrow or repay
    pub principal: U256,
    /// Market borrow index at that time
    pub interest_index: U256,
}

/// An interest-bearing deposit market.
///
/// Generic over the rate model, the block clock and the underlying asset so
/// that each collaborator can be swapped for a test double.
#[derive(Debug)]
pub struct Market<M, C, U> {
    params: MarketParams,
    rate_model: M,
    clock: C,
    underlying: U,
    state: MarketState,
    shares: BTreeMap<Address, U256>,
    borrows: BTreeMap<Address, BorrowSnapshot>,
    events: Vec<MarketEvent>,
}

impl<M, C, U> Market<M, C, U>
where
    M: InterestRateModel,
    C: BlockClock,
    U: UnderlyingAsset,
{
    /// Creates an empty market whose accrual starts at the clock's current block.
    ///
    /// # Errors
    ///
    /// - [`MarketError::InvalidParameter`] if `params` fail validation
    pub fn new(params: MarketParams, rate_model: M, clock: C, underlying: U) -> Result<Self> {
        params.validate()?;
        let state = MarketState::new(clock.current_block());

        info!(
            name = %params.name,
            symbol = %params.symbol,
            underlying = %params.underlying,
            block = state.accrual_block_number,
            "market initialized"
        );

        Ok(Self {
            params,
            rate_model,
            clock,
            underlying,
            state,
            shares: BTreeMap::new(),
            borrows: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    // ==================== Queries ====================

    pub fn params(&self) -> &MarketParams {
        &self.params
    }

    pub fn rate_model(&self) -> &M {
        &self.rate_model
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn underlying(&self) -> &U {
        &self.underlying
    }

    /// A copy of the aggregate state
    pub fn state(&self) -> MarketState {
        self.state
    }

    pub fn total_supply(&self) -> U256 {
        self.state.total_supply
    }

    /// Events recorded so far, oldest first
    pub fn events(&self) -> &[MarketEvent] {
        &self.events
    }

    /// Drains the recorded events
    pub fn take_events(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.events)
    }

    /// Stored exchange rate (WAD-scaled). Does not accrue; call
    /// [`Market::accrue_interest`] first or use [`Market::exchange_rate_current`]
    /// for an up-to-date value.
    pub fn exchange_rate_stored(&self) -> Result<U256> {
        self.state.exchange_rate(self.params.initial_exchange_rate)
    }

    pub fn utilization(&self) -> Result<U256> {
        self.state.utilization()
    }

    /// Per-block borrow rate at the stored balances
    pub fn get_borrow_rate(&self) -> Result<U256> {
        self.rate_model.get_borrow_rate(
            self.state.total_cash,
            self.state.total_borrows,
            self.state.total_reserves,
        )
    }

    /// Per-block supply rate at the stored balances
    pub fn get_supply_rate(&self) -> Result<U256> {
        self.rate_model.get_supply_rate(
            self.state.total_cash,
            self.state.total_borrows,
            self.state.total_reserves,
            self.params.reserve_factor,
        )
    }

    /// Share balance of `account`
    pub fn balance_of(&self, account: Address) -> U256 {
        self.shares.get(&account).copied().unwrap_or_default()
    }

    /// Underlying value of `account`'s shares at the stored exchange rate
    pub fn balance_of_underlying(&self, account: Address) -> Result<U256> {
        w_mul_down(self.balance_of(account), self.exchange_rate_stored()?)
    }

    /// Accounts holding shares, in address order
    pub fn share_balances(&self) -> impl Iterator<Item = (Address, U256)> + '_ {
        self.shares.iter().map(|(account, shares)| (*account, *shares))
    }

    pub fn borrow_snapshot(&self, account: Address) -> BorrowSnapshot {
        self.borrows.get(&account).copied().unwrap_or_default()
    }

    /// Debt of `account` at the stored borrow index
    pub fn borrow_balance_stored(&self, account: Address) -> Result<U256> {
        self.borrow_balance_at(account, self.state.borrow_index)
    }

    // ==================== Transitions ====================

    /// Accrues interest up to the clock's current block.
    ///
    /// Returns `Ok(None)` if interest was already accrued in this block.
    pub fn accrue_interest(&mut self) -> Result<Option<Accrual>> {
        let result = self.pending_accrual();
        log_rejection("accrue_interest", &result);

        let accrual = result?;
        if let Some(accrual) = &accrual {
            self.commit(Some(accrual), accrual.state);
        }
        Ok(accrual)
    }

    /// Accrues interest, then returns the exchange rate
    pub fn exchange_rate_current(&mut self) -> Result<U256> {
        self.accrue_interest()?;
        self.exchange_rate_stored()
    }

    /// Accrues interest, then returns `account`'s debt
    pub fn borrow_balance_current(&mut self, account: Address) -> Result<U256> {
        self.accrue_interest()?;
        self.borrow_balance_stored(account)
    }

    /// Deposits `amount` underlying from `minter` and credits shares.
    ///
    /// Shares are `amount / exchange_rate`, truncated. Exactly one
    /// [`MarketEvent::Mint`] carrying the credited shares is recorded.
    ///
    /// # Errors
    ///
    /// - [`MarketError::ZeroMint`] if the deposit is worth less than one share unit
    /// - [`MarketError::InsufficientBalance`] if the underlying transfer fails
    /// - any accrual error
    pub fn mint(&mut self, minter: Address, amount: U256) -> Result<U256> {
        let result = self.try_mint(minter, amount);
        log_rejection("mint", &result);
        result
    }

    /// Burns `redeem_tokens` shares of `redeemer` and pays out their underlying
    /// value, truncated. Returns the underlying amount paid.
    ///
    /// # Errors
    ///
    /// - [`MarketError::ZeroAmount`] if `redeem_tokens` is zero
    /// - [`MarketError::InsufficientCash`] if the payout exceeds the market's cash
    /// - [`MarketError::InsufficientShares`] if `redeemer` holds fewer shares
    pub fn redeem(&mut self, redeemer: Address, redeem_tokens: U256) -> Result<U256> {
        let result = self.try_redeem(redeemer, redeem_tokens);
        log_rejection("redeem", &result);
        result
    }

    /// Pays out exactly `redeem_amount` underlying, burning the shares it is
    /// worth rounded up. Returns the shares burned.
    pub fn redeem_underlying(&mut self, redeemer: Address, redeem_amount: U256) -> Result<U256> {
        let result = self.try_redeem_underlying(redeemer, redeem_amount);
        log_rejection("redeem_underlying", &result);
        result
    }

    /// Lends `amount` of cash to `borrower`. Returns the borrower's new debt.
    ///
    /// No collateral is checked; the only limit is the market's cash.
    pub fn borrow(&mut self, borrower: Address, amount: U256) -> Result<U256> {
        let result = self.try_borrow(borrower, amount);
        log_rejection("borrow", &result);
        result
    }

    /// Pays back up to `amount` of `payer`'s debt. Amounts above the debt are
    /// capped. Returns the amount actually repaid.
    pub fn repay_borrow(&mut self, payer: Address, amount: U256) -> Result<U256> {
        let result = self.try_repay_borrow(payer, amount);
        log_rejection("repay_borrow", &result);
        result
    }

    // ==================== Internals ====================

    fn pending_accrual(&self) -> Result<Option<Accrual>> {
        self.state.accrue(
            self.clock.current_block(),
            &self.rate_model,
            self.params.reserve_factor,
            self.params.max_borrow_rate_per_block,
        )
    }

    /// Accrues into a scratch copy of the state
    fn accrued_copy(&self) -> Result<(Option<Accrual>, MarketState)> {
        let accrual = self.pending_accrual()?;
        let next = accrual.map_or(self.state, |accrual| accrual.state);
        Ok((accrual, next))
    }

    fn commit(&mut self, accrual: Option<&Accrual>, next: MarketState) {
        if let Some(accrual) = accrual {
            debug!(
                block = accrual.state.accrual_block_number,
                block_delta = accrual.block_delta,
                borrow_rate = %accrual.borrow_rate,
                interest = %accrual.interest_accumulated,
                borrow_index = %accrual.state.borrow_index,
                "accrued interest"
            );
            self.events.push(MarketEvent::AccrueInterest {
                cash_prior: accrual.cash_prior,
                interest_accumulated: accrual.interest_accumulated,
                borrow_index: accrual.state.borrow_index,
                total_borrows: accrual.state.total_borrows,
            });
        }
        self.state = next;
    }

    fn borrow_balance_at(&self, account: Address, borrow_index: U256) -> Result<U256> {
        match self.borrows.get(&account) {
            Some(snapshot) if !snapshot.principal.is_zero() => {
                mul_div_down(snapshot.principal, borrow_index, snapshot.interest_index)
            }
            _ => Ok(U256::ZERO),
        }
    }

    fn set_shares(&mut self, account: Address, shares: U256) {
        if shares.is_zero() {
            self.shares.remove(&account);
        } else {
            self.shares.insert(account, shares);
        }
    }

    fn try_mint(&mut self, minter: Address, mint_amount: U256) -> Result<U256> {
        let (accrual, mut next) = self.accrued_copy()?;

        let exchange_rate = next.exchange_rate(self.params.initial_exchange_rate)?;
        let mint_tokens = w_div_down(mint_amount, exchange_rate)?;
        if mint_tokens.is_zero() {
            return Err(MarketError::ZeroMint {
                amount: mint_amount,
                exchange_rate,
            });
        }

        next.total_supply = checked_add(next.total_supply, mint_tokens, "mint")?;
        next.total_cash = checked_add(next.total_cash, mint_amount, "mint")?;
        let minter_shares = checked_add(self.balance_of(minter), mint_tokens, "mint")?;

        self.underlying.transfer_in(minter, mint_amount)?;

        self.commit(accrual.as_ref(), next);
        self.set_shares(minter, minter_shares);
        self.events.push(MarketEvent::Mint {
            minter,
            mint_amount,
            mint_tokens,
        });
        info!(%minter, %mint_amount, %mint_tokens, %exchange_rate, "mint");

        Ok(mint_tokens)
    }

    fn try_redeem(&mut self, redeemer: Address, redeem_tokens: U256) -> Result<U256> {
        if redeem_tokens.is_zero() {
            return Err(MarketError::ZeroAmount);
        }
        let (accrual, next) = self.accrued_copy()?;

        let exchange_rate = next.exchange_rate(self.params.initial_exchange_rate)?;
        let redeem_amount = w_mul_down(redeem_tokens, exchange_rate)?;

        self.redeem_fresh(redeemer, accrual, next, redeem_tokens, redeem_amount)?;
        Ok(redeem_amount)
    }

    fn try_redeem_underlying(&mut self, redeemer: Address, redeem_amount: U256) -> Result<U256> {
        if redeem_amount.is_zero() {
            return Err(MarketError::ZeroAmount);
        }
        let (accrual, next) = self.accrued_copy()?;

        let exchange_rate = next.exchange_rate(self.params.initial_exchange_rate)?;
        let redeem_tokens = w_div_up(redeem_amount, exchange_rate)?;

        self.redeem_fresh(redeemer, accrual, next, redeem_tokens, redeem_amount)?;
        Ok(redeem_tokens)
    }

    fn redeem_fresh(
        &mut self,
        redeemer: Address,
        accrual: Option<Accrual>,
        mut next: MarketState,
        redeem_tokens: U256,
        redeem_amount: U256,
    ) -> Result<()> {
        if redeem_amount > next.total_cash {
            return Err(MarketError::InsufficientCash {
                requested: redeem_amount,
                available: next.total_cash,
            });
        }

        let held = self.balance_of(redeemer);
        if held < redeem_tokens {
            return Err(MarketError::InsufficientShares {
                account: redeemer,
                have: held,
                need: redeem_tokens,
            });
        }

        next.total_supply = checked_sub(next.total_supply, redeem_tokens, "redeem")?;
        next.total_cash = checked_sub(next.total_cash, redeem_amount, "redeem")?;

        self.underlying.transfer_out(redeemer, redeem_amount)?;

        self.commit(accrual.as_ref(), next);
        self.set_shares(redeemer, held - redeem_tokens);
        self.events.push(MarketEvent::Redeem {
            redeemer,
            redeem_amount,
            redeem_tokens,
        });
        info!(%redeemer, %redeem_amount, %redeem_tokens, "redeem");

        Ok(())
    }

    fn try_borrow(&mut self, borrower: Address, borrow_amount: U256) -> Result<U256> {
        if borrow_amount.is_zero() {
            return Err(MarketError::ZeroAmount);
        }
        let (accrual, mut next) = self.accrued_copy()?;

        if borrow_amount > next.total_cash {
            return Err(MarketError::InsufficientCash {
                requested: borrow_amount,
                available: next.total_cash,
            });
        }

        let account_prior = self.borrow_balance_at(borrower, next.borrow_index)?;
        let account_borrows = checked_add(account_prior, borrow_amount, "borrow")?;
        next.total_borrows = checked_add(next.total_borrows, borrow_amount, "borrow")?;
        next.total_cash = checked_sub(next.total_cash, borrow_amount, "borrow")?;

        self.underlying.transfer_out(borrower, borrow_amount)?;

        self.commit(accrual.as_ref(), next);
        self.borrows.insert(
            borrower,
            BorrowSnapshot {
                principal: account_borrows,
                interest_index: next.borrow_index,
            },
        );
        self.events.push(MarketEvent::Borrow {
            borrower,
            borrow_amount,
            account_borrows,
            total_borrows: next.total_borrows,
        });
        info!(%borrower, %borrow_amount, %account_borrows, "borrow");

        Ok(account_borrows)
    }

    fn try_repay_borrow(&mut self, payer: Address, amount: U256) -> Result<U256> {
        if amount.is_zero() {
            return Err(MarketError::ZeroAmount);
        }
        let (accrual, mut next) = self.accrued_copy()?;

        let account_prior = self.borrow_balance_at(payer, next.borrow_index)?;
        let repay_amount = min(amount, account_prior);
        if repay_amount.is_zero() {
            return Err(MarketError::ZeroAmount);
        }

        let account_borrows = account_prior - repay_amount;
        // Per-account balances round down, so their sum never exceeds the total
        next.total_borrows = zero_floor_sub(next.total_borrows, repay_amount);
        next.total_cash = checked_add(next.total_cash, repay_amount, "repay_borrow")?;

        self.underlying.transfer_in(payer, repay_amount)?;

        self.commit(accrual.as_ref(), next);
        if account_borrows.is_zero() {
            self.borrows.remove(&payer);
        } else {
            self.borrows.insert(
                payer,
                BorrowSnapshot {
                    principal: account_borrows,
                    interest_index: next.borrow_index,
                },
            );
        }
        self.events.push(MarketEvent::RepayBorrow {
            payer,
            repay_amount,
            account_borrows,
            total_borrows: next.total_borrows,
        });
        info!(%payer, %repay_amount, %account_borrows, "repay borrow");

        Ok(repay_amount)
    }
}

fn log_rejection<T>(operation: &'static str, result: &Result<T>) {
    if let Err(err) = result {
        warn!(operation, kind = %err.kind(), error = %err, "transition rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::BLOCKS_PER_YEAR;
    use crate::ErrorKind;
    use alloy_primitives::address;

    const CUSTODY: Address = address!("0000000000000000000000000000000000000001");
    const UNDERLYING: Address = address!("00000000000000000000000000000000000000ee");
    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0000000000000000000000000000000000000b0b");
    const CAROL: Address = address!("00000000000000000000000000000000000ca201");

    fn percent(p: u64) -> U256 {
        U256::from(p) * WAD / U256::from(100)
    }

    /// 0.02 underlying per share
    fn standard_exchange_rate() -> U256 {
        WAD / U256::from(50)
    }

    /// 5% base, 45% multiplier, 500% jump, 95% kink, all annual
    fn test_model() -> JumpRateModel {
        JumpRateModel::from_annual(
            percent(5),
            percent(45),
            U256::from(5) * WAD,
            percent(95),
            BLOCKS_PER_YEAR,
        )
        .unwrap()
    }

    fn create_test_market_with(params: MarketParams) -> (SimulatedMarket, ManualClock) {
        let clock = ManualClock::new(100);
        let mut underlying = InMemoryUnderlying::new(CUSTODY);
        underlying.mint_to(ALICE, U256::from(1_000_000) * WAD).unwrap();
        underlying.mint_to(BOB, U256::from(1_000_000) * WAD).unwrap();

        let market = Market::new(params, test_model(), clock.clone(), underlying).unwrap();
        (market, clock)
    }

    fn test_params(initial_exchange_rate: U256) -> MarketParams {
        MarketParams::new(UNDERLYING, "SAMPLE TOKEN", "ST", 9, initial_exchange_rate)
            .with_reserve_factor(percent(10))
    }

    fn create_test_market() -> (SimulatedMarket, ManualClock) {
        create_test_market_with(test_params(standard_exchange_rate()))
    }

    /// Alice supplies 1000, Bob borrows 500
    fn create_borrowed_market() -> (SimulatedMarket, ManualClock) {
        let (mut market, clock) = create_test_market();
        market.mint(ALICE, U256::from(1_000) * WAD).unwrap();
        market.borrow(BOB, U256::from(500) * WAD).unwrap();
        market.take_events();
        (market, clock)
    }

    #[test]
    fn test_new_market_initial_state() {
        let (market, _clock) = create_test_market();
        let state = market.state();

        assert_eq!(state.accrual_block_number, 100);
        assert_eq!(state.borrow_index, WAD);
        assert_eq!(state.total_supply, U256::ZERO);
        assert_eq!(state.total_cash, U256::ZERO);
        assert_eq!(market.exchange_rate_stored().unwrap(), standard_exchange_rate());
        assert!(market.events().is_empty());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let clock = ManualClock::new(1);
        let cases = [
            test_params(U256::ZERO),
            test_params(WAD).with_reserve_factor(WAD + U256::from(1)),
            MarketParams::new(UNDERLYING, "", "ST", 9, WAD),
            MarketParams::new(UNDERLYING, "SAMPLE TOKEN", " ", 9, WAD),
        ];

        for params in cases {
            let err = Market::new(
                params,
                test_model(),
                clock.clone(),
                InMemoryUnderlying::new(CUSTODY),
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
    }

    #[test]
    fn test_mint_with_unit_exchange_rate_mantissa() {
        // Initial exchange rate of 1 wei: each underlying unit buys 1e18 share units
        let (mut market, _clock) = create_test_market_with(test_params(U256::from(1)));

        let minted = market.mint(ALICE, U256::from(100)).unwrap();

        assert_eq!(minted, U256::from(100) * WAD);
        assert_eq!(market.balance_of(ALICE), U256::from(100) * WAD);
        assert_eq!(market.balance_of_underlying(ALICE).unwrap(), U256::from(100));
        assert_eq!(
            market.events(),
            &[MarketEvent::Mint {
                minter: ALICE,
                mint_amount: U256::from(100),
                mint_tokens: U256::from(100) * WAD,
            }]
        );
    }

    #[test]
    fn test_mint_at_exchange_rate_50000() {
        let (mut market, _clock) = create_test_market_with(test_params(U256::from(50_000)));

        let minted = market.mint(ALICE, U256::from(100)).unwrap();

        // 100 * 1e18 / 50_000
        let expected = U256::from(2_000_000_000_000_000u64);
        assert_eq!(minted, expected);
        assert_eq!(
            market.events().last(),
            Some(&MarketEvent::Mint {
                minter: ALICE,
                mint_amount: U256::from(100),
                mint_tokens: expected,
            })
        );
    }

    #[test]
    fn test_mint_updates_totals() {
        let (mut market, _clock) = create_test_market();
        let amount = U256::from(1_000) * WAD;

        let minted = market.mint(ALICE, amount).unwrap();

        assert_eq!(minted, U256::from(50_000) * WAD);
        assert_eq!(market.total_supply(), minted);
        assert_eq!(market.state().total_cash, amount);
        assert_eq!(market.underlying().balance_of(CUSTODY), amount);
        assert_eq!(
            market.underlying().balance_of(ALICE),
            U256::from(999_000) * WAD
        );
    }

    #[test]
    fn test_zero_mint_rejected() {
        // One share is worth 2 underlying, so a deposit of 1 buys nothing
        let (mut market, _clock) = create_test_market_with(test_params(U256::from(2) * WAD));
        let before = market.state();

        let err = market.mint(ALICE, U256::from(1)).unwrap_err();

        assert_eq!(
            err,
            MarketError::ZeroMint {
                amount: U256::from(1),
                exchange_rate: U256::from(2) * WAD,
            }
        );
        assert_eq!(market.state(), before);
        assert!(market.events().is_empty());
        assert_eq!(
            market.underlying().balance_of(ALICE),
            U256::from(1_000_000) * WAD
        );
    }

    #[test]
    fn test_mint_without_underlying_balance() {
        let (mut market, _clock) = create_test_market();

        let err = market.mint(CAROL, U256::from(10) * WAD).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(market.total_supply(), U256::ZERO);
        assert_eq!(market.balance_of(CAROL), U256::ZERO);
    }

    #[test]
    fn test_accrue_same_block_is_noop() {
        let (mut market, _clock) = create_borrowed_market();
        let before = market.state();

        assert_eq!(market.accrue_interest().unwrap(), None);
        assert_eq!(market.accrue_interest().unwrap(), None);

        assert_eq!(market.state(), before);
        assert!(market.events().is_empty());
    }

    #[test]
    fn test_accrue_twice_in_same_block() {
        let (mut market, clock) = create_borrowed_market();
        clock.advance(10);

        assert!(market.accrue_interest().unwrap().is_some());
        let after_first = market.state();
        assert!(market.accrue_interest().unwrap().is_none());

        assert_eq!(market.state(), after_first);
        assert_eq!(market.events().len(), 1);
    }

    #[test]
    fn test_accrue_interest_compounds() {
        let (mut market, clock) = create_borrowed_market();
        let rate = market.get_borrow_rate().unwrap();
        let before = market.state();

        clock.advance(100);
        let accrual = market.accrue_interest().unwrap().unwrap();

        let simple_interest_factor = rate * U256::from(100);
        let interest = simple_interest_factor * U256::from(500);
        let state = market.state();

        assert_eq!(accrual.block_delta, 100);
        assert_eq!(accrual.borrow_rate, rate);
        assert_eq!(accrual.interest_accumulated, interest);
        assert_eq!(state.total_borrows, before.total_borrows + interest);
        assert_eq!(state.total_reserves, interest / U256::from(10));
        assert_eq!(state.borrow_index, WAD + simple_interest_factor);
        assert_eq!(state.accrual_block_number, 200);
        assert_eq!(state.total_cash, before.total_cash);
        assert_eq!(state.total_supply, before.total_supply);
    }

    #[test]
    fn test_accrue_records_event() {
        let (mut market, clock) = create_borrowed_market();
        clock.advance(5);

        let accrual = market.accrue_interest().unwrap().unwrap();

        assert_eq!(
            market.events(),
            &[MarketEvent::AccrueInterest {
                cash_prior: U256::from(500) * WAD,
                interest_accumulated: accrual.interest_accumulated,
                borrow_index: accrual.state.borrow_index,
                total_borrows: accrual.state.total_borrows,
            }]
        );
    }

    #[test]
    fn test_accrue_without_borrows_advances_block() {
        let (mut market, clock) = create_test_market();
        clock.advance(1_000);

        let accrual = market.accrue_interest().unwrap().unwrap();

        assert_eq!(accrual.interest_accumulated, U256::ZERO);
        assert_eq!(market.state().accrual_block_number, 1_100);
        // Index still compounds at the base rate
        assert!(market.state().borrow_index > WAD);
    }

    #[test]
    fn test_exchange_rate_grows_with_interest() {
        let (mut market, clock) = create_borrowed_market();
        let before = market.exchange_rate_stored().unwrap();

        clock.advance(10_000);
        market.accrue_interest().unwrap();

        assert!(market.exchange_rate_stored().unwrap() > before);
    }

    #[test]
    fn test_exchange_rate_stored_is_stale_until_accrual() {
        let (mut market, clock) = create_borrowed_market();
        let before = market.exchange_rate_stored().unwrap();

        clock.advance(10_000);
        assert_eq!(market.exchange_rate_stored().unwrap(), before);

        let current = market.exchange_rate_current().unwrap();
        assert!(current > before);
        assert_eq!(market.exchange_rate_stored().unwrap(), current);
    }

    #[test]
    fn test_block_number_regression() {
        let (mut market, clock) = create_borrowed_market();
        let before = market.state();
        clock.set(50);

        let err = market.accrue_interest().unwrap_err();

        assert_eq!(
            err,
            MarketError::BlockNumberRegression {
                current: 50,
                last_accrual: 100,
            }
        );
        assert!(err.kind().is_fatal());
        assert_eq!(market.state(), before);
    }

    #[test]
    fn test_rate_too_high() {
        let params =
            test_params(standard_exchange_rate()).with_max_borrow_rate_per_block(U256::from(1));
        let (mut market, clock) = create_test_market_with(params);
        market.mint(ALICE, U256::from(1_000) * WAD).unwrap();
        let before = market.state();
        clock.advance(1);

        let err = market.accrue_interest().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateTooHigh);
        assert_eq!(market.state(), before);

        // Mint accrues first, so it fails the same way
        let err = market.mint(ALICE, U256::from(1) * WAD).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateTooHigh);
        assert_eq!(market.state(), before);
    }

    #[test]
    fn test_accrue_overflow_rolls_back() {
        let huge = U256::from(10).pow(U256::from(57));
        let clock = ManualClock::new(100);
        let mut underlying = InMemoryUnderlying::new(CUSTODY);
        underlying.mint_to(ALICE, huge).unwrap();
        let model = JumpRateModel::new(U256::from(1_000_000), U256::ZERO, U256::ZERO, WAD).unwrap();
        let params =
            test_params(standard_exchange_rate()).with_max_borrow_rate_per_block(U256::MAX);
        let mut market = Market::new(params, model, clock.clone(), underlying).unwrap();

        market.mint(ALICE, huge).unwrap();
        market.borrow(BOB, huge).unwrap();
        let before = market.state();
        let events_before = market.events().len();

        // rate * blocks * borrows no longer fits in 256 bits
        clock.advance(u64::MAX / 2);
        let err = market.accrue_interest().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MathOverflow);
        assert!(err.kind().is_fatal());
        assert_eq!(market.state(), before);
        assert_eq!(market.events().len(), events_before);
        assert_eq!(market.borrow_balance_stored(BOB).unwrap(), huge);
    }

    #[test]
    fn test_redeem_round_trip_exact() {
        let (mut market, _clock) = create_test_market();
        let minted = market.mint(ALICE, U256::from(12_345)).unwrap();
        assert_eq!(minted, U256::from(617_250));

        let redeemed = market.redeem(ALICE, minted).unwrap();

        assert_eq!(redeemed, U256::from(12_345));
        assert_eq!(market.total_supply(), U256::ZERO);
        assert_eq!(market.state().total_cash, U256::ZERO);
        assert_eq!(market.balance_of(ALICE), U256::ZERO);
        assert_eq!(
            market.events().last(),
            Some(&MarketEvent::Redeem {
                redeemer: ALICE,
                redeem_amount: U256::from(12_345),
                redeem_tokens: U256::from(617_250),
            })
        );
    }

    #[test]
    fn test_redeem_round_trip_never_gains() {
        // Exchange rate of 3 share units per 1 underlying unit leaves a remainder
        let (mut market, _clock) = create_test_market_with(test_params(WAD / U256::from(3)));
        let amount = U256::from(1_000);

        let minted = market.mint(ALICE, amount).unwrap();
        let redeemed = market.redeem(ALICE, minted).unwrap();

        assert!(redeemed <= amount);
        assert!(amount - redeemed <= U256::from(1));
    }

    #[test]
    fn test_redeem_insufficient_cash() {
        let (mut market, _clock) = create_test_market();
        let minted = market.mint(ALICE, U256::from(1_000) * WAD).unwrap();
        market.borrow(BOB, U256::from(900) * WAD).unwrap();
        let before = market.state();
        let events = market.events().len();

        let err = market.redeem(ALICE, minted).unwrap_err();

        assert_eq!(
            err,
            MarketError::InsufficientCash {
                requested: U256::from(1_000) * WAD,
                available: U256::from(100) * WAD,
            }
        );
        assert_eq!(market.state().total_supply, before.total_supply);
        assert_eq!(market.state().total_cash, before.total_cash);
        assert_eq!(market.balance_of(ALICE), minted);
        assert_eq!(market.events().len(), events);
    }

    #[test]
    fn test_redeem_insufficient_shares() {
        let (mut market, _clock) = create_test_market();
        let minted = market.mint(ALICE, U256::from(10) * WAD).unwrap();

        let err = market.redeem(ALICE, minted + U256::from(1)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientShares);
        assert_eq!(market.balance_of(ALICE), minted);
    }

    #[test]
    fn test_redeem_zero_rejected() {
        let (mut market, _clock) = create_test_market();
        let err = market.redeem(ALICE, U256::ZERO).unwrap_err();
        assert_eq!(err, MarketError::ZeroAmount);
    }

    #[test]
    fn test_redeem_underlying_burns_rounded_up() {
        let (mut market, _clock) = create_test_market_with(test_params(WAD / U256::from(3)));
        market.mint(ALICE, U256::from(1_000)).unwrap();
        let shares_before = market.balance_of(ALICE);

        let burned = market.redeem_underlying(ALICE, U256::from(10)).unwrap();

        // 10e18 / 333_333_333_333_333_333 is just above 30, so 31 shares burn
        assert_eq!(burned, U256::from(31));
        assert_eq!(market.balance_of(ALICE), shares_before - burned);
        assert_eq!(
            market.underlying().balance_of(ALICE),
            U256::from(1_000_000) * WAD - U256::from(990)
        );
    }

    #[test]
    fn test_failed_mint_after_accrual_rolls_back() {
        let (mut market, clock) = create_borrowed_market();
        let before = market.state();
        clock.advance(50);

        // Carol has no underlying: the transfer fails after interest was computed
        let err = market.mint(CAROL, U256::from(1) * WAD).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(market.state(), before);
        assert!(market.events().is_empty());

        // The accrual is still pending and applies on the next call
        assert!(market.accrue_interest().unwrap().is_some());
        assert_eq!(market.state().accrual_block_number, 150);
    }

    #[test]
    fn test_borrow_balance_grows_with_index() {
        let (mut market, clock) = create_borrowed_market();
        assert_eq!(
            market.borrow_balance_stored(BOB).unwrap(),
            U256::from(500) * WAD
        );

        clock.advance(1_000);
        let current = market.borrow_balance_current(BOB).unwrap();

        assert!(current > U256::from(500) * WAD);
        assert!(current <= market.state().total_borrows);
    }

    #[test]
    fn test_borrow_exceeds_cash() {
        let (mut market, _clock) = create_test_market();
        market.mint(ALICE, U256::from(100) * WAD).unwrap();

        let err = market.borrow(BOB, U256::from(101) * WAD).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientCash);
        assert_eq!(market.state().total_borrows, U256::ZERO);
    }

    #[test]
    fn test_borrow_records_snapshot_and_event() {
        let (mut market, _clock) = create_test_market();
        market.mint(ALICE, U256::from(100) * WAD).unwrap();

        let debt = market.borrow(BOB, U256::from(40) * WAD).unwrap();

        assert_eq!(debt, U256::from(40) * WAD);
        assert_eq!(
            market.borrow_snapshot(BOB),
            BorrowSnapshot {
                principal: U256::from(40) * WAD,
                interest_index: WAD,
            }
        );
        assert_eq!(market.state().total_cash, U256::from(60) * WAD);
        assert_eq!(market.events().last().map(MarketEvent::name), Some("Borrow"));
    }

    #[test]
    fn test_repay_full_debt() {
        let (mut market, clock) = create_borrowed_market();
        clock.advance(1_000);
        let owed = market.borrow_balance_current(BOB).unwrap();

        // Overpaying is capped at the debt
        let repaid = market.repay_borrow(BOB, owed * U256::from(2)).unwrap();

        assert_eq!(repaid, owed);
        assert_eq!(market.borrow_balance_stored(BOB).unwrap(), U256::ZERO);
        assert_eq!(market.borrow_snapshot(BOB), BorrowSnapshot::default());
        // Only rounding dust can remain in the aggregate
        assert!(market.state().total_borrows <= U256::from(1));
    }

    #[test]
    fn test_repay_partial() {
        let (mut market, _clock) = create_borrowed_market();

        let repaid = market.repay_borrow(BOB, U256::from(200) * WAD).unwrap();

        assert_eq!(repaid, U256::from(200) * WAD);
        assert_eq!(
            market.borrow_balance_stored(BOB).unwrap(),
            U256::from(300) * WAD
        );
        assert_eq!(market.state().total_cash, U256::from(700) * WAD);
    }

    #[test]
    fn test_repay_without_debt_rejected() {
        let (mut market, _clock) = create_borrowed_market();
        let err = market.repay_borrow(ALICE, U256::from(1) * WAD).unwrap_err();
        assert_eq!(err, MarketError::ZeroAmount);
    }

    #[test]
    fn test_supply_rate_below_borrow_rate() {
        let (market, _clock) = create_borrowed_market();
        let borrow_rate = market.get_borrow_rate().unwrap();
        let supply_rate = market.get_supply_rate().unwrap();

        assert!(supply_rate > U256::ZERO);
        assert!(supply_rate < borrow_rate);
        assert_eq!(market.utilization().unwrap(), percent(50));
    }

    #[test]
    fn test_take_events_drains() {
        let (mut market, _clock) = create_test_market();
        market.mint(ALICE, U256::from(1) * WAD).unwrap();

        let events = market.take_events();

        assert_eq!(events.len(), 1);
        assert!(market.events().is_empty());
    }

    #[test]
    fn test_share_balances_sorted() {
        let (mut market, _clock) = create_test_market();
        market.mint(BOB, U256::from(1) * WAD).unwrap();
        market.mint(ALICE, U256::from(2) * WAD).unwrap();

        let holders: Vec<Address> = market.share_balances().map(|(a, _)| a).collect();

        assert_eq!(holders, vec![BOB, ALICE]);
    }
}
