//! Unn Interest-Bearing Deposit Market
//!
//! This crate implements a single tokenized deposit market: users deposit an
//! underlying asset and receive shares whose value grows as borrowers pay
//! interest.
//!
//! # Overview
//!
//! - A jump rate model prices borrows from the market's utilization
//! - An accrual engine compounds interest per block into the borrow index,
//!   total borrows and reserves
//! - Shares are minted and redeemed at the exchange rate
//!   `(cash + borrows - reserves) / supply`
//! - Every committed transition records a [`MarketEvent`]
//!
//! The block clock and the underlying asset are injected collaborators, so
//! the engine runs the same against a live chain adapter or the in-memory
//! doubles shipped here.
//!
//! # Example
//!
//! ```rust
//! use unn_rs_market::{InMemoryUnderlying, ManualClock, Market, MarketConfig, WAD};
//! use alloy_primitives::{address, U256};
//!
//! let config = MarketConfig::from_json(r#"{
//!     "name": "Unn Sample Token",
//!     "symbol": "uST",
//!     "decimals": 8,
//!     "underlying": "0x00000000000000000000000000000000000000ee",
//!     "initial_exchange_rate": "0.02",
//!     "reserve_factor": "0.1",
//!     "rate_model": {
//!         "base_rate_per_year": "0.05",
//!         "multiplier_per_year": "0.45",
//!         "jump_multiplier_per_year": "5",
//!         "kink": "0.95"
//!     }
//! }"#).unwrap();
//! let (model, params) = config.build().unwrap();
//!
//! let alice = address!("00000000000000000000000000000000000a11ce");
//! let bob = address!("0000000000000000000000000000000000000b0b");
//! let mut token = InMemoryUnderlying::new(address!("0000000000000000000000000000000000000001"));
//! token.mint_to(alice, U256::from(1_000) * WAD).unwrap();
//!
//! let clock = ManualClock::new(1);
//! let mut market = Market::new(params, model, clock.clone(), token).unwrap();
//! market.mint(alice, U256::from(1_000) * WAD).unwrap();
//! market.borrow(bob, U256::from(400) * WAD).unwrap();
//!
//! let before = market.exchange_rate_stored().unwrap();
//! clock.advance(10_000);
//! assert!(market.exchange_rate_current().unwrap() > before);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod irm;
pub mod market;
pub mod math;
pub mod underlying;

// Re-export commonly used types
pub use error::{ErrorKind, MarketError, Result};

pub use clock::{BlockClock, ManualClock};
pub use config::{decimal_to_wad, MarketConfig, RateModelConfig};
pub use events::MarketEvent;
pub use underlying::{InMemoryUnderlying, UnderlyingAsset};

// Market exports
pub use market::{
    Accrual, BorrowSnapshot, Market, MarketParams, MarketState, SimulatedMarket,
    DEFAULT_MAX_BORROW_RATE_PER_BLOCK,
};

// Math exports
pub use math::{rate_to_apy, rate_to_f64, RoundingDirection, BLOCKS_PER_YEAR, WAD};

// IRM exports
pub use irm::{utilization_rate, InterestRateModel, JumpRateModel};
