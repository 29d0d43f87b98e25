//! Block number source for interest accrual.
//!
//! The engine never reads wall-clock time. It asks an injected [`BlockClock`]
//! for the current block, which keeps accrual deterministic and testable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonic block counter.
pub trait BlockClock {
    fn current_block(&self) -> u64;
}

impl<C: BlockClock + ?Sized> BlockClock for &C {
    fn current_block(&self) -> u64 {
        (**self).current_block()
    }
}

impl<C: BlockClock + ?Sized> BlockClock for Arc<C> {
    fn current_block(&self) -> u64 {
        (**self).current_block()
    }
}

/// Manually driven clock.
///
/// Clones share the same counter, so a test can hand one clone to the market
/// and keep another to advance blocks.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    block: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(block: u64) -> Self {
        Self {
            block: Arc::new(AtomicU64::new(block)),
        }
    }

    /// Moves the clock forward by `blocks` and returns the new block number.
    /// Saturates at `u64::MAX` instead of wrapping.
    pub fn advance(&self, blocks: u64) -> u64 {
        let previous = self
            .block
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |block| {
                Some(block.saturating_add(blocks))
            })
            .unwrap_or_else(|block| block);
        previous.saturating_add(blocks)
    }

    /// Sets the block number. Nothing stops this from going backwards; the
    /// market rejects a regressed clock on its next accrual.
    pub fn set(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }
}

impl BlockClock for ManualClock {
    fn current_block(&self) -> u64 {
        self.block.load(Ordering::SeqCst)
    }
}
