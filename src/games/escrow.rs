//! Escrow bookkeeping for a single table
//!
//! Tracks the pool a table holds (`accumulated`) and how much of it each
//! bettor has staked and not yet settled. No policy lives here; the table
//! state machine decides when each movement is allowed.

use crate::errors::{RouletteError, RouletteResult};
use crate::games::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowLedger {
    accumulated: u64,
    custody: BTreeMap<Address, u64>,
}

impl EscrowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total value currently held by the table
    pub fn accumulated(&self) -> u64 {
        self.accumulated
    }

    /// Unsettled stake held for `bettor`
    pub fn custody_of(&self, bettor: &Address) -> u64 {
        self.custody.get(bettor).copied().unwrap_or(0)
    }

    /// Sum of all unsettled stakes
    pub fn total_custody(&self) -> u64 {
        self.custody.values().sum()
    }

    /// Record an accepted stake
    pub fn deposit_stake(&mut self, bettor: &Address, amount: u64) -> RouletteResult<()> {
        let accumulated = self
            .accumulated
            .checked_add(amount)
            .ok_or(RouletteError::ArithmeticOverflow("escrow deposit"))?;
        let held = self
            .custody_of(bettor)
            .checked_add(amount)
            .ok_or(RouletteError::ArithmeticOverflow("escrow custody"))?;

        self.accumulated = accumulated;
        self.custody.insert(bettor.clone(), held);
        Ok(())
    }

    /// House liquidity added by the table owner
    pub fn add_liquidity(&mut self, amount: u64) -> RouletteResult<()> {
        self.accumulated = self
            .accumulated
            .checked_add(amount)
            .ok_or(RouletteError::ArithmeticOverflow("escrow liquidity"))?;
        Ok(())
    }

    /// Release a settled stake and pay `payout` out of the pool.
    ///
    /// Fails with `InsufficientPool` before touching any balance.
    pub fn settle(&mut self, bettor: &Address, stake: u64, payout: u64) -> RouletteResult<()> {
        if payout > self.accumulated {
            return Err(RouletteError::InsufficientPool {
                payout,
                accumulated: self.accumulated,
            });
        }

        let held = self.custody_of(bettor);
        let remaining = held.saturating_sub(stake);

        self.accumulated -= payout;
        if remaining == 0 {
            self.custody.remove(bettor);
        } else {
            self.custody.insert(bettor.clone(), remaining);
        }
        Ok(())
    }

    /// Empty the pool, returning what it held
    pub fn sweep(&mut self) -> u64 {
        self.custody.clear();
        std::mem::take(&mut self.accumulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    #[test]
    fn test_deposit_tracks_pool_and_custody() {
        let mut escrow = EscrowLedger::new();
        escrow.deposit_stake(&addr("alice"), 2).unwrap();
        escrow.deposit_stake(&addr("bob"), 5).unwrap();

        assert_eq!(escrow.accumulated(), 7);
        assert_eq!(escrow.custody_of(&addr("alice")), 2);
        assert_eq!(escrow.total_custody(), 7);
    }

    #[test]
    fn test_winning_settlement_draws_from_pool() {
        let mut escrow = EscrowLedger::new();
        escrow.add_liquidity(100).unwrap();
        escrow.deposit_stake(&addr("alice"), 2).unwrap();

        escrow.settle(&addr("alice"), 2, 4).unwrap();

        assert_eq!(escrow.accumulated(), 98);
        assert_eq!(escrow.custody_of(&addr("alice")), 0);
    }

    #[test]
    fn test_losing_settlement_keeps_stake_in_pool() {
        let mut escrow = EscrowLedger::new();
        escrow.deposit_stake(&addr("alice"), 2).unwrap();

        escrow.settle(&addr("alice"), 2, 0).unwrap();

        assert_eq!(escrow.accumulated(), 2);
        assert_eq!(escrow.total_custody(), 0);
    }

    #[test]
    fn test_insufficient_pool_leaves_state_untouched() {
        let mut escrow = EscrowLedger::new();
        escrow.deposit_stake(&addr("alice"), 2).unwrap();
        let before = escrow.clone();

        let err = escrow.settle(&addr("alice"), 2, 72).unwrap_err();

        assert!(matches!(err, RouletteError::InsufficientPool { payout: 72, accumulated: 2 }));
        assert_eq!(escrow, before);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let mut escrow = EscrowLedger::new();
        escrow.add_liquidity(u64::MAX).unwrap();

        let err = escrow.deposit_stake(&addr("alice"), 1).unwrap_err();
        assert!(matches!(err, RouletteError::ArithmeticOverflow(_)));
        assert_eq!(escrow.custody_of(&addr("alice")), 0);
    }

    #[test]
    fn test_sweep_empties_pool() {
        let mut escrow = EscrowLedger::new();
        escrow.add_liquidity(10).unwrap();
        escrow.deposit_stake(&addr("alice"), 3).unwrap();

        assert_eq!(escrow.sweep(), 13);
        assert_eq!(escrow.accumulated(), 0);
        assert_eq!(escrow.total_custody(), 0);
    }
}
