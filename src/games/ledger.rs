//! Fund-transfer capability
//!
//! Account balances live outside the table engine. The gateway only needs
//! to read a balance and move value between two accounts; `InMemoryLedger`
//! provides that for the server and for tests.

use crate::errors::{RouletteError, RouletteResult};
use crate::games::types::Address;
use dashmap::DashMap;
use std::sync::Arc;

/// Balance store the gateway debits and credits
pub trait FundsLedger: Send + Sync {
    /// Current balance of `account` (0 for unknown accounts)
    fn balance(&self, account: &Address) -> u64;

    /// Move `amount` from `from` to `to`, failing with `InsufficientFunds`
    /// without side effects when `from` cannot cover it.
    fn transfer(&self, from: &Address, to: &Address, amount: u64) -> RouletteResult<()>;

    /// Mint `amount` into `account` (account funding substrate)
    fn credit(&self, account: &Address, amount: u64) -> RouletteResult<()>;
}

/// Thread-safe in-memory balances
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    balances: Arc<DashMap<Address, u64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts that have ever held a balance
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    fn debit(&self, account: &Address, amount: u64) -> RouletteResult<()> {
        let mut entry = self.balances.entry(account.clone()).or_insert(0);
        let available = *entry;
        if available < amount {
            return Err(RouletteError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        *entry = available - amount;
        Ok(())
    }
}

impl FundsLedger for InMemoryLedger {
    fn balance(&self, account: &Address) -> u64 {
        self.balances.get(account).map(|b| *b).unwrap_or(0)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u64) -> RouletteResult<()> {
        if amount == 0 {
            return Ok(());
        }
        if from == to {
            return Err(RouletteError::Internal(format!("transfer from {} to itself", from)));
        }

        // Guards are released between the two steps; holding both could
        // deadlock when the accounts share a shard.
        self.debit(from, amount)?;
        if let Err(e) = self.credit(to, amount) {
            self.credit(from, amount)?;
            return Err(e);
        }
        Ok(())
    }

    fn credit(&self, account: &Address, amount: u64) -> RouletteResult<()> {
        let mut entry = self.balances.entry(account.clone()).or_insert(0);
        let updated = entry
            .checked_add(amount)
            .ok_or(RouletteError::ArithmeticOverflow("ledger credit"))?;
        *entry = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_moves_funds() {
        let ledger = InMemoryLedger::new();
        let alice = Address::new("alice");
        let table = Address::table_account("QWER123");
        ledger.credit(&alice, 5).unwrap();

        ledger.transfer(&alice, &table, 2).unwrap();

        assert_eq!(ledger.balance(&alice), 3);
        assert_eq!(ledger.balance(&table), 2);
    }

    #[test]
    fn test_insufficient_funds_has_no_effect() {
        let ledger = InMemoryLedger::new();
        let alice = Address::new("alice");
        let bob = Address::new("bob");
        ledger.credit(&alice, 1).unwrap();

        let err = ledger.transfer(&alice, &bob, 2).unwrap_err();

        assert!(matches!(err, RouletteError::InsufficientFunds { needed: 2, available: 1 }));
        assert_eq!(ledger.balance(&alice), 1);
        assert_eq!(ledger.balance(&bob), 0);
    }

    #[test]
    fn test_self_transfer_is_refused() {
        let ledger = InMemoryLedger::new();
        let table = Address::table_account("T1");

        let err = ledger.transfer(&table, &table, 5).unwrap_err();

        assert!(matches!(err, RouletteError::Internal(_)));
        assert_eq!(ledger.balance(&table), 0);
        assert!(ledger.transfer(&table, &table, 0).is_ok());
    }

    #[test]
    fn test_failed_credit_refunds_sender() {
        let ledger = InMemoryLedger::new();
        let alice = Address::new("alice");
        let whale = Address::new("whale");
        ledger.credit(&alice, 10).unwrap();
        ledger.credit(&whale, u64::MAX).unwrap();

        let err = ledger.transfer(&alice, &whale, 10).unwrap_err();

        assert!(matches!(err, RouletteError::ArithmeticOverflow(_)));
        assert_eq!(ledger.balance(&alice), 10);
    }

    #[test]
    fn test_concurrent_transfers_conserve_value() {
        let ledger = InMemoryLedger::new();
        let pool = Address::new("pool");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                let pool = pool.clone();
                std::thread::spawn(move || {
                    let who = Address::new(format!("player-{}", i));
                    ledger.credit(&who, 100).unwrap();
                    for _ in 0..50 {
                        ledger.transfer(&who, &pool, 2).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.balance(&pool), 8 * 100);
    }
}
