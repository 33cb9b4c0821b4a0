//! Request gateway
//!
//! Entry points for every table operation. Each request locks its table,
//! applies the transition to a staged copy, moves funds, persists the staged
//! copy and only then publishes it. A failure at any step unwinds the fund
//! movements, so callers never observe a half-applied request.

use crate::errors::{RouletteError, RouletteResult};
use crate::games::entropy::EntropySource;
use crate::games::ledger::FundsLedger;
use crate::games::table::TablePolicy;
use crate::games::types::{
    ActionReceipt, Address, Bet, Settlement, SpinRecord, Table, TableAction, TableRequest,
};
use crate::metrics::TableMetrics;
use crate::storage::TableStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

/// One fund movement belonging to a request
#[derive(Debug, Clone)]
struct Transfer {
    from: Address,
    to: Address,
    amount: u64,
}

impl Transfer {
    fn new(from: &Address, to: &Address, amount: u64) -> Self {
        Self {
            from: from.clone(),
            to: to.clone(),
            amount,
        }
    }
}

fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

pub struct TableProcessor {
    tables: DashMap<String, Arc<Mutex<Table>>>,
    store: Arc<dyn TableStore>,
    ledger: Arc<dyn FundsLedger>,
    entropy: Arc<dyn EntropySource>,
    policy: TablePolicy,
    metrics: Arc<TableMetrics>,
}

impl TableProcessor {
    pub fn new(
        store: Arc<dyn TableStore>,
        ledger: Arc<dyn FundsLedger>,
        entropy: Arc<dyn EntropySource>,
        policy: TablePolicy,
        metrics: Arc<TableMetrics>,
    ) -> Self {
        Self {
            tables: DashMap::new(),
            store,
            ledger,
            entropy,
            policy,
            metrics,
        }
    }

    /// Load every persisted table into memory. Returns how many were loaded.
    pub fn restore(&self) -> RouletteResult<usize> {
        let tables = self.store.load_all()?;
        let count = tables.len();
        for table in tables {
            self.tables.insert(table.id.clone(), Arc::new(Mutex::new(table)));
        }
        if count > 0 {
            info!(tables = count, "Restored tables from store");
        }
        Ok(count)
    }

    pub fn policy(&self) -> &TablePolicy {
        &self.policy
    }

    pub fn metrics(&self) -> &Arc<TableMetrics> {
        &self.metrics
    }

    pub fn entropy_source(&self) -> &'static str {
        self.entropy.name()
    }

    pub fn balance(&self, account: &Address) -> u64 {
        self.ledger.balance(account)
    }

    /// Create a table owned by `owner`, charging the configured rent reserve
    pub fn create(&self, table_id: &str, owner: &Address) -> RouletteResult<Table> {
        self.track("create", table_id, || {
            ensure_party(owner)?;
            self.policy.validate_identifier(table_id)?;

            let slot = match self.tables.entry(table_id.to_string()) {
                Entry::Occupied(_) => return Err(RouletteError::AlreadyExists(table_id.to_string())),
                Entry::Vacant(slot) => slot,
            };

            let table = Table::new(table_id, owner.clone(), self.policy.rent_reserve, now_secs());
            let rent = Transfer::new(owner, &Address::table_account(table_id), table.rent_reserve);
            self.apply_and_persist(None, &table, &[rent])?;

            slot.insert(Arc::new(Mutex::new(table.clone())));
            self.metrics.record_table_created();
            info!(table = %table_id, owner = %owner, rent = table.rent_reserve, "Table created");
            Ok(table)
        })
    }

    pub fn bet(&self, table_id: &str, bettor: &Address, position: &str, amount: u64) -> RouletteResult<Bet> {
        self.track("bet", table_id, || {
            ensure_party(bettor)?;
            let (bet, accumulated) = self.transition(table_id, |staged| {
                let bet = staged.place_bet(&self.policy, bettor, position, amount, now_secs())?;
                let stake = Transfer::new(bettor, &Address::table_account(table_id), amount);
                Ok(((bet, staged.accumulated()), vec![stake]))
            })?;

            self.metrics.record_bet(amount);
            info!(
                table = %table_id,
                bettor = %bettor,
                position = %bet.position,
                amount,
                accumulated,
                "Bet accepted"
            );
            Ok(bet)
        })
    }

    pub fn spin(&self, table_id: &str, caller: &Address) -> RouletteResult<SpinRecord> {
        self.track("spin", table_id, || {
            ensure_party(caller)?;
            let record = self.transition(table_id, |staged| {
                let record = staged.spin(&self.policy, caller, self.entropy.as_ref(), now_secs())?;
                Ok((record, Vec::new()))
            })?;

            self.metrics.record_spin();
            info!(
                table = %table_id,
                caller = %caller,
                result = record.result,
                provable = record.proof.is_some(),
                "Table spun"
            );
            Ok(record)
        })
    }

    pub fn claim_prize(&self, table_id: &str, bettor: &Address) -> RouletteResult<Settlement> {
        self.track("claim_prize", table_id, || {
            ensure_party(bettor)?;
            let settlement = self.transition(table_id, |staged| {
                let settlement = staged.claim(bettor)?;
                let payout = Transfer::new(&Address::table_account(table_id), bettor, settlement.payout);
                Ok((settlement, vec![payout]))
            })?;

            self.metrics.record_claim(settlement.payout);
            info!(
                table = %table_id,
                bettor = %bettor,
                position = %settlement.position,
                result = settlement.result,
                outcome = ?settlement.outcome,
                payout = settlement.payout,
                "Bet settled"
            );
            Ok(settlement)
        })
    }

    /// Owner adds house liquidity so winning payouts can be covered
    pub fn fund(&self, table_id: &str, caller: &Address, amount: u64) -> RouletteResult<u64> {
        self.track("fund", table_id, || {
            ensure_party(caller)?;
            let accumulated = self.transition(table_id, |staged| {
                let accumulated = staged.fund(caller, amount)?;
                let deposit = Transfer::new(caller, &Address::table_account(table_id), amount);
                Ok((accumulated, vec![deposit]))
            })?;

            self.metrics.record_funding(amount);
            info!(table = %table_id, amount, accumulated, "Table funded");
            Ok(accumulated)
        })
    }

    /// Archive a settled table, returning its remaining funds to the owner
    pub fn close(&self, table_id: &str, caller: &Address) -> RouletteResult<u64> {
        self.track("close", table_id, || {
            ensure_party(caller)?;
            let returned = self.transition(table_id, |staged| {
                let returned = staged.close(caller)?;
                let refund = Transfer::new(&Address::table_account(table_id), &staged.owner, returned);
                Ok((returned, vec![refund]))
            })?;

            self.metrics.record_table_closed();
            info!(table = %table_id, returned, "Table closed");
            Ok(returned)
        })
    }

    /// Dispatch an authenticated request
    pub fn execute(&self, request: TableRequest) -> RouletteResult<ActionReceipt> {
        let TableRequest {
            table_id,
            caller,
            action,
        } = request;

        match action {
            TableAction::Create => {
                self.create(&table_id, &caller)?;
                Ok(ActionReceipt::Created { table_id })
            }
            TableAction::Bet { position, amount } => {
                let bet = self.bet(&table_id, &caller, &position, amount)?;
                let accumulated = self.get_table(&table_id)?.accumulated();
                Ok(ActionReceipt::BetPlaced {
                    table_id,
                    bet,
                    accumulated,
                })
            }
            TableAction::Spin => {
                let spin = self.spin(&table_id, &caller)?;
                Ok(ActionReceipt::Spun { table_id, spin })
            }
            TableAction::ClaimPrize => {
                let settlement = self.claim_prize(&table_id, &caller)?;
                Ok(ActionReceipt::Claimed { table_id, settlement })
            }
            TableAction::Fund { amount } => {
                let accumulated = self.fund(&table_id, &caller, amount)?;
                Ok(ActionReceipt::Funded { table_id, accumulated })
            }
            TableAction::Close => {
                let returned = self.close(&table_id, &caller)?;
                Ok(ActionReceipt::Closed { table_id, returned })
            }
        }
    }

    /// Snapshot of a table's committed state
    pub fn get_table(&self, table_id: &str) -> RouletteResult<Table> {
        let handle = self.handle(table_id)?;
        let table = lock(&handle)?;
        Ok(table.clone())
    }

    /// Snapshots of every table, ordered by identifier
    pub fn list_tables(&self) -> RouletteResult<Vec<Table>> {
        let handles: Vec<_> = self.tables.iter().map(|e| Arc::clone(e.value())).collect();
        let mut tables = Vec::with_capacity(handles.len());
        for handle in handles {
            tables.push(lock(&handle)?.clone());
        }
        tables.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tables)
    }

    fn handle(&self, table_id: &str) -> RouletteResult<Arc<Mutex<Table>>> {
        self.tables
            .get(table_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RouletteError::TableNotFound(table_id.to_string()))
    }

    /// Run `apply` against a staged copy under the table lock and commit it
    /// together with the transfers it asks for.
    fn transition<T, F>(&self, table_id: &str, apply: F) -> RouletteResult<T>
    where
        F: FnOnce(&mut Table) -> RouletteResult<(T, Vec<Transfer>)>,
    {
        let handle = self.handle(table_id)?;
        let mut current = lock(&handle)?;

        let mut staged = current.clone();
        let (output, transfers) = apply(&mut staged)?;
        self.apply_and_persist(Some(&*current), &staged, &transfers)?;

        *current = staged;
        Ok(output)
    }

    /// Commit `staged` with its transfers. Funds flowing into the table move
    /// first and are undone if persisting fails. Funds leaving the table move
    /// only after the staged record is durable; if one of those fails the
    /// `previous` record is written back.
    fn apply_and_persist(
        &self,
        previous: Option<&Table>,
        staged: &Table,
        transfers: &[Transfer],
    ) -> RouletteResult<()> {
        let escrow = Address::table_account(&staged.id);
        let (outbound, inbound): (Vec<&Transfer>, Vec<&Transfer>) =
            transfers.iter().partition(|t| t.from == escrow);

        let mut applied: Vec<&Transfer> = Vec::with_capacity(inbound.len());
        for transfer in inbound {
            if let Err(e) = self.ledger.transfer(&transfer.from, &transfer.to, transfer.amount) {
                self.unwind(&staged.id, &applied)?;
                return Err(e);
            }
            applied.push(transfer);
        }

        if let Err(e) = self.store.save(staged) {
            error!(table = %staged.id, error = %e, "Persisting table failed, unwinding transfers");
            self.unwind(&staged.id, &applied)?;
            return Err(e);
        }

        for transfer in outbound {
            if let Err(e) = self.ledger.transfer(&transfer.from, &transfer.to, transfer.amount) {
                warn!(table = %staged.id, to = %transfer.to, error = %e, "Payout failed, restoring table record");
                if let Some(previous) = previous {
                    if let Err(restore) = self.store.save(previous) {
                        error!(table = %staged.id, error = %restore, "Failed to restore table record");
                        return Err(RouletteError::Internal(format!(
                            "table {} record diverged from ledger: {}",
                            staged.id, restore
                        )));
                    }
                }
                self.unwind(&staged.id, &applied)?;
                return Err(e);
            }
        }
        Ok(())
    }

    fn unwind(&self, table_id: &str, applied: &[&Transfer]) -> RouletteResult<()> {
        for transfer in applied.iter().rev() {
            if let Err(e) = self.ledger.transfer(&transfer.to, &transfer.from, transfer.amount) {
                error!(
                    table = %table_id,
                    from = %transfer.to,
                    to = %transfer.from,
                    amount = transfer.amount,
                    error = %e,
                    "Failed to reverse transfer"
                );
                return Err(RouletteError::Internal(format!(
                    "could not reverse transfer on table {}: {}",
                    table_id, e
                )));
            }
        }
        Ok(())
    }

    fn track<T, F>(&self, action: &'static str, table_id: &str, op: F) -> RouletteResult<T>
    where
        F: FnOnce() -> RouletteResult<T>,
    {
        let result = op();
        if let Err(ref e) = result {
            self.metrics.record_rejection(e.code());
            if e.is_rejection() {
                warn!(table = %table_id, action, code = e.code(), "Request rejected: {}", e);
            } else {
                error!(table = %table_id, action, code = e.code(), "Request failed: {}", e);
            }
        }
        result
    }
}

/// Table escrow accounts never act as callers
fn ensure_party(caller: &Address) -> RouletteResult<()> {
    if caller.is_table_account() {
        return Err(RouletteError::ReservedAddress(caller.to_string()));
    }
    Ok(())
}

fn lock(handle: &Mutex<Table>) -> RouletteResult<MutexGuard<'_, Table>> {
    handle
        .lock()
        .map_err(|_| RouletteError::Internal("table lock poisoned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpinAuthority;
    use crate::games::entropy::FixedEntropy;
    use crate::games::ledger::InMemoryLedger;
    use crate::games::types::GameOutcome;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store whose writes can be switched off
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl TableStore for FlakyStore {
        fn load(&self, id: &str) -> RouletteResult<Option<Table>> {
            self.inner.load(id)
        }

        fn save(&self, table: &Table) -> RouletteResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(crate::errors::StorageError::WriteFailed("disk full".to_string()).into());
            }
            self.inner.save(table)
        }

        fn load_all(&self) -> RouletteResult<Vec<Table>> {
            self.inner.load_all()
        }

        fn get_meta(&self, key: &[u8]) -> RouletteResult<Option<Vec<u8>>> {
            self.inner.get_meta(key)
        }

        fn put_meta(&self, key: &[u8], value: &[u8]) -> RouletteResult<()> {
            self.inner.put_meta(key, value)
        }
    }

    struct Harness {
        processor: TableProcessor,
        ledger: Arc<InMemoryLedger>,
        store: Arc<FlakyStore>,
    }

    fn harness(result: u32, policy: TablePolicy) -> Harness {
        let ledger = Arc::new(InMemoryLedger::new());
        let store = Arc::new(FlakyStore::default());
        let processor = TableProcessor::new(
            store.clone(),
            ledger.clone(),
            Arc::new(FixedEntropy::constant(result)),
            policy,
            Arc::new(TableMetrics::new()),
        );
        Harness {
            processor,
            ledger,
            store,
        }
    }

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    #[test]
    fn test_create_twice_fails() {
        let h = harness(1, TablePolicy::default());
        h.processor.create("QWER123", &addr("owner")).unwrap();

        let err = h.processor.create("QWER123", &addr("other")).unwrap_err();

        assert!(matches!(err, RouletteError::AlreadyExists(_)));
        assert_eq!(h.processor.get_table("QWER123").unwrap().owner, addr("owner"));
    }

    #[test]
    fn test_create_charges_rent_reserve() {
        let policy = TablePolicy {
            rent_reserve: 3,
            ..Default::default()
        };
        let h = harness(1, policy);

        let err = h.processor.create("T1", &addr("owner")).unwrap_err();
        assert!(matches!(err, RouletteError::InsufficientFunds { .. }));
        assert!(h.processor.get_table("T1").is_err());

        h.ledger.credit(&addr("owner"), 10).unwrap();
        h.processor.create("T1", &addr("owner")).unwrap();
        assert_eq!(h.ledger.balance(&addr("owner")), 7);
        assert_eq!(h.ledger.balance(&Address::table_account("T1")), 3);
    }

    #[test]
    fn test_bet_debits_bettor_and_credits_table() {
        let h = harness(1, TablePolicy::default());
        h.ledger.credit(&addr("alice"), 5).unwrap();
        h.processor.create("T1", &addr("owner")).unwrap();

        h.processor.bet("T1", &addr("alice"), "RED", 2).unwrap();

        assert_eq!(h.ledger.balance(&addr("alice")), 3);
        assert_eq!(h.ledger.balance(&Address::table_account("T1")), 2);
        assert_eq!(h.processor.get_table("T1").unwrap().accumulated(), 2);
    }

    #[test]
    fn test_insufficient_funds_leaves_table_unchanged() {
        let h = harness(1, TablePolicy::default());
        h.ledger.credit(&addr("alice"), 1).unwrap();
        h.processor.create("T1", &addr("owner")).unwrap();

        let err = h.processor.bet("T1", &addr("alice"), "RED", 2).unwrap_err();

        assert!(matches!(err, RouletteError::InsufficientFunds { needed: 2, available: 1 }));
        let table = h.processor.get_table("T1").unwrap();
        assert!(table.positions.is_empty());
        assert_eq!(table.accumulated(), 0);
        assert_eq!(h.processor.metrics().rejections_for("INSUFFICIENT_FUNDS"), 1);
    }

    #[test]
    fn test_failed_persist_rolls_back_funds_and_state() {
        let h = harness(1, TablePolicy::default());
        h.ledger.credit(&addr("alice"), 5).unwrap();
        h.processor.create("T1", &addr("owner")).unwrap();

        h.store.failing.store(true, Ordering::SeqCst);
        let err = h.processor.bet("T1", &addr("alice"), "RED", 2).unwrap_err();

        assert!(matches!(err, RouletteError::Storage(_)));
        assert_eq!(h.ledger.balance(&addr("alice")), 5);
        assert_eq!(h.ledger.balance(&Address::table_account("T1")), 0);
        assert!(h.processor.get_table("T1").unwrap().positions.is_empty());

        // Retrying once storage recovers succeeds
        h.store.failing.store(false, Ordering::SeqCst);
        h.processor.bet("T1", &addr("alice"), "RED", 2).unwrap();
        assert_eq!(h.store.load("T1").unwrap().unwrap().positions.len(), 1);
    }

    #[test]
    fn test_failed_spin_persist_does_not_set_result() {
        let h = harness(1, TablePolicy::default());
        h.ledger.credit(&addr("alice"), 5).unwrap();
        h.processor.create("T1", &addr("owner")).unwrap();
        h.processor.bet("T1", &addr("alice"), "RED", 2).unwrap();

        h.store.failing.store(true, Ordering::SeqCst);
        assert!(h.processor.spin("T1", &addr("owner")).is_err());
        assert_eq!(h.processor.get_table("T1").unwrap().result, None);
    }

    #[test]
    fn test_full_round_pays_winner() {
        let h = harness(1, TablePolicy::default());
        h.ledger.credit(&addr("owner"), 100).unwrap();
        h.ledger.credit(&addr("alice"), 5).unwrap();
        h.ledger.credit(&addr("bob"), 5).unwrap();

        h.processor.create("T1", &addr("owner")).unwrap();
        h.processor.fund("T1", &addr("owner"), 100).unwrap();
        h.processor.bet("T1", &addr("alice"), "RED", 2).unwrap();
        h.processor.bet("T1", &addr("bob"), "BLACK", 2).unwrap();
        assert_eq!(h.processor.spin("T1", &addr("owner")).unwrap().result, 1);

        let alice = h.processor.claim_prize("T1", &addr("alice")).unwrap();
        let bob = h.processor.claim_prize("T1", &addr("bob")).unwrap();

        assert_eq!(alice.outcome, GameOutcome::Win);
        assert_eq!(h.ledger.balance(&addr("alice")), 3 + 4);
        assert_eq!(bob.outcome, GameOutcome::Loss);
        assert_eq!(h.ledger.balance(&addr("bob")), 3);

        let table = h.processor.get_table("T1").unwrap();
        assert_eq!(table.accumulated(), 100);
        assert_eq!(h.ledger.balance(&Address::table_account("T1")), table.accumulated());

        assert_eq!(h.processor.close("T1", &addr("owner")).unwrap(), 100);
        assert_eq!(h.ledger.balance(&addr("owner")), 100);
        assert_eq!(h.ledger.balance(&Address::table_account("T1")), 0);
    }

    #[test]
    fn test_table_account_cannot_act_as_caller() {
        let policy = TablePolicy {
            spin_authority: SpinAuthority::Anyone,
            ..Default::default()
        };
        let h = harness(1, policy);
        let escrow = Address::table_account("T1");
        h.ledger.credit(&addr("alice"), 5).unwrap();
        h.processor.create("T1", &addr("owner")).unwrap();
        h.processor.bet("T1", &addr("alice"), "RED", 2).unwrap();

        let err = h.processor.bet("T1", &escrow, "RED", 1_000_000).unwrap_err();
        assert!(matches!(err, RouletteError::ReservedAddress(_)));
        assert!(matches!(
            h.processor.create("T2", &Address::table_account("T2")),
            Err(RouletteError::ReservedAddress(_))
        ));
        assert!(matches!(h.processor.spin("T1", &escrow), Err(RouletteError::ReservedAddress(_))));
        assert!(matches!(h.processor.fund("T1", &escrow, 1), Err(RouletteError::ReservedAddress(_))));
        assert!(matches!(h.processor.claim_prize("T1", &escrow), Err(RouletteError::ReservedAddress(_))));
        assert!(matches!(h.processor.close("T1", &escrow), Err(RouletteError::ReservedAddress(_))));

        let table = h.processor.get_table("T1").unwrap();
        assert_eq!(table.positions.len(), 1);
        assert_eq!(table.accumulated(), 2);
        assert_eq!(h.ledger.balance(&escrow), table.accumulated());
        assert_eq!(h.processor.metrics().rejections_for("RESERVED_ADDRESS"), 6);
    }

    #[test]
    fn test_failed_claim_persist_pays_nothing() {
        let h = harness(1, TablePolicy::default());
        h.ledger.credit(&addr("owner"), 10).unwrap();
        h.ledger.credit(&addr("alice"), 5).unwrap();
        h.processor.create("T1", &addr("owner")).unwrap();
        h.processor.fund("T1", &addr("owner"), 10).unwrap();
        h.processor.bet("T1", &addr("alice"), "RED", 2).unwrap();
        h.processor.spin("T1", &addr("owner")).unwrap();

        h.store.failing.store(true, Ordering::SeqCst);
        let err = h.processor.claim_prize("T1", &addr("alice")).unwrap_err();

        assert!(matches!(err, RouletteError::Storage(_)));
        assert_eq!(h.ledger.balance(&addr("alice")), 3);
        assert_eq!(h.ledger.balance(&Address::table_account("T1")), 12);
        assert!(!h.processor.get_table("T1").unwrap().positions[0].is_claimed);

        h.store.failing.store(false, Ordering::SeqCst);
        assert_eq!(h.processor.claim_prize("T1", &addr("alice")).unwrap().payout, 4);
        assert_eq!(h.ledger.balance(&addr("alice")), 7);
        assert!(matches!(
            h.processor.claim_prize("T1", &addr("alice")),
            Err(RouletteError::AlreadyClaimed(_))
        ));
        assert_eq!(h.ledger.balance(&addr("alice")), 7);
    }

    #[test]
    fn test_failed_payout_restores_table_record() {
        let h = harness(1, TablePolicy::default());
        h.ledger.credit(&addr("owner"), 10).unwrap();
        h.ledger.credit(&addr("alice"), 5).unwrap();
        h.processor.create("T1", &addr("owner")).unwrap();
        h.processor.fund("T1", &addr("owner"), 10).unwrap();
        h.processor.bet("T1", &addr("alice"), "RED", 2).unwrap();
        h.processor.spin("T1", &addr("owner")).unwrap();

        // Crediting the payout would overflow alice's balance
        h.ledger.credit(&addr("alice"), u64::MAX - 3).unwrap();
        let err = h.processor.claim_prize("T1", &addr("alice")).unwrap_err();

        assert!(matches!(err, RouletteError::ArithmeticOverflow(_)));
        assert_eq!(h.ledger.balance(&Address::table_account("T1")), 12);
        let persisted = h.store.load("T1").unwrap().unwrap();
        assert!(!persisted.positions[0].is_claimed);
        assert_eq!(persisted.accumulated(), 12);
        assert_eq!(h.processor.get_table("T1").unwrap(), persisted);
    }

    #[test]
    fn test_unknown_table() {
        let h = harness(1, TablePolicy::default());

        let err = h.processor.bet("nope", &addr("alice"), "RED", 2).unwrap_err();
        assert!(matches!(err, RouletteError::TableNotFound(_)));
    }

    #[test]
    fn test_execute_dispatches_actions() {
        let policy = TablePolicy {
            spin_authority: SpinAuthority::Anyone,
            ..Default::default()
        };
        let h = harness(0, policy);
        h.ledger.credit(&addr("alice"), 5).unwrap();

        let request = |action| TableRequest {
            table_id: "T1".to_string(),
            caller: addr("alice"),
            action,
        };

        h.processor.execute(request(TableAction::Create)).unwrap();
        let receipt = h
            .processor
            .execute(request(TableAction::Bet {
                position: "EVEN".to_string(),
                amount: 2,
            }))
            .unwrap();
        assert!(matches!(receipt, ActionReceipt::BetPlaced { accumulated: 2, .. }));

        let receipt = h.processor.execute(request(TableAction::Spin)).unwrap();
        assert!(matches!(receipt, ActionReceipt::Spun { ref spin, .. } if spin.result == 0));

        let receipt = h.processor.execute(request(TableAction::ClaimPrize)).unwrap();
        match receipt {
            ActionReceipt::Claimed { settlement, .. } => assert_eq!(settlement.payout, 0),
            other => panic!("unexpected receipt {:?}", other),
        }
    }

    #[test]
    fn test_restore_reloads_tables() {
        let h = harness(1, TablePolicy::default());
        h.ledger.credit(&addr("alice"), 5).unwrap();
        h.processor.create("T1", &addr("owner")).unwrap();
        h.processor.bet("T1", &addr("alice"), "ODD", 2).unwrap();

        let reopened = TableProcessor::new(
            h.store.clone(),
            h.ledger.clone(),
            Arc::new(FixedEntropy::constant(1)),
            TablePolicy::default(),
            Arc::new(TableMetrics::new()),
        );
        assert_eq!(reopened.restore().unwrap(), 1);
        assert_eq!(reopened.get_table("T1").unwrap(), h.processor.get_table("T1").unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_bets_are_linearizable() {
        let h = harness(1, TablePolicy::default());
        let processor = Arc::new(h.processor);
        processor.create("T1", &addr("owner")).unwrap();

        let mut handles = Vec::new();
        for i in 0..13 {
            let bettor = addr(&format!("bettor-{}", i));
            h.ledger.credit(&bettor, 5).unwrap();
            let processor = processor.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                processor.bet("T1", &bettor, "ODD", 2)
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let table = processor.get_table("T1").unwrap();
        assert_eq!(table.positions.len(), 13);
        assert_eq!(table.accumulated(), 26);

        let mut bettors: Vec<_> = table.positions.iter().map(|b| b.bettor.clone()).collect();
        bettors.sort();
        bettors.dedup();
        assert_eq!(bettors.len(), 13);
    }
}
