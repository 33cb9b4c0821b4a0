//! Table state machine
//!
//! `Created → Accepting → Spun → Settled`, with `Closed` as an owner-driven
//! archival step. Every transition validates first and mutates last, so a
//! rejected call leaves the table exactly as it was. Fund movement outside
//! the table (bettor balances) is the gateway's job.

use crate::config::{SpinAuthority, TableConfig};
use crate::errors::{RouletteError, RouletteResult};
use crate::games::entropy::EntropySource;
use crate::games::escrow::EscrowLedger;
use crate::games::positions::{self, WHEEL_SIZE};
use crate::games::types::{Address, Bet, GameOutcome, Settlement, SpinRecord, Table, TableStatus};

/// Rules a table enforces, derived from `[table]` configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePolicy {
    pub max_bets: usize,
    pub min_bet: u64,
    pub max_bet: Option<u64>,
    pub spin_authority: SpinAuthority,
    pub rent_reserve: u64,
    pub max_identifier_len: usize,
}

impl Default for TablePolicy {
    fn default() -> Self {
        Self::from(&TableConfig::default())
    }
}

impl From<&TableConfig> for TablePolicy {
    fn from(config: &TableConfig) -> Self {
        Self {
            max_bets: config.max_bets_per_table,
            min_bet: config.min_bet,
            max_bet: config.max_bet,
            spin_authority: config.spin_authority,
            rent_reserve: config.rent_reserve,
            max_identifier_len: config.max_identifier_len,
        }
    }
}

impl TablePolicy {
    /// Identifiers are non-empty ASCII alphanumerics plus `-` and `_`
    pub fn validate_identifier(&self, id: &str) -> RouletteResult<()> {
        if id.is_empty() || id.len() > self.max_identifier_len {
            return Err(RouletteError::InvalidIdentifier(format!(
                "length must be 1..={} (got {})",
                self.max_identifier_len,
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(RouletteError::InvalidIdentifier(id.to_string()));
        }
        Ok(())
    }

    fn validate_amount(&self, amount: u64) -> RouletteResult<()> {
        if amount == 0 {
            return Err(RouletteError::InvalidAmount("amount must be greater than zero".to_string()));
        }
        if amount < self.min_bet {
            return Err(RouletteError::InvalidAmount(format!(
                "{} is below the minimum bet of {}",
                amount, self.min_bet
            )));
        }
        if let Some(max) = self.max_bet {
            if amount > max {
                return Err(RouletteError::InvalidAmount(format!(
                    "{} exceeds the maximum bet of {}",
                    amount, max
                )));
            }
        }
        Ok(())
    }
}

impl Table {
    pub fn new(id: impl Into<String>, owner: Address, rent_reserve: u64, now: u64) -> Self {
        Self {
            id: id.into(),
            owner,
            positions: Vec::new(),
            result: None,
            escrow: EscrowLedger::new(),
            spin: None,
            rent_reserve,
            closed: false,
            created_at: now,
        }
    }

    pub fn accumulated(&self) -> u64 {
        self.escrow.accumulated()
    }

    pub fn status(&self) -> TableStatus {
        if self.closed {
            TableStatus::Closed
        } else if self.result.is_some() {
            if self.unclaimed_count() == 0 {
                TableStatus::Settled
            } else {
                TableStatus::Spun
            }
        } else if self.positions.is_empty() {
            TableStatus::Created
        } else {
            TableStatus::Accepting
        }
    }

    pub fn find_bet(&self, bettor: &Address) -> Option<&Bet> {
        self.positions.iter().find(|b| &b.bettor == bettor)
    }

    pub fn unclaimed_count(&self) -> usize {
        self.positions.iter().filter(|b| !b.is_claimed).count()
    }

    fn ensure_open(&self) -> RouletteResult<()> {
        if self.closed {
            return Err(RouletteError::TableClosed(self.id.clone()));
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &Address, action: &str) -> RouletteResult<()> {
        if caller != &self.owner {
            return Err(RouletteError::Unauthorized(format!(
                "only the owner of table {} may {}",
                self.id, action
            )));
        }
        Ok(())
    }

    /// Record a bet. The caller has already checked (and will debit) the
    /// bettor's balance.
    pub fn place_bet(
        &mut self,
        policy: &TablePolicy,
        bettor: &Address,
        position_name: &str,
        amount: u64,
        now: u64,
    ) -> RouletteResult<Bet> {
        self.ensure_open()?;
        if self.result.is_some() {
            return Err(RouletteError::BettingClosed(self.id.clone()));
        }

        let entry = positions::resolve(position_name)?;
        policy.validate_amount(amount)?;

        if self.find_bet(bettor).is_some() {
            return Err(RouletteError::DuplicateBet(bettor.to_string()));
        }
        if self.positions.len() >= policy.max_bets {
            return Err(RouletteError::TableFull {
                table_id: self.id.clone(),
                capacity: policy.max_bets,
            });
        }

        self.escrow.deposit_stake(bettor, amount)?;

        let bet = Bet {
            bettor: bettor.clone(),
            position: entry.position,
            amount,
            is_claimed: false,
            placed_at: now,
        };
        self.positions.push(bet.clone());
        Ok(bet)
    }

    /// Input bound into the entropy draw for this table's spin
    pub fn spin_context(&self, now: u64) -> String {
        format!(
            "roulette:{}:bets:{}:accumulated:{}:at:{}",
            self.id,
            self.positions.len(),
            self.accumulated(),
            now
        )
    }

    /// Draw the winning number, once
    pub fn spin(
        &mut self,
        policy: &TablePolicy,
        caller: &Address,
        entropy: &dyn EntropySource,
        now: u64,
    ) -> RouletteResult<SpinRecord> {
        self.ensure_open()?;
        if self.result.is_some() {
            return Err(RouletteError::AlreadySpun(self.id.clone()));
        }
        if self.positions.is_empty() {
            return Err(RouletteError::NoBetsPlaced(self.id.clone()));
        }
        if policy.spin_authority == SpinAuthority::OwnerOnly {
            self.ensure_owner(caller, "spin")?;
        }

        let context = self.spin_context(now);
        let draw = entropy.next_uniform(u32::from(WHEEL_SIZE), &context)?;
        let result = u8::try_from(draw.value)
            .ok()
            .filter(|v| *v < WHEEL_SIZE)
            .ok_or_else(|| {
                RouletteError::Entropy(format!("{} returned {} outside 0..37", entropy.name(), draw.value))
            })?;

        tracing::debug!(table = %self.id, source = entropy.name(), result, "Entropy drawn");

        let record = SpinRecord {
            result,
            spun_by: caller.clone(),
            spun_at: now,
            proof: draw.proof,
        };
        self.result = Some(result);
        self.spin = Some(record.clone());
        Ok(record)
    }

    /// Settle `bettor`'s bet against the result. The returned payout is what
    /// the gateway must transfer out of the table account.
    pub fn claim(&mut self, bettor: &Address) -> RouletteResult<Settlement> {
        self.ensure_open()?;
        let result = self
            .result
            .ok_or_else(|| RouletteError::ResultNotReady(self.id.clone()))?;

        let index = self
            .positions
            .iter()
            .position(|b| &b.bettor == bettor)
            .ok_or_else(|| RouletteError::NoSuchBet(bettor.to_string()))?;

        let bet = &self.positions[index];
        if bet.is_claimed {
            return Err(RouletteError::AlreadyClaimed(bettor.to_string()));
        }

        let won = bet.position.is_winner(result);
        let payout = if won {
            bet.amount
                .checked_mul(bet.position.payout_multiplier())
                .ok_or(RouletteError::ArithmeticOverflow("payout"))?
        } else {
            0
        };
        let settlement = Settlement {
            bettor: bettor.clone(),
            position: bet.position,
            stake: bet.amount,
            result,
            outcome: if won { GameOutcome::Win } else { GameOutcome::Loss },
            payout,
        };

        self.escrow.settle(bettor, settlement.stake, payout)?;
        self.positions[index].is_claimed = true;
        Ok(settlement)
    }

    /// Add house liquidity to the pool
    pub fn fund(&mut self, caller: &Address, amount: u64) -> RouletteResult<u64> {
        self.ensure_open()?;
        self.ensure_owner(caller, "fund it")?;
        if amount == 0 {
            return Err(RouletteError::InvalidAmount("amount must be greater than zero".to_string()));
        }
        self.escrow.add_liquidity(amount)?;
        Ok(self.accumulated())
    }

    /// Archive the table, returning everything it still holds (pool plus
    /// rent reserve) for transfer back to the owner
    pub fn close(&mut self, caller: &Address) -> RouletteResult<u64> {
        self.ensure_open()?;
        self.ensure_owner(caller, "close it")?;

        if !self.positions.is_empty() {
            let unsettled = if self.result.is_none() {
                self.positions.len()
            } else {
                self.unclaimed_count()
            };
            if unsettled > 0 {
                return Err(RouletteError::UnsettledBets {
                    table_id: self.id.clone(),
                    unsettled,
                });
            }
        }

        let returned = self
            .escrow
            .sweep()
            .checked_add(self.rent_reserve)
            .ok_or(RouletteError::ArithmeticOverflow("close"))?;
        self.rent_reserve = 0;
        self.closed = true;
        Ok(returned)
    }
}
