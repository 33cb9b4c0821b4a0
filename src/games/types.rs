use crate::games::escrow::EscrowLedger;
use crate::games::positions::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

const TABLE_ACCOUNT_PREFIX: &str = "table:";

/// Identity of a party (hex-encoded ed25519 public key when requests are signed)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Ledger account that custodies a table's funds
    pub fn table_account(table_id: &str) -> Self {
        Self(format!("{}{}", TABLE_ACCOUNT_PREFIX, table_id))
    }

    /// Whether this is a table escrow account rather than a party
    pub fn is_table_account(&self) -> bool {
        self.0.starts_with(TABLE_ACCOUNT_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One bettor's stake on one position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bet {
    pub bettor: Address,
    pub position: Position,
    pub amount: u64,
    pub is_claimed: bool,
    pub placed_at: u64,
}

/// Signature-derived randomness proof attached to a spin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VRFBundle {
    /// Hex-encoded VRF output (32 bytes)
    pub vrf_output: String,
    /// Hex-encoded VRF proof (64 bytes for schnorrkel)
    pub vrf_proof: String,
    /// Hex-encoded public key (32 bytes)
    pub public_key: String,
    /// Input message used for VRF
    pub input_message: String,
}

/// Record of the single spin of a table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpinRecord {
    pub result: u8,
    pub spun_by: Address,
    pub spun_at: u64,
    pub proof: Option<VRFBundle>,
}

/// One game instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    pub id: String,
    pub owner: Address,
    /// Insertion-ordered, frozen once `result` is set
    pub positions: Vec<Bet>,
    /// Write-once winning number in 0..=36
    pub result: Option<u8>,
    pub escrow: EscrowLedger,
    pub spin: Option<SpinRecord>,
    /// Storage reserve paid by the owner at creation, outside game economics
    pub rent_reserve: u64,
    pub closed: bool,
    pub created_at: u64,
}

/// Lifecycle state derived from a table's fields
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Created,
    Accepting,
    Spun,
    Settled,
    Closed,
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStatus::Created => write!(f, "created"),
            TableStatus::Accepting => write!(f, "accepting"),
            TableStatus::Spun => write!(f, "spun"),
            TableStatus::Settled => write!(f, "settled"),
            TableStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Game outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
}

/// Result of settling one bet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settlement {
    pub bettor: Address,
    pub position: Position,
    pub stake: u64,
    pub result: u8,
    pub outcome: GameOutcome,
    pub payout: u64,
}

/// Operation requested against a table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TableAction {
    Create,
    Bet { position: String, amount: u64 },
    Spin,
    ClaimPrize,
    Fund { amount: u64 },
    Close,
}

impl TableAction {
    pub fn name(&self) -> &'static str {
        match self {
            TableAction::Create => "create",
            TableAction::Bet { .. } => "bet",
            TableAction::Spin => "spin",
            TableAction::ClaimPrize => "claim_prize",
            TableAction::Fund { .. } => "fund",
            TableAction::Close => "close",
        }
    }
}

/// Authenticated request routed through the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRequest {
    pub table_id: String,
    pub caller: Address,
    pub action: TableAction,
}

/// What a committed request produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionReceipt {
    Created { table_id: String },
    BetPlaced { table_id: String, bet: Bet, accumulated: u64 },
    Spun { table_id: String, spin: SpinRecord },
    Claimed { table_id: String, settlement: Settlement },
    Funded { table_id: String, accumulated: u64 },
    Closed { table_id: String, returned: u64 },
}
