//! API Request and Response Models

use crate::auth::SignedEnvelope;
use crate::games::positions::PositionEntry;
use crate::games::types::{ActionReceipt, Bet, SpinRecord, Table, TableStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel used on the wire for a table that has not been spun
pub const RESULT_UNSET: i16 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub entropy: String,
    /// Key that verifies spin proofs, when spins are provable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf_public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionInfo {
    pub name: String,
    pub payout_multiplier: u64,
}

impl From<&PositionEntry> for PositionInfo {
    fn from(entry: &PositionEntry) -> Self {
        Self {
            name: entry.name.to_string(),
            payout_multiplier: entry.payout_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTableRequest {
    pub table_id: String,
    #[serde(flatten)]
    pub auth: SignedEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    pub position: String,
    pub amount: u64,
    #[serde(flatten)]
    pub auth: SignedEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundTableRequest {
    pub amount: u64,
    #[serde(flatten)]
    pub auth: SignedEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirdropRequest {
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetView {
    pub bettor: String,
    pub position: String,
    pub amount: u64,
    pub is_claimed: bool,
}

impl From<&Bet> for BetView {
    fn from(bet: &Bet) -> Self {
        Self {
            bettor: bet.bettor.to_string(),
            position: bet.position.name().to_string(),
            amount: bet.amount,
            is_claimed: bet.is_claimed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableView {
    pub id: String,
    pub owner: String,
    pub status: TableStatus,
    /// Winning pocket, or -1 before the spin
    pub result: i16,
    pub accumulated: u64,
    pub rent_reserve: u64,
    pub positions: Vec<BetView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin: Option<SpinRecord>,
    pub created_at: DateTime<Utc>,
}

impl From<&Table> for TableView {
    fn from(table: &Table) -> Self {
        let created_at = i64::try_from(table.created_at)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);

        Self {
            id: table.id.clone(),
            owner: table.owner.to_string(),
            status: table.status(),
            result: table.result.map(i16::from).unwrap_or(RESULT_UNSET),
            accumulated: table.accumulated(),
            rent_reserve: table.rent_reserve,
            positions: table.positions.iter().map(BetView::from).collect(),
            spin: table.spin.clone(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesResponse {
    pub tables: Vec<TableView>,
    pub total: usize,
}

/// Outcome of a committed request together with the table it left behind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub request_id: String,
    pub receipt: ActionReceipt,
    pub table: TableView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: String,
    pub balance: u64,
    /// Nonce the next signed request from this address must carry
    pub next_nonce: u64,
}
