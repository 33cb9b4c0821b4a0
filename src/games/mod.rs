pub mod entropy;
pub mod escrow;
pub mod ledger;
pub mod positions;
pub mod processor;
pub mod table;
pub mod types;
pub mod vrf_engine;

pub use entropy::{EntropyDraw, EntropySource, FixedEntropy, OsEntropy, SeededEntropy, VrfEntropy};
pub use escrow::EscrowLedger;
pub use ledger::{FundsLedger, InMemoryLedger};
pub use positions::{Position, PositionEntry, CATALOG};
pub use processor::TableProcessor;
pub use table::TablePolicy;
pub use types::*;
pub use vrf_engine::VrfEngine;
