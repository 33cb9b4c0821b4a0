//! Position catalog for a single-zero wheel
//!
//! The catalog is immutable static data shared by every table. Names are
//! matched exactly (case and spelling) and resolved at bet time, so an
//! unrecognized name never reaches settlement.

use crate::errors::{RouletteError, RouletteResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of pockets on the wheel (0..=36)
pub const WHEEL_SIZE: u8 = 37;

/// Red pockets on a European wheel
pub const RED_NUMBERS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

/// Black pockets on a European wheel
pub const BLACK_NUMBERS: [u8; 18] = [2, 4, 6, 8, 10, 11, 13, 15, 17, 20, 22, 24, 26, 28, 29, 31, 33, 35];

/// Named wager category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Position {
    #[serde(rename = "RED")]
    Red,
    #[serde(rename = "BLACK")]
    Black,
    #[serde(rename = "GREEN")]
    Green,
    #[serde(rename = "EVEN")]
    Even,
    #[serde(rename = "ODD")]
    Odd,
    #[serde(rename = "1-18")]
    Low,
    #[serde(rename = "19-36")]
    High,
    #[serde(rename = "1-12")]
    FirstDozen,
    #[serde(rename = "13-24")]
    SecondDozen,
    #[serde(rename = "25-36")]
    ThirdDozen,
    #[serde(rename = "COL1")]
    Column1,
    #[serde(rename = "COL2")]
    Column2,
    #[serde(rename = "COL3")]
    Column3,
}

/// Catalog entry: name, payout multiplier and the position it resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEntry {
    pub position: Position,
    pub name: &'static str,
    /// Stake is multiplied by this on a win (stake included)
    pub payout_multiplier: u64,
}

/// Every valid position, in catalog order
pub static CATALOG: [PositionEntry; 13] = [
    PositionEntry { position: Position::Red, name: "RED", payout_multiplier: 2 },
    PositionEntry { position: Position::Black, name: "BLACK", payout_multiplier: 2 },
    PositionEntry { position: Position::Green, name: "GREEN", payout_multiplier: 36 },
    PositionEntry { position: Position::Even, name: "EVEN", payout_multiplier: 2 },
    PositionEntry { position: Position::Odd, name: "ODD", payout_multiplier: 2 },
    PositionEntry { position: Position::Low, name: "1-18", payout_multiplier: 2 },
    PositionEntry { position: Position::High, name: "19-36", payout_multiplier: 2 },
    PositionEntry { position: Position::FirstDozen, name: "1-12", payout_multiplier: 3 },
    PositionEntry { position: Position::SecondDozen, name: "13-24", payout_multiplier: 3 },
    PositionEntry { position: Position::ThirdDozen, name: "25-36", payout_multiplier: 3 },
    PositionEntry { position: Position::Column1, name: "COL1", payout_multiplier: 3 },
    PositionEntry { position: Position::Column2, name: "COL2", payout_multiplier: 3 },
    PositionEntry { position: Position::Column3, name: "COL3", payout_multiplier: 3 },
];

/// Look up a position by its exact catalog name
pub fn resolve(name: &str) -> RouletteResult<&'static PositionEntry> {
    CATALOG
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| RouletteError::InvalidPosition(name.to_string()))
}

/// Whether `entry` wins for the spun `result`
pub fn is_winner(entry: &PositionEntry, result: u8) -> bool {
    entry.position.is_winner(result)
}

impl Position {
    /// Catalog entry for this position
    pub fn entry(self) -> &'static PositionEntry {
        // CATALOG is declared in enum order
        &CATALOG[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn payout_multiplier(self) -> u64 {
        self.entry().payout_multiplier
    }

    /// Win predicate. Zero wins only GREEN; results past 36 never win.
    pub fn is_winner(self, result: u8) -> bool {
        if result >= WHEEL_SIZE {
            return false;
        }
        let is_zero = result == 0;

        match self {
            Position::Red => RED_NUMBERS.contains(&result),
            Position::Black => BLACK_NUMBERS.contains(&result),
            Position::Green => is_zero,
            Position::Even => !is_zero && result % 2 == 0,
            Position::Odd => result % 2 == 1,
            Position::Low => (1..=18).contains(&result),
            Position::High => (19..=36).contains(&result),
            Position::FirstDozen => (1..=12).contains(&result),
            Position::SecondDozen => (13..=24).contains(&result),
            Position::ThirdDozen => (25..=36).contains(&result),
            Position::Column1 => result % 3 == 1,
            Position::Column2 => result % 3 == 2,
            Position::Column3 => !is_zero && result % 3 == 0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}
