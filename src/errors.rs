//! Error types for the roulette table engine
//!
//! Every rejected request surfaces a distinguishable kind so callers can
//! branch on `InvalidPosition` vs `AlreadyClaimed` rather than on message text.

/// Root error type for all table operations
#[derive(Debug, thiserror::Error)]
pub enum RouletteError {
    #[error("Table already exists: {0}")]
    AlreadyExists(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid table identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("Betting is closed for table {0}")]
    BettingClosed(String),

    #[error("Table {table_id} is full ({capacity} bets)")]
    TableFull { table_id: String, capacity: usize },

    #[error("Bettor {0} already has a bet on this table")]
    DuplicateBet(String),

    #[error("No bets placed on table {0}")]
    NoBetsPlaced(String),

    #[error("Table {0} has already been spun")]
    AlreadySpun(String),

    #[error("Result not ready for table {0}")]
    ResultNotReady(String),

    #[error("No bet found for {0}")]
    NoSuchBet(String),

    #[error("Bet already claimed by {0}")]
    AlreadyClaimed(String),

    #[error("Insufficient pool: payout {payout}, accumulated {accumulated}")]
    InsufficientPool { payout: u64, accumulated: u64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Address {0} is reserved for table escrow")]
    ReservedAddress(String),

    #[error("Table {0} is closed")]
    TableClosed(String),

    #[error("Table {table_id} has {unsettled} unsettled bets")]
    UnsettledBets { table_id: String, unsettled: usize },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Nonce error: expected {expected}, got {actual}")]
    StaleNonce { expected: u64, actual: u64 },

    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error("Entropy source failed: {0}")]
    Entropy(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Storage system errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

impl RouletteError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            RouletteError::AlreadyExists(_) => "ALREADY_EXISTS",
            RouletteError::TableNotFound(_) => "TABLE_NOT_FOUND",
            RouletteError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            RouletteError::InvalidPosition(_) => "INVALID_POSITION",
            RouletteError::InvalidAmount(_) => "INVALID_AMOUNT",
            RouletteError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            RouletteError::BettingClosed(_) => "BETTING_CLOSED",
            RouletteError::TableFull { .. } => "TABLE_FULL",
            RouletteError::DuplicateBet(_) => "DUPLICATE_BET",
            RouletteError::NoBetsPlaced(_) => "NO_BETS_PLACED",
            RouletteError::AlreadySpun(_) => "ALREADY_SPUN",
            RouletteError::ResultNotReady(_) => "RESULT_NOT_READY",
            RouletteError::NoSuchBet(_) => "NO_SUCH_BET",
            RouletteError::AlreadyClaimed(_) => "ALREADY_CLAIMED",
            RouletteError::InsufficientPool { .. } => "INSUFFICIENT_POOL",
            RouletteError::Unauthorized(_) => "UNAUTHORIZED",
            RouletteError::ReservedAddress(_) => "RESERVED_ADDRESS",
            RouletteError::TableClosed(_) => "TABLE_CLOSED",
            RouletteError::UnsettledBets { .. } => "UNSETTLED_BETS",
            RouletteError::InvalidSignature(_) => "INVALID_SIGNATURE",
            RouletteError::StaleNonce { .. } => "STALE_NONCE",
            RouletteError::ArithmeticOverflow(_) => "ARITHMETIC_OVERFLOW",
            RouletteError::Entropy(_) => "ENTROPY_FAILURE",
            RouletteError::Storage(_) => "STORAGE_ERROR",
            RouletteError::Configuration(_) => "CONFIGURATION_ERROR",
            RouletteError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the request was rejected because of caller input or table state,
    /// as opposed to an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            RouletteError::ArithmeticOverflow(_)
                | RouletteError::Entropy(_)
                | RouletteError::Storage(_)
                | RouletteError::Configuration(_)
                | RouletteError::Internal(_)
        )
    }
}

// External error conversions
impl From<rocksdb::Error> for RouletteError {
    fn from(e: rocksdb::Error) -> Self {
        RouletteError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<bincode::Error> for RouletteError {
    fn from(e: bincode::Error) -> Self {
        RouletteError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

impl From<std::io::Error> for RouletteError {
    fn from(e: std::io::Error) -> Self {
        RouletteError::Storage(StorageError::ReadFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for RouletteError {
    fn from(e: serde_json::Error) -> Self {
        RouletteError::Internal(format!("JSON encoding failed: {}", e))
    }
}

// Convenience type alias for Results
pub type RouletteResult<T> = Result<T, RouletteError>;
