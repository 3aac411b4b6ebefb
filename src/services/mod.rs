pub mod assets;
pub mod capability;
pub mod demand;
pub mod history;
pub mod holdings;
pub mod ledger;
pub mod loans;
pub mod pricing;
pub mod sqlite_store;
pub mod tick;
pub mod trading;

pub use assets::AssetService;
pub use capability::Capability;
pub use demand::{DemandOutcome, DemandSimulator};
pub use history::PriceHistoryRecorder;
pub use holdings::HoldingsStore;
pub use ledger::LedgerService;
pub use loans::LoanService;
pub use sqlite_store::SqliteStore;
pub use tick::TickEngine;
pub use trading::TradingService;

use thiserror::Error;

use crate::types::money::Money;

/// Economic operation errors.
///
/// Every monetary or market operation returns one of these kinds so callers
/// can branch on the kind instead of matching message strings. Validation
/// failures are detected before any mutation; a returned error means no
/// partial write happened.
#[derive(Debug, Error)]
pub enum EconError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Money, available: Money },

    #[error("Insufficient holdings: need {needed}, have {available}")]
    InsufficientHoldings { needed: i64, available: i64 },

    #[error("Holding limit exceeded: {attempted} shares would pass the {cap} share cap")]
    HoldingLimitExceeded { attempted: i64, cap: i64 },

    #[error("Loan too large: {requested} exceeds the {ceiling} ceiling")]
    LoanTooLarge { requested: Money, ceiling: Money },

    #[error("Ticker already in use: {0}")]
    DuplicateTicker(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Amount outside the safe integer range")]
    OverflowDetected,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("A tick is already running")]
    TickInProgress,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for EconError {
    fn from(e: rusqlite::Error) -> Self {
        EconError::Database(e.to_string())
    }
}
