//! Ledger Types
//!
//! Immutable transaction records. A transaction with no from-account is a
//! system mint; one with no to-account is a system burn.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;

/// What a transaction moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Cash,
    Stock,
    Crypto,
    Product,
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferKind::Cash => write!(f, "cash"),
            TransferKind::Stock => write!(f, "stock"),
            TransferKind::Crypto => write!(f, "crypto"),
            TransferKind::Product => write!(f, "product"),
        }
    }
}

/// An immutable, append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID.
    pub id: String,
    /// Debited account; `None` for system mints.
    pub from_account: Option<String>,
    /// Credited account; `None` for system burns.
    pub to_account: Option<String>,
    /// Amount moved, in cents. Always positive.
    pub amount: Money,
    /// What moved.
    pub kind: TransferKind,
    /// Human-readable description.
    pub description: String,
    /// Timestamp (ms).
    pub timestamp: i64,
}

impl Transaction {
    /// Create a transaction record.
    pub fn new(
        from_account: Option<String>,
        to_account: Option<String>,
        amount: Money,
        kind: TransferKind,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from_account,
            to_account,
            amount,
            kind,
            description,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
