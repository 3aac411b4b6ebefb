//! Account Types
//!
//! Accounts are the two principals the ledger knows about: players and
//! companies. Balances are integer cents and never go negative.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;

/// Account kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Player,
    Company,
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountKind::Player => write!(f, "player"),
            AccountKind::Company => write!(f, "company"),
        }
    }
}

/// Global role carried by player accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    Moderator,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::Player
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Player => write!(f, "player"),
            Role::Moderator => write!(f, "moderator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// A ledger account (player or company).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique account ID.
    pub id: String,
    /// Player or company.
    pub kind: AccountKind,
    /// Owning principal (user ID for players, founder user ID for companies).
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// Balance in minor currency units. Never negative.
    pub balance: Money,
    /// Role (players only; companies stay at the default).
    pub role: Role,
    /// Whether the company has listed a stock.
    pub is_public: bool,
    /// Cached market cap of the company's stock (companies only).
    pub market_cap: Money,
    /// Shares outstanding once public (companies only).
    pub shares_outstanding: i64,
    /// Reputation score 0-100; feeds bot demand weighting (companies only).
    pub reputation: f64,
    /// Creation timestamp (ms).
    pub created_at: i64,
}

impl Account {
    /// Create a new player account.
    pub fn player(owner_id: String, name: String, starting_balance: Money) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: AccountKind::Player,
            owner_id,
            name,
            balance: starting_balance,
            role: Role::Player,
            is_public: false,
            market_cap: 0,
            shares_outstanding: 0,
            reputation: 0.0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create a new company account.
    pub fn company(owner_id: String, name: String, starting_balance: Money) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: AccountKind::Company,
            owner_id,
            name,
            balance: starting_balance,
            role: Role::Player,
            is_public: false,
            market_cap: 0,
            shares_outstanding: 0,
            reputation: 50.0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
