//! Trading Types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::AssetKind;
use super::money::Money;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// How the caller sized the order: a unit quantity, or a cash amount that
/// is converted to units at the current price (floored).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAmount {
    Quantity(i64),
    Cash(Money),
}

/// An executed buy or sell, recorded for historical display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade ID.
    pub id: String,
    /// Account that traded.
    pub account_id: String,
    /// Asset traded.
    pub asset_id: String,
    /// Stock or crypto.
    pub asset_kind: AssetKind,
    pub side: TradeSide,
    /// Units traded.
    pub quantity: i64,
    /// Effective unit price after any price impact.
    pub price: Money,
    /// quantity * price.
    pub total: Money,
    /// Execution timestamp (ms).
    pub timestamp: i64,
}

impl Trade {
    /// Create a trade record.
    pub fn new(
        account_id: String,
        asset_id: String,
        asset_kind: AssetKind,
        side: TradeSide,
        quantity: i64,
        price: Money,
        total: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id,
            asset_id,
            asset_kind,
            side,
            quantity,
            price,
            total,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
