//! Holdings Store
//!
//! Read-side access to per-account ownership records. Mutations go through
//! the trading engine's atomic trade application; this service answers
//! "what does this account own" and values positions at current prices.

use std::sync::Arc;

use crate::types::money::{self, Money};
use crate::types::{AssetKind, Holding};

use super::{EconError, SqliteStore};

/// A holding joined with its current market price, for portfolio display.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValuedHolding {
    #[serde(flatten)]
    pub holding: Holding,
    /// Current unit price of the asset.
    pub current_price: Money,
    /// quantity * current_price.
    pub market_value: Money,
    /// market_value - quantity * average_price. Negative when underwater.
    pub unrealized_pnl: i64,
}

/// Per-account ownership records.
#[derive(Clone)]
pub struct HoldingsStore {
    sqlite: Arc<SqliteStore>,
}

impl HoldingsStore {
    /// Create a holdings store over the given SQLite store.
    pub fn new(sqlite: Arc<SqliteStore>) -> Self {
        Self { sqlite }
    }

    /// Get one holding, if the account has ever bought the asset.
    pub fn get(&self, account_id: &str, asset_id: &str) -> Option<Holding> {
        self.sqlite.get_holding(account_id, asset_id)
    }

    /// All non-empty holdings for an account.
    pub fn for_account(&self, account_id: &str) -> Vec<Holding> {
        self.sqlite.holdings_for_account(account_id)
    }

    /// All non-empty holdings for an account, valued at current prices.
    pub fn valued_for_account(&self, account_id: &str) -> Result<Vec<ValuedHolding>, EconError> {
        let holdings = self.sqlite.holdings_for_account(account_id);
        let mut valued = Vec::with_capacity(holdings.len());
        for holding in holdings {
            let current_price = match holding.asset_kind {
                AssetKind::Stock => self
                    .sqlite
                    .get_stock(&holding.asset_id)
                    .map(|s| s.price),
                AssetKind::Crypto => self
                    .sqlite
                    .get_crypto(&holding.asset_id)
                    .map(|c| c.current_price),
            }
            .ok_or_else(|| EconError::AssetNotFound(holding.asset_id.clone()))?;

            let market_value = money::mul_qty(current_price, holding.quantity)
                .ok_or(EconError::OverflowDetected)?;
            let cost_basis = money::mul_qty(holding.average_price, holding.quantity)
                .ok_or(EconError::OverflowDetected)?;
            valued.push(ValuedHolding {
                current_price,
                market_value,
                unrealized_pnl: market_value - cost_basis,
                holding,
            });
        }
        Ok(valued)
    }
}
