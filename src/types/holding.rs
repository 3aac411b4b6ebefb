//! Holding Types
//!
//! One holding per (account, asset) pair, carrying the weighted-average
//! cost basis of all buys. Sells reduce quantity and leave the average
//! untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::AssetKind;
use super::money::{self, Money};

/// An account's position in one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    /// Unique holding ID.
    pub id: String,
    /// Owning account.
    pub account_id: String,
    /// Held asset.
    pub asset_id: String,
    /// Stock or crypto.
    pub asset_kind: AssetKind,
    /// Units held. Never negative.
    pub quantity: i64,
    /// Weighted-average purchase price in cents, floor-rounded.
    pub average_price: Money,
    /// Last mutation timestamp (ms).
    pub updated_at: i64,
}

impl Holding {
    /// Create an empty holding for an (account, asset) pair.
    pub fn new(account_id: String, asset_id: String, asset_kind: AssetKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id,
            asset_id,
            asset_kind,
            quantity: 0,
            average_price: 0,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Fold a buy of `quantity` units at `price` into the holding.
    ///
    /// New average = floor((Q*P + q*p) / (Q+q)). `None` if the intermediate
    /// cost leaves the safe integer range.
    pub fn apply_buy(&mut self, quantity: i64, price: Money) -> Option<()> {
        let existing_cost = money::mul_qty(self.average_price, self.quantity)?;
        let new_cost = money::mul_qty(price, quantity)?;
        let total_cost = money::add(existing_cost, new_cost)?;
        let total_qty = self.quantity.checked_add(quantity)?;
        self.average_price = money::div_floor(total_cost, total_qty)?;
        self.quantity = total_qty;
        self.updated_at = chrono::Utc::now().timestamp_millis();
        Some(())
    }

    /// Reduce the holding by a sell of `quantity` units.
    ///
    /// The average purchase price is unaffected. `None` on oversell.
    pub fn apply_sell(&mut self, quantity: i64) -> Option<()> {
        if quantity > self.quantity {
            return None;
        }
        self.quantity -= quantity;
        self.updated_at = chrono::Utc::now().timestamp_millis();
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding() -> Holding {
        Holding::new("acct".to_string(), "asset".to_string(), AssetKind::Stock)
    }

    #[test]
    fn test_weighted_average_two_buys() {
        let mut h = holding();
        h.apply_buy(1_000, 100).unwrap();
        h.apply_buy(1_000, 200).unwrap();
        assert_eq!(h.quantity, 2_000);
        assert_eq!(h.average_price, 150);
    }

    #[test]
    fn test_average_floor_rounded() {
        let mut h = holding();
        h.apply_buy(3, 100).unwrap();
        h.apply_buy(1, 101).unwrap();
        // (300 + 101) / 4 = 100.25 -> 100
        assert_eq!(h.average_price, 100);
    }

    #[test]
    fn test_sell_leaves_average() {
        let mut h = holding();
        h.apply_buy(10, 120).unwrap();
        h.apply_sell(4).unwrap();
        assert_eq!(h.quantity, 6);
        assert_eq!(h.average_price, 120);
    }

    #[test]
    fn test_oversell_rejected() {
        let mut h = holding();
        h.apply_buy(5, 100).unwrap();
        assert!(h.apply_sell(6).is_none());
        assert_eq!(h.quantity, 5);
    }
}
