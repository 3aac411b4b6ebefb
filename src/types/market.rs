//! Marketplace Types
//!
//! Products sold on the in-game marketplace and the synthetic bot purchases
//! the demand simulator generates against them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;

/// A product listed by a company on the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: String,
    /// Owning company account.
    pub company_id: String,
    /// Display name.
    pub name: String,
    /// Unit price in cents.
    pub price: Money,
    /// Quality rating 0-100; feeds bot demand weighting.
    pub quality: f64,
    /// Units in stock. Never negative.
    pub stock: i64,
    /// Whether the product is purchasable.
    pub active: bool,
    /// Lifetime units sold.
    pub total_sold: i64,
    /// Lifetime revenue in cents.
    pub total_revenue: Money,
    /// Sales counter over the recent window, for trending displays.
    pub recent_sales_count: i64,
    /// Creation timestamp (ms).
    pub created_at: i64,
}

impl Product {
    /// Create an active product listing.
    pub fn new(
        company_id: String,
        name: String,
        price: Money,
        quality: f64,
        stock: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            company_id,
            name,
            price,
            quality: quality.clamp(0.0, 100.0),
            stock,
            active: true,
            total_sold: 0,
            total_revenue: 0,
            recent_sales_count: 0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// One synthetic purchase generated by the demand simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotPurchase {
    /// Purchased product.
    pub product_id: String,
    /// Company credited with the sale.
    pub company_id: String,
    /// Units bought.
    pub quantity: i64,
    /// Unit price at time of purchase.
    pub unit_price: Money,
    /// quantity * unit_price.
    pub total: Money,
}
