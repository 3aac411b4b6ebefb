//! Asset Types
//!
//! Tradable assets: company stocks and player-created cryptocurrencies.
//! Prices are integer cents. Market cap is always derived from price and
//! supply, never stored without recomputing on a mutation of either factor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{self, Money};

/// Which class of asset a holding, trade, or candle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Stock,
    Crypto,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Stock => write!(f, "stock"),
            AssetKind::Crypto => write!(f, "crypto"),
        }
    }
}

/// A listed company stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    /// Unique asset ID.
    pub id: String,
    /// Issuing company account ID.
    pub company_id: String,
    /// Ticker symbol, unique across stocks and cryptos.
    pub ticker: String,
    /// Display name.
    pub name: String,
    /// Current price in cents, always >= 1.
    pub price: Money,
    /// Price before the most recent update.
    pub previous_price: Money,
    /// Total shares issued at IPO.
    pub total_shares: i64,
    /// price * total_shares, recomputed on every price change.
    pub market_cap: Money,
    /// Fundamentals-implied anchor the price reverts toward.
    pub fair_value: Money,
    /// Daily growth rate of the fair value, pro-rated per tick.
    pub growth_rate: f64,
    /// Market sentiment bias, -1.0..=1.0.
    pub sentiment: f64,
    /// Clustered volatility state.
    pub volatility: f64,
    /// Percentage change applied by the previous tick (momentum term).
    pub last_change_pct: f64,
    /// Set by moderation; drags sentiment down while set.
    pub flagged: bool,
    /// Creation timestamp (ms).
    pub created_at: i64,
}

impl Stock {
    /// Create a stock at IPO.
    pub fn new(
        company_id: String,
        ticker: String,
        name: String,
        price: Money,
        total_shares: i64,
        growth_rate: f64,
        base_volatility: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            company_id,
            ticker,
            name,
            price,
            previous_price: price,
            total_shares,
            market_cap: money::mul_qty(price, total_shares).unwrap_or(0),
            fair_value: price,
            growth_rate,
            sentiment: 0.0,
            volatility: base_volatility,
            last_change_pct: 0.0,
            flagged: false,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Recompute market cap from price and share count.
    /// `None` if the product leaves the safe integer range.
    pub fn recompute_market_cap(&mut self) -> Option<Money> {
        let cap = money::mul_qty(self.price, self.total_shares)?;
        self.market_cap = cap;
        Some(cap)
    }
}

/// A player-created cryptocurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cryptocurrency {
    /// Unique asset ID.
    pub id: String,
    /// Ticker symbol, unique across stocks and cryptos.
    pub ticker: String,
    /// Display name.
    pub name: String,
    /// Creator's player account ID.
    pub creator_account_id: String,
    /// Current price in cents, always >= 1.
    pub current_price: Money,
    /// Price before the most recent update.
    pub previous_price: Money,
    /// Coins in circulation.
    pub circulating_supply: i64,
    /// Supply cap.
    pub total_supply: i64,
    /// price * circulating_supply, recomputed on every price change.
    pub market_cap: Money,
    /// Simulated pool depth in coins; controls trade price impact.
    pub liquidity: i64,
    /// Baseline volatility the clustered state reverts toward.
    pub base_volatility: f64,
    /// Clustered volatility state, updated each tick.
    pub volatility: f64,
    /// Regime drift term; mean-reverts and occasionally flips sign.
    pub trend_drift: f64,
    /// Percentage change applied by the previous tick (momentum term).
    pub last_price_change: f64,
    /// Creation timestamp (ms).
    pub created_at: i64,
}

impl Cryptocurrency {
    /// Create a cryptocurrency. The creator receives the full supply.
    pub fn new(
        ticker: String,
        name: String,
        creator_account_id: String,
        initial_price: Money,
        total_supply: i64,
        liquidity: i64,
        base_volatility: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ticker,
            name,
            creator_account_id,
            current_price: initial_price,
            previous_price: initial_price,
            circulating_supply: total_supply,
            total_supply,
            market_cap: money::mul_qty(initial_price, total_supply).unwrap_or(0),
            liquidity,
            base_volatility,
            volatility: base_volatility,
            trend_drift: 0.0,
            last_price_change: 0.0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Recompute market cap from price and circulating supply.
    /// `None` if the product leaves the safe integer range.
    pub fn recompute_market_cap(&mut self) -> Option<Money> {
        let cap = money::mul_qty(self.current_price, self.circulating_supply)?;
        self.market_cap = cap;
        Some(cap)
    }
}
