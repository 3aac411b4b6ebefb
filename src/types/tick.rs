//! Tick Record Types
//!
//! Append-only audit trail of one simulation step: what the bots bought,
//! how every price moved, and which steps failed.

use serde::{Deserialize, Serialize};

use super::market::BotPurchase;
use super::money::Money;

/// Price movement of one asset during a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceDelta {
    pub asset_id: String,
    pub ticker: String,
    pub previous: Money,
    pub current: Money,
}

/// A failure captured inside a tick step. The tick keeps going; the error
/// is recorded here for later inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickStepError {
    /// Which step failed (e.g. "loan_interest", "stock_prices").
    pub step: String,
    /// The asset or loan the failure was scoped to, if any.
    pub entity_id: Option<String>,
    pub message: String,
}

/// Summary of one completed simulation tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickRecord {
    /// Monotonic tick sequence number.
    pub seq: i64,
    /// Tick timestamp (ms).
    pub timestamp: i64,
    /// Synthetic purchases generated this tick.
    pub bot_purchases: Vec<BotPurchase>,
    /// Stock price movements.
    pub stock_deltas: Vec<PriceDelta>,
    /// Cryptocurrency price movements.
    pub crypto_deltas: Vec<PriceDelta>,
    /// Total bot budget actually spent.
    pub total_bot_spend: Money,
    /// Failures captured during the tick.
    pub step_errors: Vec<TickStepError>,
    /// Wall-clock duration of the tick (ms).
    pub duration_ms: i64,
}
