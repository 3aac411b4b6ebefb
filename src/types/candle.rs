//! Price History Types

use serde::{Deserialize, Serialize};

use super::asset::AssetKind;
use super::money::Money;

/// One OHLCV candle covering a single tick interval for one asset.
/// Append-only; exactly one per asset per tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Asset the candle belongs to.
    pub asset_id: String,
    /// Stock or crypto.
    pub asset_kind: AssetKind,
    /// Tick this candle closes.
    pub tick_seq: i64,
    /// Tick timestamp (ms).
    pub timestamp: i64,
    pub open: Money,
    pub high: Money,
    pub low: Money,
    pub close: Money,
    /// Units traded during the interval.
    pub volume: i64,
}

impl Candle {
    /// Build a candle from the tick's open/close and the interval's trade flow.
    pub fn from_tick(
        asset_id: String,
        asset_kind: AssetKind,
        tick_seq: i64,
        timestamp: i64,
        open: Money,
        close: Money,
        traded_high: Option<Money>,
        traded_low: Option<Money>,
        volume: i64,
    ) -> Self {
        let high = open.max(close).max(traded_high.unwrap_or(Money::MIN));
        let low = open.min(close).min(traded_low.unwrap_or(Money::MAX));
        Self {
            asset_id,
            asset_kind,
            tick_seq,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_folds_trades() {
        let c = Candle::from_tick(
            "a".to_string(),
            AssetKind::Crypto,
            1,
            0,
            100,
            110,
            Some(130),
            Some(90),
            42,
        );
        assert_eq!(c.high, 130);
        assert_eq!(c.low, 90);
        assert_eq!(c.open, 100);
        assert_eq!(c.close, 110);
        assert_eq!(c.volume, 42);
    }

    #[test]
    fn test_candle_no_trades() {
        let c = Candle::from_tick("a".to_string(), AssetKind::Stock, 1, 0, 100, 95, None, None, 0);
        assert_eq!(c.high, 100);
        assert_eq!(c.low, 95);
    }
}
