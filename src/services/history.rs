//! Price History Recorder
//!
//! Accumulates intra-tick trade flow per asset and emits exactly one OHLCV
//! candle per asset per tick. Candles are append-only; the open is the
//! price going into the tick, the close is the price coming out, and trades
//! executed between ticks widen the high/low range and fill in volume.

use dashmap::DashMap;
use std::sync::Arc;

use crate::types::money::Money;
use crate::types::{AssetKind, Candle};

use super::{EconError, SqliteStore};

/// Trade flow accumulated for one asset since the last tick.
#[derive(Debug, Clone, Copy)]
struct TradeFlow {
    high: Money,
    low: Money,
    volume: i64,
}

/// Candle recording over the SQLite store.
#[derive(Clone)]
pub struct PriceHistoryRecorder {
    sqlite: Arc<SqliteStore>,
    /// Intra-tick flow (asset_id -> flow).
    pending: Arc<DashMap<String, TradeFlow>>,
}

impl PriceHistoryRecorder {
    /// Create a recorder over the given store.
    pub fn new(sqlite: Arc<SqliteStore>) -> Self {
        Self {
            sqlite,
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Record one executed trade into the current interval's flow.
    pub fn record_trade(&self, asset_id: &str, price: Money, quantity: i64) {
        let mut entry = self
            .pending
            .entry(asset_id.to_string())
            .or_insert(TradeFlow {
                high: price,
                low: price,
                volume: 0,
            });
        let flow = entry.value_mut();
        flow.high = flow.high.max(price);
        flow.low = flow.low.min(price);
        flow.volume = flow.volume.saturating_add(quantity);
    }

    /// Close the interval for one asset: fold the pending flow with the
    /// tick's open/close into a candle and persist it. The flow resets.
    pub fn record_tick_candle(
        &self,
        asset_id: &str,
        asset_kind: AssetKind,
        tick_seq: i64,
        timestamp: i64,
        open: Money,
        close: Money,
    ) -> Result<Candle, EconError> {
        let flow = self.pending.remove(asset_id).map(|(_, f)| f);
        let candle = Candle::from_tick(
            asset_id.to_string(),
            asset_kind,
            tick_seq,
            timestamp,
            open,
            close,
            flow.map(|f| f.high),
            flow.map(|f| f.low),
            flow.map(|f| f.volume).unwrap_or(0),
        );
        self.sqlite.insert_candle(&candle)?;
        Ok(candle)
    }

    /// Most recent candles for an asset, oldest first.
    pub fn candles(&self, asset_id: &str, limit: usize) -> Vec<Candle> {
        self.sqlite.candles_for_asset(asset_id, limit)
    }

    /// Number of candles recorded for an asset.
    pub fn candle_count(&self, asset_id: &str) -> usize {
        self.sqlite.candle_count(asset_id)
    }
}
