//! Tick Engine
//!
//! Orchestrates one simulation step: loan interest, stock prices, crypto
//! prices, bot demand, candles, and the tick record. Invoked by the host
//! scheduler; overlapping invocations are rejected so at most one tick
//! runs at a time.
//!
//! Failures are isolated per step and per asset: one asset's pricing
//! failure is recorded in the tick record and does not stop other assets
//! or later steps. Committed steps are never rolled back.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::types::money::Money;
use crate::types::{AssetKind, PriceDelta, TickRecord, TickStepError};

use super::pricing::{
    next_crypto_price, next_stock_price, CryptoModelParams, StockModelParams,
};
use super::{
    AssetService, DemandSimulator, EconError, LoanService, PriceHistoryRecorder, SqliteStore,
};

/// Everything recorded about one asset for the candle step.
struct CandlePlan {
    asset_id: String,
    kind: AssetKind,
    open: Money,
    close: Money,
}

/// Single-flight simulation orchestrator.
pub struct TickEngine {
    sqlite: Arc<SqliteStore>,
    assets: AssetService,
    demand: DemandSimulator,
    loans: LoanService,
    history: PriceHistoryRecorder,
    stock_params: StockModelParams,
    crypto_params: CryptoModelParams,
    ticks_per_day: f64,
    rng: Mutex<StdRng>,
    running: AtomicBool,
}

/// Clears the running flag when a tick exits, normally or early.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TickEngine {
    /// Create a tick engine. With `rng_seed` set in the config, the whole
    /// simulation is reproducible.
    pub fn new(
        sqlite: Arc<SqliteStore>,
        assets: AssetService,
        demand: DemandSimulator,
        loans: LoanService,
        history: PriceHistoryRecorder,
        config: &Config,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            sqlite,
            assets,
            demand,
            loans,
            history,
            stock_params: StockModelParams {
                ticks_per_day: config.ticks_per_day(),
                ..Default::default()
            },
            crypto_params: CryptoModelParams::default(),
            ticks_per_day: config.ticks_per_day(),
            rng: Mutex::new(rng),
            running: AtomicBool::new(false),
        }
    }

    /// Whether a tick is currently executing.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Execute one simulation tick. Returns `TickInProgress` if another
    /// tick is still running.
    pub fn execute_tick(&self) -> Result<TickRecord, EconError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Tick requested while another tick is running; rejected");
            return Err(EconError::TickInProgress);
        }
        let _guard = RunningGuard(&self.running);

        let started = std::time::Instant::now();
        let timestamp = chrono::Utc::now().timestamp_millis();
        let seq = self.sqlite.latest_tick_seq() + 1;
        let mut step_errors = Vec::new();
        let mut candle_plans = Vec::new();

        // Step 1: interest on all active loans.
        step_errors.extend(self.loans.apply_interest_all(self.ticks_per_day));

        // Step 2: stock prices.
        let stock_deltas = self.update_stocks(&mut step_errors, &mut candle_plans);

        // Step 3: crypto prices.
        let crypto_deltas = self.update_cryptos(&mut step_errors, &mut candle_plans);

        // Step 4: bot demand.
        let outcome = {
            let mut rng = self.rng.lock().unwrap();
            self.demand.run(&mut *rng)
        };
        let (bot_purchases, total_bot_spend) = match outcome {
            Ok(outcome) => (outcome.purchases, outcome.total_spent),
            Err(e) => {
                error!("Demand simulation failed: {}", e);
                step_errors.push(TickStepError {
                    step: "demand".to_string(),
                    entity_id: None,
                    message: e.to_string(),
                });
                (Vec::new(), 0)
            }
        };

        // Step 5: one candle per asset.
        for plan in &candle_plans {
            if let Err(e) = self.history.record_tick_candle(
                &plan.asset_id,
                plan.kind,
                seq,
                timestamp,
                plan.open,
                plan.close,
            ) {
                step_errors.push(TickStepError {
                    step: "candles".to_string(),
                    entity_id: Some(plan.asset_id.clone()),
                    message: e.to_string(),
                });
            }
        }

        // Step 6: the tick record itself.
        let record = TickRecord {
            seq,
            timestamp,
            bot_purchases,
            stock_deltas,
            crypto_deltas,
            total_bot_spend,
            step_errors,
            duration_ms: started.elapsed().as_millis() as i64,
        };
        self.sqlite.insert_tick(&record)?;

        info!(
            "Tick {} complete: {} stocks, {} cryptos, {} bot purchases, {} errors ({} ms)",
            record.seq,
            record.stock_deltas.len(),
            record.crypto_deltas.len(),
            record.bot_purchases.len(),
            record.step_errors.len(),
            record.duration_ms
        );
        Ok(record)
    }

    /// Most recent tick records, newest first.
    pub fn recent_ticks(&self, limit: usize) -> Vec<TickRecord> {
        self.sqlite.recent_ticks(limit)
    }

    fn update_stocks(
        &self,
        step_errors: &mut Vec<TickStepError>,
        candle_plans: &mut Vec<CandlePlan>,
    ) -> Vec<PriceDelta> {
        let mut deltas = Vec::new();
        for stock in self.assets.list_stocks() {
            let tick = {
                let mut rng = self.rng.lock().unwrap();
                next_stock_price(&stock, &self.stock_params, &mut *rng)
            };
            match self.assets.apply_stock_tick(&stock, &tick) {
                Ok(updated) => {
                    deltas.push(PriceDelta {
                        asset_id: updated.id.clone(),
                        ticker: updated.ticker.clone(),
                        previous: updated.previous_price,
                        current: updated.price,
                    });
                    candle_plans.push(CandlePlan {
                        asset_id: updated.id,
                        kind: AssetKind::Stock,
                        open: stock.price,
                        close: tick.price,
                    });
                }
                Err(e) => {
                    warn!("Stock pricing failed for {}: {}", stock.ticker, e);
                    step_errors.push(TickStepError {
                        step: "stock_prices".to_string(),
                        entity_id: Some(stock.id.clone()),
                        message: e.to_string(),
                    });
                    // Still close the interval with a flat candle.
                    candle_plans.push(CandlePlan {
                        asset_id: stock.id,
                        kind: AssetKind::Stock,
                        open: stock.price,
                        close: stock.price,
                    });
                }
            }
        }
        deltas
    }

    fn update_cryptos(
        &self,
        step_errors: &mut Vec<TickStepError>,
        candle_plans: &mut Vec<CandlePlan>,
    ) -> Vec<PriceDelta> {
        let mut deltas = Vec::new();
        for crypto in self.assets.list_cryptos() {
            let tick = {
                let mut rng = self.rng.lock().unwrap();
                next_crypto_price(&crypto, &self.crypto_params, &mut *rng)
            };
            match self.assets.apply_crypto_tick(&crypto, &tick) {
                Ok(updated) => {
                    deltas.push(PriceDelta {
                        asset_id: updated.id.clone(),
                        ticker: updated.ticker.clone(),
                        previous: updated.previous_price,
                        current: updated.current_price,
                    });
                    candle_plans.push(CandlePlan {
                        asset_id: updated.id,
                        kind: AssetKind::Crypto,
                        open: crypto.current_price,
                        close: tick.price,
                    });
                }
                Err(e) => {
                    warn!("Crypto pricing failed for {}: {}", crypto.ticker, e);
                    step_errors.push(TickStepError {
                        step: "crypto_prices".to_string(),
                        entity_id: Some(crypto.id.clone()),
                        message: e.to_string(),
                    });
                    candle_plans.push(CandlePlan {
                        asset_id: crypto.id,
                        kind: AssetKind::Crypto,
                        open: crypto.current_price,
                        close: crypto.current_price,
                    });
                }
            }
        }
        deltas
    }
}
