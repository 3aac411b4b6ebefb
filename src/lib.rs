//! Magnate - economy simulation server for a persistent multiplayer business game

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

use std::sync::Arc;

use config::Config;
use services::{
    AssetService, DemandSimulator, HoldingsStore, LedgerService, LoanService,
    PriceHistoryRecorder, SqliteStore, TickEngine, TradingService,
};

pub use error::{AppError, Result};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ledger: LedgerService,
    pub holdings: HoldingsStore,
    pub assets: AssetService,
    pub trading: TradingService,
    pub demand: DemandSimulator,
    pub loans: LoanService,
    pub history: PriceHistoryRecorder,
    pub tick: Arc<TickEngine>,
}

impl AppState {
    /// Wire the full service stack over one store.
    pub fn build(config: Config, sqlite: Arc<SqliteStore>) -> Self {
        let config = Arc::new(config);
        let ledger = LedgerService::new(sqlite.clone());
        let holdings = HoldingsStore::new(sqlite.clone());
        let assets = AssetService::new(sqlite.clone(), ledger.clone(), config.assets.clone());
        let history = PriceHistoryRecorder::new(sqlite.clone());
        let trading = TradingService::new(
            sqlite.clone(),
            ledger.clone(),
            assets.clone(),
            history.clone(),
            config.trading.clone(),
        );
        let demand = DemandSimulator::new(sqlite.clone(), ledger.clone(), config.demand.clone());
        let loans = LoanService::new(sqlite.clone(), ledger.clone(), config.loans.clone());
        let tick = Arc::new(TickEngine::new(
            sqlite,
            assets.clone(),
            demand.clone(),
            loans.clone(),
            history.clone(),
            &config,
        ));
        Self {
            config,
            ledger,
            holdings,
            assets,
            trading,
            demand,
            loans,
            history,
            tick,
        }
    }
}
