//! Asset Service
//!
//! Lifecycle of tradable assets: stock IPOs, player cryptocurrency
//! creation, admin overrides, and moderation removal. Also the write path
//! the tick engine uses to land pricing-model output on stored assets.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AssetConfig;
use crate::types::money::{self, Money};
use crate::types::{AccountKind, Cryptocurrency, Stock};

use super::pricing::{CryptoTick, StockTick};
use super::{EconError, LedgerService, SqliteStore};

/// Asset lifecycle and tick-side updates.
#[derive(Clone)]
pub struct AssetService {
    sqlite: Arc<SqliteStore>,
    ledger: LedgerService,
    config: AssetConfig,
    /// Stocks cache (asset_id -> Stock).
    stocks: Arc<DashMap<String, Stock>>,
    /// Cryptos cache (asset_id -> Cryptocurrency).
    cryptos: Arc<DashMap<String, Cryptocurrency>>,
}

impl AssetService {
    /// Create a new asset service.
    pub fn new(sqlite: Arc<SqliteStore>, ledger: LedgerService, config: AssetConfig) -> Self {
        Self {
            sqlite,
            ledger,
            config,
            stocks: Arc::new(DashMap::new()),
            cryptos: Arc::new(DashMap::new()),
        }
    }

    // ==========================================================================
    // Creation
    // ==========================================================================

    /// Take a company public: list its stock.
    pub fn ipo_stock(
        &self,
        company_id: &str,
        ticker: &str,
        name: &str,
        price: Money,
        total_shares: i64,
        growth_rate: f64,
    ) -> Result<Stock, EconError> {
        let company = self
            .ledger
            .get_account(company_id)
            .ok_or_else(|| EconError::AccountNotFound(company_id.to_string()))?;
        if company.kind != AccountKind::Company {
            return Err(EconError::InvalidAmount(format!(
                "account {} is not a company",
                company_id
            )));
        }
        if company.is_public {
            return Err(EconError::DuplicateTicker(format!(
                "company {} is already listed",
                company_id
            )));
        }
        if price <= 0 || !money::is_safe(price) {
            return Err(EconError::InvalidAmount(format!(
                "IPO price {} must be positive",
                price
            )));
        }
        if total_shares <= 0 {
            return Err(EconError::InvalidAmount(format!(
                "share count {} must be positive",
                total_shares
            )));
        }
        if self.sqlite.ticker_exists(ticker) {
            return Err(EconError::DuplicateTicker(ticker.to_string()));
        }

        let mut stock = Stock::new(
            company_id.to_string(),
            ticker.to_string(),
            name.to_string(),
            price,
            total_shares,
            growth_rate,
            self.config.default_stock_volatility,
        );
        let market_cap = stock
            .recompute_market_cap()
            .ok_or(EconError::OverflowDetected)?;

        self.sqlite.save_stock(&stock)?;
        self.ledger.mark_public(company_id, market_cap, total_shares)?;
        self.stocks.insert(stock.id.clone(), stock.clone());
        info!("IPO: {} listed {} at {} ({} shares)", company_id, ticker, price, total_shares);
        Ok(stock)
    }

    /// Create a cryptocurrency. The creator pays the fixed fee (burned to
    /// the system) and receives 100% of the supply; one atomic unit.
    pub fn create_crypto(
        &self,
        creator_account_id: &str,
        ticker: &str,
        name: &str,
        initial_price: Money,
        total_supply: i64,
        liquidity: i64,
    ) -> Result<Cryptocurrency, EconError> {
        self.ledger
            .get_account(creator_account_id)
            .ok_or_else(|| EconError::AccountNotFound(creator_account_id.to_string()))?;
        if initial_price <= 0 || !money::is_safe(initial_price) {
            return Err(EconError::InvalidAmount(format!(
                "initial price {} must be positive",
                initial_price
            )));
        }
        if total_supply <= 0 {
            return Err(EconError::InvalidAmount(format!(
                "total supply {} must be positive",
                total_supply
            )));
        }
        if liquidity <= 0 {
            return Err(EconError::InvalidAmount(format!(
                "liquidity {} must be positive",
                liquidity
            )));
        }
        if self.sqlite.ticker_exists(ticker) {
            return Err(EconError::DuplicateTicker(ticker.to_string()));
        }

        let mut crypto = Cryptocurrency::new(
            ticker.to_string(),
            name.to_string(),
            creator_account_id.to_string(),
            initial_price,
            total_supply,
            liquidity,
            self.config.default_crypto_volatility,
        );
        crypto
            .recompute_market_cap()
            .ok_or(EconError::OverflowDetected)?;

        self.sqlite
            .apply_create_crypto(&crypto, self.config.crypto_creation_fee)?;
        self.ledger.refresh(creator_account_id);
        self.cryptos.insert(crypto.id.clone(), crypto.clone());
        info!(
            "Created cryptocurrency {} ({} supply) for {}",
            ticker, total_supply, creator_account_id
        );
        Ok(crypto)
    }

    // ==========================================================================
    // Reads
    // ==========================================================================

    /// Get a stock by ID.
    pub fn get_stock(&self, id: &str) -> Option<Stock> {
        if let Some(stock) = self.stocks.get(id) {
            return Some(stock.clone());
        }
        if let Some(stock) = self.sqlite.get_stock(id) {
            self.stocks.insert(stock.id.clone(), stock.clone());
            return Some(stock);
        }
        None
    }

    /// Get a cryptocurrency by ID.
    pub fn get_crypto(&self, id: &str) -> Option<Cryptocurrency> {
        if let Some(crypto) = self.cryptos.get(id) {
            return Some(crypto.clone());
        }
        if let Some(crypto) = self.sqlite.get_crypto(id) {
            self.cryptos.insert(crypto.id.clone(), crypto.clone());
            return Some(crypto);
        }
        None
    }

    /// Resolve a stock by ID or ticker.
    pub fn resolve_stock(&self, id_or_ticker: &str) -> Option<Stock> {
        self.get_stock(id_or_ticker)
            .or_else(|| self.sqlite.get_stock_by_ticker(id_or_ticker))
    }

    /// Resolve a cryptocurrency by ID or ticker.
    pub fn resolve_crypto(&self, id_or_ticker: &str) -> Option<Cryptocurrency> {
        self.get_crypto(id_or_ticker)
            .or_else(|| self.sqlite.get_crypto_by_ticker(id_or_ticker))
    }

    /// All listed stocks.
    pub fn list_stocks(&self) -> Vec<Stock> {
        self.sqlite.list_stocks()
    }

    /// All cryptocurrencies.
    pub fn list_cryptos(&self) -> Vec<Cryptocurrency> {
        self.sqlite.list_cryptos()
    }

    /// Drop an asset from the caches so the next read hits the store.
    /// Called after the trading engine lands a price impact.
    pub fn refresh(&self, asset_id: &str) {
        self.stocks.remove(asset_id);
        self.cryptos.remove(asset_id);
    }

    // ==========================================================================
    // Tick-side updates
    // ==========================================================================

    /// Land one stock pricing step on the stored asset. Updates
    /// previous/current price, model state, and market cap; mirrors the
    /// cap onto the issuing company.
    pub fn apply_stock_tick(&self, stock: &Stock, tick: &StockTick) -> Result<Stock, EconError> {
        let mut updated = stock.clone();
        updated.previous_price = updated.price;
        updated.price = tick.price;
        updated.fair_value = tick.fair_value;
        updated.volatility = tick.volatility;
        updated.last_change_pct = tick.change_pct;
        let market_cap = updated
            .recompute_market_cap()
            .ok_or(EconError::OverflowDetected)?;

        self.sqlite.save_stock(&updated)?;
        self.stocks.insert(updated.id.clone(), updated.clone());

        // Keep the company record's cap in sync with its stock.
        if let Some(mut company) = self.ledger.get_account(&updated.company_id) {
            company.market_cap = market_cap;
            if let Err(e) = self.sqlite.save_account(&company) {
                warn!("Failed to mirror market cap to {}: {}", company.id, e);
            }
            self.ledger.refresh(&updated.company_id);
        }
        Ok(updated)
    }

    /// Land one crypto pricing step on the stored asset.
    pub fn apply_crypto_tick(
        &self,
        crypto: &Cryptocurrency,
        tick: &CryptoTick,
    ) -> Result<Cryptocurrency, EconError> {
        let mut updated = crypto.clone();
        updated.previous_price = updated.current_price;
        updated.current_price = tick.price;
        updated.trend_drift = tick.trend_drift;
        updated.volatility = tick.volatility;
        updated.last_price_change = tick.change_pct;
        updated
            .recompute_market_cap()
            .ok_or(EconError::OverflowDetected)?;

        self.sqlite.save_crypto(&updated)?;
        self.cryptos.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    // ==========================================================================
    // Moderation / admin
    // ==========================================================================

    /// Admin override: set a stock price directly. Bypasses the pricing
    /// model; safe-integer and positivity invariants still apply.
    pub fn set_stock_price(&self, stock_id: &str, price: Money) -> Result<Stock, EconError> {
        if price <= 0 || !money::is_safe(price) {
            return Err(EconError::InvalidAmount(format!(
                "override price {} must be positive",
                price
            )));
        }
        let stock = self
            .get_stock(stock_id)
            .ok_or_else(|| EconError::AssetNotFound(stock_id.to_string()))?;
        let mut updated = stock;
        updated.previous_price = updated.price;
        updated.price = price;
        let market_cap = updated
            .recompute_market_cap()
            .ok_or(EconError::OverflowDetected)?;
        self.sqlite.save_stock(&updated)?;
        self.stocks.insert(updated.id.clone(), updated.clone());
        if let Some(mut company) = self.ledger.get_account(&updated.company_id) {
            company.market_cap = market_cap;
            let _ = self.sqlite.save_account(&company);
            self.ledger.refresh(&updated.company_id);
        }
        info!("Admin set {} price to {}", updated.ticker, price);
        Ok(updated)
    }

    /// Moderation: flag or unflag a stock, biasing its drift down while set.
    pub fn set_stock_flagged(&self, stock_id: &str, flagged: bool) -> Result<Stock, EconError> {
        let mut stock = self
            .get_stock(stock_id)
            .ok_or_else(|| EconError::AssetNotFound(stock_id.to_string()))?;
        stock.flagged = flagged;
        self.sqlite.save_stock(&stock)?;
        self.stocks.insert(stock.id.clone(), stock.clone());
        Ok(stock)
    }

    /// Moderation: remove an asset and its dependent holdings and history.
    pub fn remove_asset(&self, asset_id: &str) -> Result<(), EconError> {
        if self.sqlite.get_stock(asset_id).is_some() {
            self.sqlite.delete_stock(asset_id)?;
        } else if self.sqlite.get_crypto(asset_id).is_some() {
            self.sqlite.delete_crypto(asset_id)?;
        } else {
            return Err(EconError::AssetNotFound(asset_id.to_string()));
        }
        self.refresh(asset_id);
        warn!("Moderation removed asset {}", asset_id);
        Ok(())
    }
}
