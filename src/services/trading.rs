//! Trading Engine
//!
//! Buy/sell execution shared by players and the simulation. Orders are
//! sized by unit quantity or by a cash amount converted at the current
//! price. Validation happens before any mutation; the store then applies
//! balance, holding, asset-price, transaction and trade writes as one
//! atomic unit, re-checking every guarded field inside the transaction.
//!
//! Stock trades settle against the issuing company's account, conserving
//! cash. Crypto trades settle against the system pool (burn on buy, mint
//! on sell) and shift the stored price by a liquidity-bounded impact.

use std::sync::Arc;
use tracing::info;

use crate::config::TradingConfig;
use crate::types::money::{self, Money};
use crate::types::{AssetKind, Cryptocurrency, OrderAmount, Stock, Trade, TradeSide};

use super::pricing::impact_fraction;
use super::sqlite_store::TradeEffect;
use super::{AssetService, EconError, LedgerService, PriceHistoryRecorder, SqliteStore};

/// Buy/sell execution against ledger, holdings, and asset prices.
#[derive(Clone)]
pub struct TradingService {
    sqlite: Arc<SqliteStore>,
    ledger: LedgerService,
    assets: AssetService,
    history: PriceHistoryRecorder,
    config: TradingConfig,
}

impl TradingService {
    /// Create a new trading service.
    pub fn new(
        sqlite: Arc<SqliteStore>,
        ledger: LedgerService,
        assets: AssetService,
        history: PriceHistoryRecorder,
        config: TradingConfig,
    ) -> Self {
        Self {
            sqlite,
            ledger,
            assets,
            history,
            config,
        }
    }

    // ==========================================================================
    // Stocks
    // ==========================================================================

    /// Buy shares of a stock. Cash settles to the issuing company.
    pub fn buy_stock(
        &self,
        account_id: &str,
        stock_ref: &str,
        amount: OrderAmount,
    ) -> Result<Trade, EconError> {
        let stock = self.require_stock(stock_ref)?;
        let quantity = resolve_quantity(amount, stock.price)?;
        let cost = money::mul_qty(stock.price, quantity).ok_or(EconError::OverflowDetected)?;
        self.check_balance(account_id, cost)?;

        let effect = TradeEffect {
            account_id: account_id.to_string(),
            counterparty: Some(stock.company_id.clone()),
            asset_id: stock.id.clone(),
            asset_kind: AssetKind::Stock,
            side: TradeSide::Buy,
            quantity,
            price: stock.price,
            total: cost,
            new_asset_price: None,
            holding_cap: Some(self.config.max_stock_holding),
            description: format!("buy {} {}", quantity, stock.ticker),
        };
        let (_, trade) = self.sqlite.apply_trade(&effect)?;
        self.settle(account_id, Some(&stock.company_id), &trade);
        Ok(trade)
    }

    /// Sell shares of a stock. The issuing company buys them back and must
    /// be able to cover the proceeds.
    pub fn sell_stock(
        &self,
        account_id: &str,
        stock_ref: &str,
        amount: OrderAmount,
    ) -> Result<Trade, EconError> {
        let stock = self.require_stock(stock_ref)?;
        let quantity = resolve_quantity(amount, stock.price)?;
        let proceeds = money::mul_qty(stock.price, quantity).ok_or(EconError::OverflowDetected)?;
        self.check_holdings(account_id, &stock.id, quantity)?;

        let effect = TradeEffect {
            account_id: account_id.to_string(),
            counterparty: Some(stock.company_id.clone()),
            asset_id: stock.id.clone(),
            asset_kind: AssetKind::Stock,
            side: TradeSide::Sell,
            quantity,
            price: stock.price,
            total: proceeds,
            new_asset_price: None,
            holding_cap: None,
            description: format!("sell {} {}", quantity, stock.ticker),
        };
        let (_, trade) = self.sqlite.apply_trade(&effect)?;
        self.settle(account_id, Some(&stock.company_id), &trade);
        Ok(trade)
    }

    // ==========================================================================
    // Cryptocurrencies
    // ==========================================================================

    /// Buy coins. The effective price carries the trade's upward impact,
    /// and the impacted price becomes the stored price.
    pub fn buy_crypto(
        &self,
        account_id: &str,
        crypto_ref: &str,
        amount: OrderAmount,
    ) -> Result<Trade, EconError> {
        let crypto = self.require_crypto(crypto_ref)?;
        let quantity = resolve_quantity(amount, crypto.current_price)?;
        let (effective_price, new_cap) =
            impacted_price(&crypto, quantity, self.config.max_impact_pct, TradeSide::Buy)?;
        let cost = money::mul_qty(effective_price, quantity).ok_or(EconError::OverflowDetected)?;
        self.check_balance(account_id, cost)?;

        let effect = TradeEffect {
            account_id: account_id.to_string(),
            counterparty: None,
            asset_id: crypto.id.clone(),
            asset_kind: AssetKind::Crypto,
            side: TradeSide::Buy,
            quantity,
            price: effective_price,
            total: cost,
            new_asset_price: Some((effective_price, new_cap)),
            holding_cap: None,
            description: format!("buy {} {}", quantity, crypto.ticker),
        };
        let (_, trade) = self.sqlite.apply_trade(&effect)?;
        self.assets.refresh(&crypto.id);
        self.settle(account_id, None, &trade);
        Ok(trade)
    }

    /// Sell coins. The effective price carries the trade's downward impact.
    pub fn sell_crypto(
        &self,
        account_id: &str,
        crypto_ref: &str,
        amount: OrderAmount,
    ) -> Result<Trade, EconError> {
        let crypto = self.require_crypto(crypto_ref)?;
        let quantity = resolve_quantity(amount, crypto.current_price)?;
        let (effective_price, new_cap) =
            impacted_price(&crypto, quantity, self.config.max_impact_pct, TradeSide::Sell)?;
        let proceeds =
            money::mul_qty(effective_price, quantity).ok_or(EconError::OverflowDetected)?;
        self.check_holdings(account_id, &crypto.id, quantity)?;

        let effect = TradeEffect {
            account_id: account_id.to_string(),
            counterparty: None,
            asset_id: crypto.id.clone(),
            asset_kind: AssetKind::Crypto,
            side: TradeSide::Sell,
            quantity,
            price: effective_price,
            total: proceeds,
            new_asset_price: Some((effective_price, new_cap)),
            holding_cap: None,
            description: format!("sell {} {}", quantity, crypto.ticker),
        };
        let (_, trade) = self.sqlite.apply_trade(&effect)?;
        self.assets.refresh(&crypto.id);
        self.settle(account_id, None, &trade);
        Ok(trade)
    }

    /// Recent trades for an account.
    pub fn trades(&self, account_id: &str, limit: usize) -> Vec<Trade> {
        self.sqlite.trades_for_account(account_id, limit)
    }

    // ==========================================================================
    // Internals
    // ==========================================================================

    fn require_stock(&self, stock_ref: &str) -> Result<Stock, EconError> {
        self.assets
            .resolve_stock(stock_ref)
            .ok_or_else(|| EconError::AssetNotFound(stock_ref.to_string()))
    }

    fn require_crypto(&self, crypto_ref: &str) -> Result<Cryptocurrency, EconError> {
        self.assets
            .resolve_crypto(crypto_ref)
            .ok_or_else(|| EconError::AssetNotFound(crypto_ref.to_string()))
    }

    fn check_balance(&self, account_id: &str, needed: Money) -> Result<(), EconError> {
        let account = self
            .ledger
            .get_account(account_id)
            .ok_or_else(|| EconError::AccountNotFound(account_id.to_string()))?;
        if account.balance < needed {
            return Err(EconError::InsufficientBalance {
                needed,
                available: account.balance,
            });
        }
        Ok(())
    }

    fn check_holdings(&self, account_id: &str, asset_id: &str, needed: i64) -> Result<(), EconError> {
        self.ledger
            .get_account(account_id)
            .ok_or_else(|| EconError::AccountNotFound(account_id.to_string()))?;
        let available = self
            .sqlite
            .get_holding(account_id, asset_id)
            .map(|h| h.quantity)
            .unwrap_or(0);
        if available < needed {
            return Err(EconError::InsufficientHoldings { needed, available });
        }
        Ok(())
    }

    /// Post-commit bookkeeping: caches and intra-tick trade flow.
    fn settle(&self, account_id: &str, counterparty: Option<&str>, trade: &Trade) {
        self.ledger.refresh(account_id);
        if let Some(cp) = counterparty {
            self.ledger.refresh(cp);
        }
        self.history
            .record_trade(&trade.asset_id, trade.price, trade.quantity);
        info!(
            "{} {} x{} @ {} (total {}) by {}",
            trade.side, trade.asset_id, trade.quantity, trade.price, trade.total, account_id
        );
    }
}

/// Resolve an order size to a strictly positive unit quantity.
fn resolve_quantity(amount: OrderAmount, price: Money) -> Result<i64, EconError> {
    let quantity = match amount {
        OrderAmount::Quantity(q) => q,
        OrderAmount::Cash(cash) => {
            if cash <= 0 || !money::is_safe(cash) {
                return Err(EconError::InvalidAmount(format!(
                    "cash amount {} must be positive",
                    cash
                )));
            }
            money::div_floor(cash, price).ok_or(EconError::OverflowDetected)?
        }
    };
    if quantity <= 0 {
        return Err(EconError::InvalidAmount(format!(
            "order resolves to {} units; must be positive",
            quantity
        )));
    }
    Ok(quantity)
}

/// Effective unit price and resulting market cap for a crypto trade of
/// `quantity` coins. Buys shift the price up, sells down, both bounded by
/// `max_impact_pct` regardless of trade size.
fn impacted_price(
    crypto: &Cryptocurrency,
    quantity: i64,
    max_impact_pct: f64,
    side: TradeSide,
) -> Result<(Money, Money), EconError> {
    let impact = impact_fraction(quantity, crypto.liquidity, max_impact_pct);
    let signed = match side {
        TradeSide::Buy => impact,
        TradeSide::Sell => -impact,
    };
    let effective = ((crypto.current_price as f64) * (1.0 + signed)).floor() as i64;
    let effective = effective.clamp(1, money::MAX_MONEY);
    let new_cap =
        money::mul_qty(effective, crypto.circulating_supply).ok_or(EconError::OverflowDetected)?;
    Ok((effective, new_cap))
}
