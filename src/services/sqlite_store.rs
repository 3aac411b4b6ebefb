//! SQLite persistence layer for the game economy.
//!
//! The store is the single logical ledger: every monetary or holdings
//! mutation runs inside one SQLite transaction behind the connection mutex,
//! so each operation is atomic and serializable. Guarded fields (balances,
//! holding quantities, product stock) are re-checked inside the transaction
//! before being written.
//!
//! Append-only tables (transactions, trades, candles, ticks) are never
//! updated or deleted except by moderation data purges.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, error, info};

use crate::types::money::{self, Money};
use crate::types::{
    Account, AccountKind, AssetKind, BotPurchase, Candle, Cryptocurrency, Holding, Loan,
    LoanStatus, Product, Role, Stock, TickRecord, Trade, TradeSide, Transaction, TransferKind,
};

use super::EconError;

/// Everything a validated trade needs to commit atomically.
///
/// Built by the trading engine after validation; the store re-checks the
/// guarded fields inside the transaction and applies balance, holding,
/// asset-price, transaction and trade writes as one unit.
#[derive(Debug, Clone)]
pub struct TradeEffect {
    pub account_id: String,
    /// Settlement account. `Some` for stock trades (the issuing company);
    /// `None` for crypto trades, which settle against the system pool.
    pub counterparty: Option<String>,
    pub asset_id: String,
    pub asset_kind: AssetKind,
    pub side: TradeSide,
    pub quantity: i64,
    /// Effective unit price after any price impact.
    pub price: Money,
    /// quantity * price.
    pub total: Money,
    /// For crypto trades: the post-impact (price, market_cap) to store.
    pub new_asset_price: Option<(Money, Money)>,
    /// Per-account share cap, enforced on stock buys.
    pub holding_cap: Option<i64>,
    pub description: String,
}

/// SQLite store backing every service.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite store initialized");
        Ok(store)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                balance INTEGER NOT NULL,
                role TEXT NOT NULL DEFAULT 'player',
                is_public INTEGER NOT NULL DEFAULT 0,
                market_cap INTEGER NOT NULL DEFAULT 0,
                shares_outstanding INTEGER NOT NULL DEFAULT 0,
                reputation REAL NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_accounts_owner ON accounts(owner_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS stocks (
                id TEXT PRIMARY KEY,
                company_id TEXT NOT NULL,
                ticker TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                price INTEGER NOT NULL,
                previous_price INTEGER NOT NULL,
                total_shares INTEGER NOT NULL,
                market_cap INTEGER NOT NULL,
                fair_value INTEGER NOT NULL,
                growth_rate REAL NOT NULL,
                sentiment REAL NOT NULL,
                volatility REAL NOT NULL,
                last_change_pct REAL NOT NULL,
                flagged INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cryptocurrencies (
                id TEXT PRIMARY KEY,
                ticker TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                creator_account_id TEXT NOT NULL,
                current_price INTEGER NOT NULL,
                previous_price INTEGER NOT NULL,
                circulating_supply INTEGER NOT NULL,
                total_supply INTEGER NOT NULL,
                market_cap INTEGER NOT NULL,
                liquidity INTEGER NOT NULL,
                base_volatility REAL NOT NULL,
                volatility REAL NOT NULL,
                trend_drift REAL NOT NULL,
                last_price_change REAL NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS holdings (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                asset_id TEXT NOT NULL,
                asset_kind TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                average_price INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(account_id, asset_id)
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_holdings_account ON holdings(account_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                from_account TEXT,
                to_account TEXT,
                amount INTEGER NOT NULL,
                kind TEXT NOT NULL,
                description TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_transactions_from ON transactions(from_account)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_transactions_to ON transactions(to_account)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                asset_id TEXT NOT NULL,
                asset_kind TEXT NOT NULL,
                side TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                price INTEGER NOT NULL,
                total INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_trades_account ON trades(account_id, timestamp DESC)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_trades_asset ON trades(asset_id, timestamp DESC)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS loans (
                id TEXT PRIMARY KEY,
                player_account_id TEXT NOT NULL,
                principal INTEGER NOT NULL,
                remaining_balance INTEGER NOT NULL,
                interest_rate REAL NOT NULL,
                accrued_interest INTEGER NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                last_interest_applied INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_loans_player ON loans(player_account_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_loans_status ON loans(status)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                company_id TEXT NOT NULL,
                name TEXT NOT NULL,
                price INTEGER NOT NULL,
                quality REAL NOT NULL,
                stock INTEGER NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                total_sold INTEGER NOT NULL DEFAULT 0,
                total_revenue INTEGER NOT NULL DEFAULT 0,
                recent_sales_count INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_company ON products(company_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS candles (
                asset_id TEXT NOT NULL,
                asset_kind TEXT NOT NULL,
                tick_seq INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                open INTEGER NOT NULL,
                high INTEGER NOT NULL,
                low INTEGER NOT NULL,
                close INTEGER NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (asset_id, tick_seq)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ticks (
                seq INTEGER PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                total_bot_spend INTEGER NOT NULL,
                record_json TEXT NOT NULL
            )",
            [],
        )?;

        info!("SQLite schema initialized");
        Ok(())
    }

    // ========== Accounts ==========

    /// Insert or replace an account.
    pub fn save_account(&self, account: &Account) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO accounts
             (id, kind, owner_id, name, balance, role, is_public, market_cap,
              shares_outstanding, reputation, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                account.id,
                account.kind.to_string(),
                account.owner_id,
                account.name,
                account.balance,
                account.role.to_string(),
                account.is_public as i64,
                account.market_cap,
                account.shares_outstanding,
                account.reputation,
                account.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get an account by ID.
    pub fn get_account(&self, id: &str) -> Option<Account> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT id, kind, owner_id, name, balance, role, is_public, market_cap,
                        shares_outstanding, reputation, created_at
                 FROM accounts WHERE id = ?1",
                params![id],
                row_to_account,
            )
            .optional();
        match result {
            Ok(account) => account,
            Err(e) => {
                error!("Error fetching account {}: {}", id, e);
                None
            }
        }
    }

    /// List all accounts of one kind.
    pub fn list_accounts(&self, kind: AccountKind) -> Vec<Account> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(
            "SELECT id, kind, owner_id, name, balance, role, is_public, market_cap,
                    shares_outstanding, reputation, created_at
             FROM accounts WHERE kind = ?1 ORDER BY created_at",
        ) {
            Ok(s) => s,
            Err(e) => {
                error!("Error preparing account list: {}", e);
                return Vec::new();
            }
        };
        stmt.query_map(params![kind.to_string()], row_to_account)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    // ========== Stocks ==========

    /// Insert or replace a stock.
    pub fn save_stock(&self, stock: &Stock) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO stocks
             (id, company_id, ticker, name, price, previous_price, total_shares,
              market_cap, fair_value, growth_rate, sentiment, volatility,
              last_change_pct, flagged, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                stock.id,
                stock.company_id,
                stock.ticker,
                stock.name,
                stock.price,
                stock.previous_price,
                stock.total_shares,
                stock.market_cap,
                stock.fair_value,
                stock.growth_rate,
                stock.sentiment,
                stock.volatility,
                stock.last_change_pct,
                stock.flagged as i64,
                stock.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a stock by ID.
    pub fn get_stock(&self, id: &str) -> Option<Stock> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{} WHERE id = ?1", STOCK_SELECT),
            params![id],
            row_to_stock,
        )
        .optional()
        .unwrap_or_else(|e| {
            error!("Error fetching stock {}: {}", id, e);
            None
        })
    }

    /// Get a stock by ticker.
    pub fn get_stock_by_ticker(&self, ticker: &str) -> Option<Stock> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{} WHERE ticker = ?1", STOCK_SELECT),
            params![ticker],
            row_to_stock,
        )
        .optional()
        .unwrap_or(None)
    }

    /// List all stocks.
    pub fn list_stocks(&self) -> Vec<Stock> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(&format!("{} ORDER BY ticker", STOCK_SELECT)) {
            Ok(s) => s,
            Err(e) => {
                error!("Error preparing stock list: {}", e);
                return Vec::new();
            }
        };
        stmt.query_map([], row_to_stock)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    /// Delete a stock and its dependent holdings and candles (moderation).
    pub fn delete_stock(&self, id: &str) -> Result<(), rusqlite::Error> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM holdings WHERE asset_id = ?1", params![id])?;
        tx.execute("DELETE FROM candles WHERE asset_id = ?1", params![id])?;
        tx.execute("DELETE FROM stocks WHERE id = ?1", params![id])?;
        tx.commit()
    }

    // ========== Cryptocurrencies ==========

    /// Insert or replace a cryptocurrency.
    pub fn save_crypto(&self, crypto: &Cryptocurrency) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO cryptocurrencies
             (id, ticker, name, creator_account_id, current_price, previous_price,
              circulating_supply, total_supply, market_cap, liquidity,
              base_volatility, volatility, trend_drift, last_price_change, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                crypto.id,
                crypto.ticker,
                crypto.name,
                crypto.creator_account_id,
                crypto.current_price,
                crypto.previous_price,
                crypto.circulating_supply,
                crypto.total_supply,
                crypto.market_cap,
                crypto.liquidity,
                crypto.base_volatility,
                crypto.volatility,
                crypto.trend_drift,
                crypto.last_price_change,
                crypto.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a cryptocurrency by ID.
    pub fn get_crypto(&self, id: &str) -> Option<Cryptocurrency> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{} WHERE id = ?1", CRYPTO_SELECT),
            params![id],
            row_to_crypto,
        )
        .optional()
        .unwrap_or_else(|e| {
            error!("Error fetching crypto {}: {}", id, e);
            None
        })
    }

    /// Get a cryptocurrency by ticker.
    pub fn get_crypto_by_ticker(&self, ticker: &str) -> Option<Cryptocurrency> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{} WHERE ticker = ?1", CRYPTO_SELECT),
            params![ticker],
            row_to_crypto,
        )
        .optional()
        .unwrap_or(None)
    }

    /// List all cryptocurrencies.
    pub fn list_cryptos(&self) -> Vec<Cryptocurrency> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(&format!("{} ORDER BY ticker", CRYPTO_SELECT)) {
            Ok(s) => s,
            Err(e) => {
                error!("Error preparing crypto list: {}", e);
                return Vec::new();
            }
        };
        stmt.query_map([], row_to_crypto)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    /// Delete a cryptocurrency and dependent holdings and candles (moderation).
    pub fn delete_crypto(&self, id: &str) -> Result<(), rusqlite::Error> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM holdings WHERE asset_id = ?1", params![id])?;
        tx.execute("DELETE FROM candles WHERE asset_id = ?1", params![id])?;
        tx.execute("DELETE FROM cryptocurrencies WHERE id = ?1", params![id])?;
        tx.commit()
    }

    /// Whether a ticker is already used by any stock or cryptocurrency.
    pub fn ticker_exists(&self, ticker: &str) -> bool {
        let conn = self.conn.lock().unwrap();
        let in_stocks: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM stocks WHERE ticker = ?1",
                params![ticker],
                |row| row.get(0),
            )
            .unwrap_or(0);
        if in_stocks > 0 {
            return true;
        }
        let in_cryptos: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM cryptocurrencies WHERE ticker = ?1",
                params![ticker],
                |row| row.get(0),
            )
            .unwrap_or(0);
        in_cryptos > 0
    }

    // ========== Holdings ==========

    /// Get a holding for an (account, asset) pair.
    pub fn get_holding(&self, account_id: &str, asset_id: &str) -> Option<Holding> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, account_id, asset_id, asset_kind, quantity, average_price, updated_at
             FROM holdings WHERE account_id = ?1 AND asset_id = ?2",
            params![account_id, asset_id],
            row_to_holding,
        )
        .optional()
        .unwrap_or(None)
    }

    /// List all holdings for an account.
    pub fn holdings_for_account(&self, account_id: &str) -> Vec<Holding> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(
            "SELECT id, account_id, asset_id, asset_kind, quantity, average_price, updated_at
             FROM holdings WHERE account_id = ?1 AND quantity > 0",
        ) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params![account_id], row_to_holding)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    // ========== Transactions and trades ==========

    /// Recent transactions touching an account.
    pub fn transactions_for_account(&self, account_id: &str, limit: usize) -> Vec<Transaction> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(
            "SELECT id, from_account, to_account, amount, kind, description, timestamp
             FROM transactions
             WHERE from_account = ?1 OR to_account = ?1
             ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
        ) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params![account_id, limit as i64], row_to_transaction)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    /// Recent trades for an account.
    pub fn trades_for_account(&self, account_id: &str, limit: usize) -> Vec<Trade> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(
            "SELECT id, account_id, asset_id, asset_kind, side, quantity, price, total, timestamp
             FROM trades WHERE account_id = ?1
             ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
        ) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params![account_id, limit as i64], row_to_trade)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    // ========== Loans ==========

    /// Get a loan by ID.
    pub fn get_loan(&self, id: &str) -> Option<Loan> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{} WHERE id = ?1", LOAN_SELECT),
            params![id],
            row_to_loan,
        )
        .optional()
        .unwrap_or(None)
    }

    /// All loans for a player.
    pub fn loans_for_player(&self, account_id: &str) -> Vec<Loan> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(&format!(
            "{} WHERE player_account_id = ?1 ORDER BY created_at",
            LOAN_SELECT
        )) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params![account_id], row_to_loan)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    /// All currently active loans.
    pub fn active_loans(&self) -> Vec<Loan> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(&format!("{} WHERE status = 'active'", LOAN_SELECT)) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map([], row_to_loan)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    // ========== Products ==========

    /// Insert or replace a product.
    pub fn save_product(&self, product: &Product) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO products
             (id, company_id, name, price, quality, stock, active, total_sold,
              total_revenue, recent_sales_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                product.id,
                product.company_id,
                product.name,
                product.price,
                product.quality,
                product.stock,
                product.active as i64,
                product.total_sold,
                product.total_revenue,
                product.recent_sales_count,
                product.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a product by ID.
    pub fn get_product(&self, id: &str) -> Option<Product> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{} WHERE id = ?1", PRODUCT_SELECT),
            params![id],
            row_to_product,
        )
        .optional()
        .unwrap_or(None)
    }

    /// All active products with stock available.
    pub fn list_purchasable_products(&self) -> Vec<Product> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(&format!(
            "{} WHERE active = 1 AND stock > 0 ORDER BY created_at",
            PRODUCT_SELECT
        )) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map([], row_to_product)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    // ========== Candles and ticks ==========

    /// Append a candle. One per (asset, tick).
    pub fn insert_candle(&self, candle: &Candle) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO candles
             (asset_id, asset_kind, tick_seq, timestamp, open, high, low, close, volume)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                candle.asset_id,
                candle.asset_kind.to_string(),
                candle.tick_seq,
                candle.timestamp,
                candle.open,
                candle.high,
                candle.low,
                candle.close,
                candle.volume,
            ],
        )?;
        Ok(())
    }

    /// Most recent candles for an asset, oldest first.
    pub fn candles_for_asset(&self, asset_id: &str, limit: usize) -> Vec<Candle> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(
            "SELECT asset_id, asset_kind, tick_seq, timestamp, open, high, low, close, volume
             FROM (SELECT * FROM candles WHERE asset_id = ?1
                   ORDER BY tick_seq DESC LIMIT ?2)
             ORDER BY tick_seq ASC",
        ) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params![asset_id, limit as i64], row_to_candle)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    /// Number of candles recorded for an asset.
    pub fn candle_count(&self, asset_id: &str) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM candles WHERE asset_id = ?1",
            params![asset_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as usize)
        .unwrap_or(0)
    }

    /// Append a tick record.
    pub fn insert_tick(&self, record: &TickRecord) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let json = serde_json::to_string(record).unwrap_or_default();
        conn.execute(
            "INSERT OR REPLACE INTO ticks (seq, timestamp, total_bot_spend, record_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![record.seq, record.timestamp, record.total_bot_spend, json],
        )?;
        Ok(())
    }

    /// Highest recorded tick sequence number, 0 if none.
    pub fn latest_tick_seq(&self) -> i64 {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM ticks", [], |row| {
            row.get(0)
        })
        .unwrap_or(0)
    }

    /// Most recent tick records, newest first.
    pub fn recent_ticks(&self, limit: usize) -> Vec<TickRecord> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn
            .prepare("SELECT record_json FROM ticks ORDER BY seq DESC LIMIT ?1")
        {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map(params![limit as i64], |row| row.get::<_, String>(0))
            .map(|rows| {
                rows.filter_map(|r| r.ok())
                    .filter_map(|json| serde_json::from_str(&json).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ========== Transactional appliers ==========

    /// Move cash between accounts as one atomic unit.
    ///
    /// `from = None` mints from the system; `to = None` burns to the system.
    /// The source balance is re-read and re-checked inside the transaction.
    pub fn apply_transfer(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        amount: Money,
        kind: TransferKind,
        description: &str,
    ) -> Result<Transaction, EconError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(EconError::from)?;

        if let Some(from_id) = from {
            let balance = balance_in_tx(&tx, from_id)?;
            if balance < amount {
                return Err(EconError::InsufficientBalance {
                    needed: amount,
                    available: balance,
                });
            }
            set_balance_in_tx(&tx, from_id, balance - amount)?;
        }

        if let Some(to_id) = to {
            let balance = balance_in_tx(&tx, to_id)?;
            let credited = money::add(balance, amount).ok_or(EconError::OverflowDetected)?;
            set_balance_in_tx(&tx, to_id, credited)?;
        }

        let record = Transaction::new(
            from.map(str::to_string),
            to.map(str::to_string),
            amount,
            kind,
            description.to_string(),
        );
        insert_transaction_in_tx(&tx, &record)?;
        tx.commit().map_err(EconError::from)?;
        Ok(record)
    }

    /// Commit a validated trade: balances, holding, asset price, transaction
    /// and trade record, all in one transaction. Guarded fields are
    /// re-checked before writing; any failure leaves no partial state.
    pub fn apply_trade(&self, effect: &TradeEffect) -> Result<(Transaction, Trade), EconError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(EconError::from)?;

        match effect.side {
            TradeSide::Buy => {
                let balance = balance_in_tx(&tx, &effect.account_id)?;
                if balance < effect.total {
                    return Err(EconError::InsufficientBalance {
                        needed: effect.total,
                        available: balance,
                    });
                }
                set_balance_in_tx(&tx, &effect.account_id, balance - effect.total)?;

                if let Some(counterparty) = &effect.counterparty {
                    let cp_balance = balance_in_tx(&tx, counterparty)?;
                    let credited = money::add(cp_balance, effect.total)
                        .ok_or(EconError::OverflowDetected)?;
                    set_balance_in_tx(&tx, counterparty, credited)?;
                }

                // Fold the buy into the holding, creating it if absent.
                let mut holding = holding_in_tx(&tx, &effect.account_id, &effect.asset_id)?
                    .unwrap_or_else(|| {
                        Holding::new(
                            effect.account_id.clone(),
                            effect.asset_id.clone(),
                            effect.asset_kind,
                        )
                    });
                if let Some(cap) = effect.holding_cap {
                    let attempted = holding
                        .quantity
                        .checked_add(effect.quantity)
                        .ok_or(EconError::OverflowDetected)?;
                    if attempted > cap {
                        return Err(EconError::HoldingLimitExceeded { attempted, cap });
                    }
                }
                holding
                    .apply_buy(effect.quantity, effect.price)
                    .ok_or(EconError::OverflowDetected)?;
                upsert_holding(&tx, &holding).map_err(EconError::from)?;
            }
            TradeSide::Sell => {
                let holding = holding_in_tx(&tx, &effect.account_id, &effect.asset_id)?;
                let mut holding = match holding {
                    Some(h) if h.quantity >= effect.quantity => h,
                    Some(h) => {
                        return Err(EconError::InsufficientHoldings {
                            needed: effect.quantity,
                            available: h.quantity,
                        })
                    }
                    None => {
                        return Err(EconError::InsufficientHoldings {
                            needed: effect.quantity,
                            available: 0,
                        })
                    }
                };
                holding
                    .apply_sell(effect.quantity)
                    .ok_or(EconError::InsufficientHoldings {
                        needed: effect.quantity,
                        available: holding.quantity,
                    })?;
                upsert_holding(&tx, &holding).map_err(EconError::from)?;

                if let Some(counterparty) = &effect.counterparty {
                    let cp_balance = balance_in_tx(&tx, counterparty)?;
                    if cp_balance < effect.total {
                        return Err(EconError::InsufficientBalance {
                            needed: effect.total,
                            available: cp_balance,
                        });
                    }
                    set_balance_in_tx(&tx, counterparty, cp_balance - effect.total)?;
                }

                let balance = balance_in_tx(&tx, &effect.account_id)?;
                let credited =
                    money::add(balance, effect.total).ok_or(EconError::OverflowDetected)?;
                set_balance_in_tx(&tx, &effect.account_id, credited)?;
            }
        }

        // Crypto price impact lands on the stored price as part of the trade.
        if let Some((new_price, new_cap)) = effect.new_asset_price {
            tx.execute(
                "UPDATE cryptocurrencies SET current_price = ?1, market_cap = ?2 WHERE id = ?3",
                params![new_price, new_cap, effect.asset_id],
            )
            .map_err(EconError::from)?;
        }

        let transfer_kind = match effect.asset_kind {
            AssetKind::Stock => TransferKind::Stock,
            AssetKind::Crypto => TransferKind::Crypto,
        };
        let (txn_from, txn_to) = match effect.side {
            TradeSide::Buy => (
                Some(effect.account_id.clone()),
                effect.counterparty.clone(),
            ),
            TradeSide::Sell => (
                effect.counterparty.clone(),
                Some(effect.account_id.clone()),
            ),
        };
        let record = Transaction::new(
            txn_from,
            txn_to,
            effect.total,
            transfer_kind,
            effect.description.clone(),
        );
        insert_transaction_in_tx(&tx, &record)?;

        let trade = Trade::new(
            effect.account_id.clone(),
            effect.asset_id.clone(),
            effect.asset_kind,
            effect.side,
            effect.quantity,
            effect.price,
            effect.total,
        );
        tx.execute(
            "INSERT INTO trades
             (id, account_id, asset_id, asset_kind, side, quantity, price, total, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                trade.id,
                trade.account_id,
                trade.asset_id,
                trade.asset_kind.to_string(),
                trade.side.to_string(),
                trade.quantity,
                trade.price,
                trade.total,
                trade.timestamp,
            ],
        )
        .map_err(EconError::from)?;

        tx.commit().map_err(EconError::from)?;
        Ok((record, trade))
    }

    /// Commit one bot purchase: product stock and counters, company credit
    /// (minted from the bot budget), and the transaction record.
    pub fn apply_bot_purchase(
        &self,
        product_id: &str,
        quantity: i64,
        description: &str,
    ) -> Result<BotPurchase, EconError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(EconError::from)?;

        let product = tx
            .query_row(
                &format!("{} WHERE id = ?1", PRODUCT_SELECT),
                params![product_id],
                row_to_product,
            )
            .optional()
            .map_err(EconError::from)?
            .ok_or_else(|| EconError::ProductNotFound(product_id.to_string()))?;

        if quantity <= 0 {
            return Err(EconError::InvalidAmount(format!(
                "bot purchase quantity {} must be positive",
                quantity
            )));
        }
        if quantity > product.stock {
            return Err(EconError::InsufficientHoldings {
                needed: quantity,
                available: product.stock,
            });
        }

        let total = money::mul_qty(product.price, quantity).ok_or(EconError::OverflowDetected)?;
        let new_revenue =
            money::add(product.total_revenue, total).ok_or(EconError::OverflowDetected)?;

        tx.execute(
            "UPDATE products
             SET stock = stock - ?1,
                 total_sold = total_sold + ?1,
                 total_revenue = ?2,
                 recent_sales_count = recent_sales_count + ?1
             WHERE id = ?3",
            params![quantity, new_revenue, product_id],
        )
        .map_err(EconError::from)?;

        let balance = balance_in_tx(&tx, &product.company_id)?;
        let credited = money::add(balance, total).ok_or(EconError::OverflowDetected)?;
        set_balance_in_tx(&tx, &product.company_id, credited)?;

        let record = Transaction::new(
            None,
            Some(product.company_id.clone()),
            total,
            TransferKind::Product,
            description.to_string(),
        );
        insert_transaction_in_tx(&tx, &record)?;

        tx.commit().map_err(EconError::from)?;
        Ok(BotPurchase {
            product_id: product_id.to_string(),
            company_id: product.company_id,
            quantity,
            unit_price: product.price,
            total,
        })
    }

    /// Create a cryptocurrency: burn the creation fee from the creator,
    /// insert the asset, and hand the creator the full supply, as one unit.
    pub fn apply_create_crypto(
        &self,
        crypto: &Cryptocurrency,
        fee: Money,
    ) -> Result<Transaction, EconError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(EconError::from)?;

        let balance = balance_in_tx(&tx, &crypto.creator_account_id)?;
        if balance < fee {
            return Err(EconError::InsufficientBalance {
                needed: fee,
                available: balance,
            });
        }
        set_balance_in_tx(&tx, &crypto.creator_account_id, balance - fee)?;

        tx.execute(
            "INSERT INTO cryptocurrencies
             (id, ticker, name, creator_account_id, current_price, previous_price,
              circulating_supply, total_supply, market_cap, liquidity,
              base_volatility, volatility, trend_drift, last_price_change, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                crypto.id,
                crypto.ticker,
                crypto.name,
                crypto.creator_account_id,
                crypto.current_price,
                crypto.previous_price,
                crypto.circulating_supply,
                crypto.total_supply,
                crypto.market_cap,
                crypto.liquidity,
                crypto.base_volatility,
                crypto.volatility,
                crypto.trend_drift,
                crypto.last_price_change,
                crypto.created_at,
            ],
        )
        .map_err(EconError::from)?;

        let mut holding = Holding::new(
            crypto.creator_account_id.clone(),
            crypto.id.clone(),
            AssetKind::Crypto,
        );
        holding.quantity = crypto.circulating_supply;
        holding.average_price = crypto.current_price;
        upsert_holding(&tx, &holding).map_err(EconError::from)?;

        let record = Transaction::new(
            Some(crypto.creator_account_id.clone()),
            None,
            fee,
            TransferKind::Cash,
            format!("cryptocurrency creation fee: {}", crypto.ticker),
        );
        insert_transaction_in_tx(&tx, &record)?;
        tx.commit().map_err(EconError::from)?;
        Ok(record)
    }

    /// Issue a loan: insert the loan row and mint the principal to the
    /// player, as one unit.
    pub fn apply_loan_issue(&self, loan: &Loan) -> Result<Transaction, EconError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(EconError::from)?;

        let balance = balance_in_tx(&tx, &loan.player_account_id)?;
        let credited =
            money::add(balance, loan.principal).ok_or(EconError::OverflowDetected)?;
        set_balance_in_tx(&tx, &loan.player_account_id, credited)?;
        upsert_loan(&tx, loan).map_err(EconError::from)?;

        let record = Transaction::new(
            None,
            Some(loan.player_account_id.clone()),
            loan.principal,
            TransferKind::Cash,
            format!("loan issued: {}", loan.id),
        );
        insert_transaction_in_tx(&tx, &record)?;
        tx.commit().map_err(EconError::from)?;
        Ok(record)
    }

    /// Repay part or all of a loan: debit the player (burn), shrink the
    /// balance, flip to paid exactly at zero. Returns the updated loan and
    /// the amount actually applied (overpayment is clamped).
    pub fn apply_loan_repayment(
        &self,
        loan_id: &str,
        amount: Money,
    ) -> Result<(Loan, Money), EconError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(EconError::from)?;

        let mut loan = loan_in_tx(&tx, loan_id)?;
        if loan.status != LoanStatus::Active {
            return Err(EconError::InvalidAmount(format!(
                "loan {} is {}, not active",
                loan_id, loan.status
            )));
        }

        let applied = amount.min(loan.remaining_balance);
        let balance = balance_in_tx(&tx, &loan.player_account_id)?;
        if balance < applied {
            return Err(EconError::InsufficientBalance {
                needed: applied,
                available: balance,
            });
        }
        set_balance_in_tx(&tx, &loan.player_account_id, balance - applied)?;

        loan.remaining_balance -= applied;
        if loan.remaining_balance == 0 {
            loan.status = LoanStatus::Paid;
        }
        upsert_loan(&tx, &loan).map_err(EconError::from)?;

        let record = Transaction::new(
            Some(loan.player_account_id.clone()),
            None,
            applied,
            TransferKind::Cash,
            format!("loan repayment: {}", loan.id),
        );
        insert_transaction_in_tx(&tx, &record)?;
        tx.commit().map_err(EconError::from)?;
        Ok((loan, applied))
    }

    /// Apply one tick's interest to a loan. The accrual is
    /// `floor(remaining * daily_rate / ticks_per_day)`; no balances move.
    /// Returns the updated loan and the accrued amount.
    pub fn apply_loan_interest(
        &self,
        loan_id: &str,
        ticks_per_day: f64,
    ) -> Result<(Loan, Money), EconError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(EconError::from)?;

        let mut loan = loan_in_tx(&tx, loan_id)?;
        if loan.status != LoanStatus::Active {
            tx.commit().map_err(EconError::from)?;
            return Ok((loan, 0));
        }

        let accrued = money::scale_down(loan.remaining_balance, loan.interest_rate, ticks_per_day)
            .ok_or(EconError::OverflowDetected)?;
        loan.remaining_balance = money::add(loan.remaining_balance, accrued)
            .ok_or(EconError::OverflowDetected)?;
        loan.accrued_interest =
            money::add(loan.accrued_interest, accrued).ok_or(EconError::OverflowDetected)?;
        loan.last_interest_applied = chrono::Utc::now().timestamp_millis();
        upsert_loan(&tx, &loan).map_err(EconError::from)?;
        tx.commit().map_err(EconError::from)?;
        Ok((loan, accrued))
    }
}

// =============================================================================
// Row mapping
// =============================================================================

const STOCK_SELECT: &str = "SELECT id, company_id, ticker, name, price, previous_price, \
     total_shares, market_cap, fair_value, growth_rate, sentiment, volatility, \
     last_change_pct, flagged, created_at FROM stocks";

const CRYPTO_SELECT: &str = "SELECT id, ticker, name, creator_account_id, current_price, \
     previous_price, circulating_supply, total_supply, market_cap, liquidity, \
     base_volatility, volatility, trend_drift, last_price_change, created_at \
     FROM cryptocurrencies";

const LOAN_SELECT: &str = "SELECT id, player_account_id, principal, remaining_balance, \
     interest_rate, accrued_interest, status, created_at, last_interest_applied FROM loans";

const PRODUCT_SELECT: &str = "SELECT id, company_id, name, price, quality, stock, active, \
     total_sold, total_revenue, recent_sales_count, created_at FROM products";

fn parse_kind(s: &str) -> AccountKind {
    match s {
        "company" => AccountKind::Company,
        _ => AccountKind::Player,
    }
}

fn parse_role(s: &str) -> Role {
    match s {
        "admin" => Role::Admin,
        "moderator" => Role::Moderator,
        _ => Role::Player,
    }
}

fn parse_asset_kind(s: &str) -> AssetKind {
    match s {
        "crypto" => AssetKind::Crypto,
        _ => AssetKind::Stock,
    }
}

fn parse_loan_status(s: &str) -> LoanStatus {
    match s {
        "paid" => LoanStatus::Paid,
        "defaulted" => LoanStatus::Defaulted,
        _ => LoanStatus::Active,
    }
}

fn parse_side(s: &str) -> TradeSide {
    match s {
        "sell" => TradeSide::Sell,
        _ => TradeSide::Buy,
    }
}

fn parse_transfer_kind(s: &str) -> TransferKind {
    match s {
        "stock" => TransferKind::Stock,
        "crypto" => TransferKind::Crypto,
        "product" => TransferKind::Product,
        _ => TransferKind::Cash,
    }
}

fn row_to_account(row: &rusqlite::Row<'_>) -> Result<Account, rusqlite::Error> {
    let kind: String = row.get(1)?;
    let role: String = row.get(5)?;
    Ok(Account {
        id: row.get(0)?,
        kind: parse_kind(&kind),
        owner_id: row.get(2)?,
        name: row.get(3)?,
        balance: row.get(4)?,
        role: parse_role(&role),
        is_public: row.get::<_, i64>(6)? != 0,
        market_cap: row.get(7)?,
        shares_outstanding: row.get(8)?,
        reputation: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn row_to_stock(row: &rusqlite::Row<'_>) -> Result<Stock, rusqlite::Error> {
    Ok(Stock {
        id: row.get(0)?,
        company_id: row.get(1)?,
        ticker: row.get(2)?,
        name: row.get(3)?,
        price: row.get(4)?,
        previous_price: row.get(5)?,
        total_shares: row.get(6)?,
        market_cap: row.get(7)?,
        fair_value: row.get(8)?,
        growth_rate: row.get(9)?,
        sentiment: row.get(10)?,
        volatility: row.get(11)?,
        last_change_pct: row.get(12)?,
        flagged: row.get::<_, i64>(13)? != 0,
        created_at: row.get(14)?,
    })
}

fn row_to_crypto(row: &rusqlite::Row<'_>) -> Result<Cryptocurrency, rusqlite::Error> {
    Ok(Cryptocurrency {
        id: row.get(0)?,
        ticker: row.get(1)?,
        name: row.get(2)?,
        creator_account_id: row.get(3)?,
        current_price: row.get(4)?,
        previous_price: row.get(5)?,
        circulating_supply: row.get(6)?,
        total_supply: row.get(7)?,
        market_cap: row.get(8)?,
        liquidity: row.get(9)?,
        base_volatility: row.get(10)?,
        volatility: row.get(11)?,
        trend_drift: row.get(12)?,
        last_price_change: row.get(13)?,
        created_at: row.get(14)?,
    })
}

fn row_to_holding(row: &rusqlite::Row<'_>) -> Result<Holding, rusqlite::Error> {
    let kind: String = row.get(3)?;
    Ok(Holding {
        id: row.get(0)?,
        account_id: row.get(1)?,
        asset_id: row.get(2)?,
        asset_kind: parse_asset_kind(&kind),
        quantity: row.get(4)?,
        average_price: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> Result<Transaction, rusqlite::Error> {
    let kind: String = row.get(4)?;
    Ok(Transaction {
        id: row.get(0)?,
        from_account: row.get(1)?,
        to_account: row.get(2)?,
        amount: row.get(3)?,
        kind: parse_transfer_kind(&kind),
        description: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

fn row_to_trade(row: &rusqlite::Row<'_>) -> Result<Trade, rusqlite::Error> {
    let kind: String = row.get(3)?;
    let side: String = row.get(4)?;
    Ok(Trade {
        id: row.get(0)?,
        account_id: row.get(1)?,
        asset_id: row.get(2)?,
        asset_kind: parse_asset_kind(&kind),
        side: parse_side(&side),
        quantity: row.get(5)?,
        price: row.get(6)?,
        total: row.get(7)?,
        timestamp: row.get(8)?,
    })
}

fn row_to_loan(row: &rusqlite::Row<'_>) -> Result<Loan, rusqlite::Error> {
    let status: String = row.get(6)?;
    Ok(Loan {
        id: row.get(0)?,
        player_account_id: row.get(1)?,
        principal: row.get(2)?,
        remaining_balance: row.get(3)?,
        interest_rate: row.get(4)?,
        accrued_interest: row.get(5)?,
        status: parse_loan_status(&status),
        created_at: row.get(7)?,
        last_interest_applied: row.get(8)?,
    })
}

fn row_to_product(row: &rusqlite::Row<'_>) -> Result<Product, rusqlite::Error> {
    Ok(Product {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        price: row.get(3)?,
        quality: row.get(4)?,
        stock: row.get(5)?,
        active: row.get::<_, i64>(6)? != 0,
        total_sold: row.get(7)?,
        total_revenue: row.get(8)?,
        recent_sales_count: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn row_to_candle(row: &rusqlite::Row<'_>) -> Result<Candle, rusqlite::Error> {
    let kind: String = row.get(1)?;
    Ok(Candle {
        asset_id: row.get(0)?,
        asset_kind: parse_asset_kind(&kind),
        tick_seq: row.get(2)?,
        timestamp: row.get(3)?,
        open: row.get(4)?,
        high: row.get(5)?,
        low: row.get(6)?,
        close: row.get(7)?,
        volume: row.get(8)?,
    })
}

// =============================================================================
// In-transaction helpers
// =============================================================================

fn balance_in_tx(conn: &Connection, account_id: &str) -> Result<Money, EconError> {
    conn.query_row(
        "SELECT balance FROM accounts WHERE id = ?1",
        params![account_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(EconError::from)?
    .ok_or_else(|| EconError::AccountNotFound(account_id.to_string()))
}

fn set_balance_in_tx(conn: &Connection, account_id: &str, balance: Money) -> Result<(), EconError> {
    debug_assert!(money::is_safe(balance));
    conn.execute(
        "UPDATE accounts SET balance = ?1 WHERE id = ?2",
        params![balance, account_id],
    )
    .map_err(EconError::from)?;
    Ok(())
}

fn holding_in_tx(
    conn: &Connection,
    account_id: &str,
    asset_id: &str,
) -> Result<Option<Holding>, EconError> {
    conn.query_row(
        "SELECT id, account_id, asset_id, asset_kind, quantity, average_price, updated_at
         FROM holdings WHERE account_id = ?1 AND asset_id = ?2",
        params![account_id, asset_id],
        row_to_holding,
    )
    .optional()
    .map_err(EconError::from)
}

fn loan_in_tx(conn: &Connection, loan_id: &str) -> Result<Loan, EconError> {
    conn.query_row(
        &format!("{} WHERE id = ?1", LOAN_SELECT),
        params![loan_id],
        row_to_loan,
    )
    .optional()
    .map_err(EconError::from)?
    .ok_or_else(|| EconError::LoanNotFound(loan_id.to_string()))
}

fn upsert_holding(conn: &Connection, holding: &Holding) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO holdings
         (id, account_id, asset_id, asset_kind, quantity, average_price, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(account_id, asset_id) DO UPDATE SET
             quantity = excluded.quantity,
             average_price = excluded.average_price,
             updated_at = excluded.updated_at",
        params![
            holding.id,
            holding.account_id,
            holding.asset_id,
            holding.asset_kind.to_string(),
            holding.quantity,
            holding.average_price,
            holding.updated_at,
        ],
    )?;
    Ok(())
}

fn upsert_loan(conn: &Connection, loan: &Loan) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO loans
         (id, player_account_id, principal, remaining_balance, interest_rate,
          accrued_interest, status, created_at, last_interest_applied)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            loan.id,
            loan.player_account_id,
            loan.principal,
            loan.remaining_balance,
            loan.interest_rate,
            loan.accrued_interest,
            loan.status.to_string(),
            loan.created_at,
            loan.last_interest_applied,
        ],
    )?;
    Ok(())
}

fn insert_transaction_in_tx(
    conn: &Connection,
    record: &Transaction,
) -> Result<(), EconError> {
    conn.execute(
        "INSERT INTO transactions
         (id, from_account, to_account, amount, kind, description, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id,
            record.from_account,
            record.to_account,
            record.amount,
            record.kind.to_string(),
            record.description,
            record.timestamp,
        ],
    )
    .map_err(EconError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Account;

    fn store_with_accounts() -> (SqliteStore, Account, Account) {
        let store = SqliteStore::new_in_memory().unwrap();
        let a = Account::player("user-a".to_string(), "Alice".to_string(), 10_000);
        let b = Account::player("user-b".to_string(), "Bob".to_string(), 0);
        store.save_account(&a).unwrap();
        store.save_account(&b).unwrap();
        (store, a, b)
    }

    #[test]
    fn test_transfer_moves_cash_atomically() {
        let (store, a, b) = store_with_accounts();
        store
            .apply_transfer(Some(&a.id), Some(&b.id), 2_500, TransferKind::Cash, "gift")
            .unwrap();
        assert_eq!(store.get_account(&a.id).unwrap().balance, 7_500);
        assert_eq!(store.get_account(&b.id).unwrap().balance, 2_500);
        assert_eq!(store.transactions_for_account(&a.id, 10).len(), 1);
    }

    #[test]
    fn test_transfer_insufficient_leaves_state() {
        let (store, a, b) = store_with_accounts();
        let err = store
            .apply_transfer(Some(&a.id), Some(&b.id), 20_000, TransferKind::Cash, "too much")
            .unwrap_err();
        assert!(matches!(err, EconError::InsufficientBalance { .. }));
        assert_eq!(store.get_account(&a.id).unwrap().balance, 10_000);
        assert_eq!(store.get_account(&b.id).unwrap().balance, 0);
        assert!(store.transactions_for_account(&a.id, 10).is_empty());
    }

    #[test]
    fn test_mint_and_burn() {
        let (store, a, _) = store_with_accounts();
        store
            .apply_transfer(None, Some(&a.id), 5_000, TransferKind::Cash, "mint")
            .unwrap();
        assert_eq!(store.get_account(&a.id).unwrap().balance, 15_000);
        store
            .apply_transfer(Some(&a.id), None, 15_000, TransferKind::Cash, "burn")
            .unwrap();
        assert_eq!(store.get_account(&a.id).unwrap().balance, 0);
    }

    #[test]
    fn test_ticker_exists_across_tables() {
        let store = SqliteStore::new_in_memory().unwrap();
        let stock = Stock::new(
            "co".to_string(),
            "ACME".to_string(),
            "Acme".to_string(),
            100,
            1_000,
            0.01,
            0.02,
        );
        store.save_stock(&stock).unwrap();
        assert!(store.ticker_exists("ACME"));
        assert!(!store.ticker_exists("MOON"));
    }
}
