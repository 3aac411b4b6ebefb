use std::env;

use crate::types::money::Money;

/// Trading engine limits.
#[derive(Debug, Clone)]
pub struct TradingConfig {
    /// Per-account share cap for a single stock.
    pub max_stock_holding: i64,
    /// Cap on the price move a single crypto trade can cause (fraction).
    pub max_impact_pct: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_stock_holding: 1_000_000,
            max_impact_pct: 0.10,
        }
    }
}

/// Demand simulator tuning.
#[derive(Debug, Clone)]
pub struct DemandConfig {
    /// Baseline bot budget per tick, in cents.
    pub base_budget: Money,
    /// Uniform jitter applied to the budget (0.2 = +/-20%).
    pub budget_jitter_pct: f64,
    /// Smallest fraction of the remaining budget spent per draw.
    pub min_slice_pct: f64,
    /// Largest fraction of the remaining budget spent per draw.
    pub max_slice_pct: f64,
    /// Weight of product quality in candidate scoring.
    pub quality_weight: f64,
    /// Weight of company reputation in candidate scoring.
    pub reputation_weight: f64,
    /// Weight of price attractiveness in candidate scoring.
    pub price_weight: f64,
    /// Price at which the attractiveness factor halves, in cents.
    pub price_scale: Money,
    /// Upper bound on purchases per tick; keeps the step bounded.
    pub max_purchases_per_tick: usize,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            base_budget: 5_000_000, // 50,000.00 per tick
            budget_jitter_pct: 0.2,
            min_slice_pct: 0.05,
            max_slice_pct: 0.30,
            quality_weight: 1.0,
            reputation_weight: 1.0,
            price_weight: 1.0,
            price_scale: 100_000,
            max_purchases_per_tick: 200,
        }
    }
}

/// Loan policy.
#[derive(Debug, Clone)]
pub struct LoanConfig {
    /// Largest principal a player may borrow, in cents.
    pub max_principal: Money,
    /// Largest daily interest rate accepted at creation (0.25 = 25%/day).
    pub max_daily_rate: f64,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            max_principal: 5_000_000,
            max_daily_rate: 0.25,
        }
    }
}

/// Asset lifecycle fees and defaults.
#[derive(Debug, Clone)]
pub struct AssetConfig {
    /// Fee burned when a player creates a cryptocurrency, in cents.
    pub crypto_creation_fee: Money,
    /// Starting volatility for newly listed stocks.
    pub default_stock_volatility: f64,
    /// Starting baseline volatility for new cryptocurrencies.
    pub default_crypto_volatility: f64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            crypto_creation_fee: 1_000_000, // 10,000.00
            default_stock_volatility: 0.02,
            default_crypto_volatility: 0.04,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database path.
    pub database_path: String,
    /// Seconds between simulation ticks.
    pub tick_interval_secs: u64,
    /// Optional fixed RNG seed for reproducible simulations.
    pub rng_seed: Option<u64>,
    /// Trading engine limits.
    pub trading: TradingConfig,
    /// Demand simulator tuning.
    pub demand: DemandConfig,
    /// Loan policy.
    pub loans: LoanConfig,
    /// Asset lifecycle fees and defaults.
    pub assets: AssetConfig,
}

impl Config {
    /// Ticks per day at the configured cadence; loan accrual divides the
    /// daily rate by this.
    pub fn ticks_per_day(&self) -> f64 {
        86_400.0 / self.tick_interval_secs.max(1) as f64
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "magnate.db".to_string()),
            tick_interval_secs: env::var("TICK_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            rng_seed: env::var("RNG_SEED").ok().and_then(|v| v.parse().ok()),
            trading: TradingConfig {
                max_stock_holding: env::var("TRADING_MAX_STOCK_HOLDING")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1_000_000),
                max_impact_pct: env::var("TRADING_MAX_IMPACT_PCT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.10),
            },
            demand: DemandConfig {
                base_budget: env::var("DEMAND_BASE_BUDGET")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5_000_000),
                ..Default::default()
            },
            loans: LoanConfig {
                max_principal: env::var("LOAN_MAX_PRINCIPAL")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5_000_000),
                max_daily_rate: env::var("LOAN_MAX_DAILY_RATE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.25),
            },
            assets: AssetConfig {
                crypto_creation_fee: env::var("CRYPTO_CREATION_FEE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1_000_000),
                ..Default::default()
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            database_path: "magnate.db".to_string(),
            tick_interval_secs: 300,
            rng_seed: None,
            trading: TradingConfig::default(),
            demand: DemandConfig::default(),
            loans: LoanConfig::default(),
            assets: AssetConfig::default(),
        }
    }
}
