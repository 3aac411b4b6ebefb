//! Cryptocurrency pricing model.
//!
//! Per tick the price change combines a regime-shifting trend drift with
//! volatility-clustered Gaussian noise. The drift decays toward zero and
//! occasionally flips sign, which produces the long runs and sudden
//! reversals typical of thin crypto markets. Trade volume does not enter
//! here; user trades move the price separately through the impact
//! mechanism in the trading engine.

use rand::Rng;

use crate::types::money::Money;
use crate::types::Cryptocurrency;

use super::{apply_change, clustered_volatility, gaussian};

/// Tuning parameters for the crypto model.
#[derive(Debug, Clone)]
pub struct CryptoModelParams {
    /// Per-tick decay of the trend drift toward zero.
    pub drift_decay: f64,
    /// Scale of the random walk step added to the drift each tick.
    pub drift_shock_scale: f64,
    /// Probability per tick that the drift flips sign (regime shift).
    pub flip_probability: f64,
    /// Fraction of the previous tick's change carried forward.
    pub momentum_weight: f64,
    /// Blend weight of prior volatility in the clustered update.
    pub volatility_persistence: f64,
    /// Hard clamp on the total per-tick change.
    pub max_change_pct: f64,
}

impl Default for CryptoModelParams {
    fn default() -> Self {
        Self {
            drift_decay: 0.95,
            drift_shock_scale: 0.003,
            flip_probability: 0.03,
            momentum_weight: 0.15,
            volatility_persistence: 0.8,
            max_change_pct: 0.35,
        }
    }
}

/// Result of one crypto pricing step.
#[derive(Debug, Clone)]
pub struct CryptoTick {
    pub price: Money,
    pub trend_drift: f64,
    pub volatility: f64,
    /// Realized fractional change, fed back as next tick's momentum term.
    pub change_pct: f64,
}

/// Compute the next price for a cryptocurrency.
pub fn next_crypto_price<R: Rng>(
    crypto: &Cryptocurrency,
    params: &CryptoModelParams,
    rng: &mut R,
) -> CryptoTick {
    // The drift random-walks with decay, and rarely reverses outright.
    let mut trend_drift =
        crypto.trend_drift * params.drift_decay + gaussian(rng) * params.drift_shock_scale;
    if rng.gen_bool(params.flip_probability) {
        trend_drift = -trend_drift;
    }

    let volatility = clustered_volatility(
        crypto.volatility,
        crypto.base_volatility,
        params.volatility_persistence,
        rng,
    );

    let momentum = params.momentum_weight * crypto.last_price_change;
    let noise = volatility * gaussian(rng);

    let total =
        (trend_drift + momentum + noise).clamp(-params.max_change_pct, params.max_change_pct);
    let price = apply_change(crypto.current_price, total);
    let change_pct = (price - crypto.current_price) as f64 / crypto.current_price as f64;

    CryptoTick {
        price,
        trend_drift,
        volatility,
        change_pct,
    }
}
