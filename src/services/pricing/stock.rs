//! Stock pricing model.
//!
//! Per tick: `new = price * (1 + drift + momentum + noise)` where drift
//! reverts the price toward a fundamentals-implied fair value, momentum
//! carries a fraction of the previous tick's move, and noise is Gaussian
//! scaled by a clustered volatility state. The fair value itself advances
//! with the company's growth rate, so healthy companies trend up over time.

use rand::Rng;

use crate::types::money::{self, Money};
use crate::types::Stock;

use super::{apply_change, clustered_volatility, gaussian};

/// Tuning parameters for the stock model.
#[derive(Debug, Clone)]
pub struct StockModelParams {
    /// Fraction of the previous tick's change carried forward.
    pub momentum_weight: f64,
    /// Pull strength toward fair value per tick.
    pub reversion_strength: f64,
    /// How strongly sentiment biases drift.
    pub sentiment_weight: f64,
    /// Extra downward drift while a company is flagged by moderation.
    pub flagged_penalty: f64,
    /// Volatility the reversion scale is normalized against.
    pub reference_volatility: f64,
    /// Blend weight of prior volatility in the clustered update.
    pub volatility_persistence: f64,
    /// Hard clamp on the total per-tick change.
    pub max_change_pct: f64,
    /// Ticks per day, used to pro-rate the daily growth rate.
    pub ticks_per_day: f64,
}

impl Default for StockModelParams {
    fn default() -> Self {
        Self {
            momentum_weight: 0.2,
            reversion_strength: 0.05,
            sentiment_weight: 0.01,
            flagged_penalty: -0.01,
            reference_volatility: 0.02,
            volatility_persistence: 0.8,
            max_change_pct: 0.25,
            ticks_per_day: 288.0,
        }
    }
}

/// Result of one stock pricing step.
#[derive(Debug, Clone)]
pub struct StockTick {
    pub price: Money,
    pub fair_value: Money,
    pub volatility: f64,
    /// Realized fractional change, fed back as next tick's momentum term.
    pub change_pct: f64,
}

/// Compute the next price for a stock.
///
/// Pure given the RNG; the caller applies the output to the stored stock
/// and recomputes the market cap.
pub fn next_stock_price<R: Rng>(
    stock: &Stock,
    params: &StockModelParams,
    rng: &mut R,
) -> StockTick {
    // Fair value compounds with the company's growth rate.
    let growth_per_tick = stock.growth_rate / params.ticks_per_day;
    let fair_value = ((stock.fair_value as f64) * (1.0 + growth_per_tick))
        .floor()
        .max(1.0) as Money;

    // Mean reversion toward fair value, scaled by the volatility estimate:
    // a jumpy stock corrects faster than a sleepy one.
    let gap = (fair_value as f64 - stock.price as f64) / stock.price as f64;
    let vol_scale = (stock.volatility / params.reference_volatility).clamp(0.25, 4.0);
    let mut drift = params.reversion_strength * gap.clamp(-1.0, 1.0) * vol_scale;
    drift += stock.sentiment * params.sentiment_weight;
    if stock.flagged {
        drift += params.flagged_penalty;
    }

    let momentum = params.momentum_weight * stock.last_change_pct;
    let noise = stock.volatility * gaussian(rng);

    let total = (drift + momentum + noise).clamp(-params.max_change_pct, params.max_change_pct);
    let price = apply_change(stock.price, total);
    let change_pct = (price - stock.price) as f64 / stock.price as f64;

    let volatility = clustered_volatility(
        stock.volatility,
        params.reference_volatility,
        params.volatility_persistence,
        rng,
    );

    StockTick {
        price,
        fair_value: fair_value.min(money::MAX_MONEY),
        volatility,
        change_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stock(price: Money) -> Stock {
        Stock::new(
            "co".to_string(),
            "ACME".to_string(),
            "Acme".to_string(),
            price,
            1_000_000,
            0.02,
            0.02,
        )
    }

    #[test]
    fn test_deterministic_given_seed() {
        let s = stock(10_000);
        let params = StockModelParams::default();
        let a = next_stock_price(&s, &params, &mut StdRng::seed_from_u64(42));
        let b = next_stock_price(&s, &params, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.price, b.price);
        assert_eq!(a.volatility, b.volatility);
    }

    #[test]
    fn test_price_never_below_one() {
        let s = stock(1);
        let params = StockModelParams::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let tick = next_stock_price(&s, &params, &mut rng);
            assert!(tick.price >= 1);
        }
    }

    #[test]
    fn test_change_bounded_by_clamp() {
        let s = stock(1_000_000);
        let params = StockModelParams::default();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let tick = next_stock_price(&s, &params, &mut rng);
            assert!(tick.change_pct.abs() <= params.max_change_pct + 1e-9);
        }
    }

    #[test]
    fn test_momentum_carries_trend() {
        // With zero volatility and zero growth, a prior up-move alone
        // produces an up-drift through the momentum term.
        let mut s = stock(10_000);
        s.volatility = 0.0;
        s.growth_rate = 0.0;
        s.last_change_pct = 0.10;
        let params = StockModelParams {
            reference_volatility: 0.02,
            ..Default::default()
        };
        let tick = next_stock_price(&s, &params, &mut StdRng::seed_from_u64(3));
        assert!(tick.price > s.price);
    }

    #[test]
    fn test_reversion_pulls_toward_fair_value() {
        let mut s = stock(10_000);
        s.fair_value = 20_000;
        s.volatility = 0.0;
        s.last_change_pct = 0.0;
        let tick = next_stock_price(&s, &StockModelParams::default(), &mut StdRng::seed_from_u64(5));
        assert!(tick.price > s.price);
    }
}
