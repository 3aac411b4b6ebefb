//! Stochastic pricing models.
//!
//! Pure functions computing the next price for a stock or cryptocurrency
//! from its current state, a set of tuning parameters, and an injected
//! random source. Deterministic given a seeded RNG, which is what the
//! statistical tests rely on.

pub mod crypto;
pub mod stock;

pub use crypto::{next_crypto_price, CryptoModelParams, CryptoTick};
pub use stock::{next_stock_price, StockModelParams, StockTick};

use rand::Rng;
use rand_distr::StandardNormal;

use crate::types::money::{Money, MAX_MONEY};

/// Draw a standard normal sample.
pub(crate) fn gaussian<R: Rng>(rng: &mut R) -> f64 {
    rng.sample(StandardNormal)
}

/// Advance a clustered volatility state: blend the previous value with a
/// random shock around the baseline, bounded away from zero and from
/// runaway growth.
pub(crate) fn clustered_volatility<R: Rng>(
    previous: f64,
    base: f64,
    persistence: f64,
    rng: &mut R,
) -> f64 {
    let shock = base * rng.gen_range(0.5..1.5);
    let next = persistence * previous + (1.0 - persistence) * shock;
    next.clamp(base * 0.25, base * 4.0)
}

/// Apply a fractional change to an integer price, flooring to the minor
/// unit and clamping to the valid price range.
pub(crate) fn apply_change(price: Money, change: f64) -> Money {
    let next = (price as f64 * (1.0 + change)).floor();
    if !next.is_finite() {
        return price;
    }
    (next as i64).clamp(1, MAX_MONEY)
}

/// Fraction of the current price a trade of `quantity` units moves it,
/// given the asset's simulated pool depth. Asymptotically bounded by
/// `cap`: no single trade can move the price by more than that fraction.
pub fn impact_fraction(quantity: i64, liquidity: i64, cap: f64) -> f64 {
    if quantity <= 0 {
        return 0.0;
    }
    let q = quantity as f64;
    let depth = liquidity.max(1) as f64;
    cap * q / (q + depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_apply_change_floors_at_one() {
        assert_eq!(apply_change(2, -0.99), 1);
        assert_eq!(apply_change(1, -0.5), 1);
    }

    #[test]
    fn test_apply_change_rounds_down() {
        // 100 * 1.015 = 101.5 -> 101
        assert_eq!(apply_change(100, 0.015), 101);
    }

    #[test]
    fn test_impact_fraction_bounded_by_cap() {
        let cap = 0.1;
        // Even a trade 1000x the pool depth stays under the cap.
        let impact = impact_fraction(1_000_000, 1_000, cap);
        assert!(impact < cap);
        assert!(impact > cap * 0.99);
    }

    #[test]
    fn test_impact_grows_with_size() {
        let small = impact_fraction(100, 100_000, 0.1);
        let large = impact_fraction(10_000, 100_000, 0.1);
        assert!(large > small);
        assert!(small > 0.0);
    }

    #[test]
    fn test_clustered_volatility_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = 0.02;
        let mut vol = base;
        for _ in 0..1_000 {
            vol = clustered_volatility(vol, base, 0.8, &mut rng);
            assert!(vol >= base * 0.25);
            assert!(vol <= base * 4.0);
        }
    }
}
