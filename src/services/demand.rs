//! Demand Simulator
//!
//! Once per tick, spends a synthetic bot budget across the marketplace.
//! Candidates are weighted by product quality, owning-company reputation,
//! and price attractiveness; each draw spends a randomized slice of the
//! remaining budget, credits the company through the ledger (minted from
//! the bot budget), and never takes a product's stock below zero.
//!
//! Reads no player state; fully deterministic under an injected RNG.

use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::DemandConfig;
use crate::types::money::{self, Money};
use crate::types::{BotPurchase, Product};

use super::{EconError, LedgerService, SqliteStore};

/// What a demand run produced.
#[derive(Debug, Clone, Default)]
pub struct DemandOutcome {
    /// Purchases executed this run, in execution order.
    pub purchases: Vec<BotPurchase>,
    /// Budget the run started with.
    pub budget: Money,
    /// Cash actually minted into company balances.
    pub total_spent: Money,
}

/// Synthetic bot demand over the product marketplace.
#[derive(Clone)]
pub struct DemandSimulator {
    sqlite: Arc<SqliteStore>,
    ledger: LedgerService,
    config: DemandConfig,
}

struct Candidate {
    product: Product,
    weight: f64,
}

impl DemandSimulator {
    /// Create a new demand simulator.
    pub fn new(sqlite: Arc<SqliteStore>, ledger: LedgerService, config: DemandConfig) -> Self {
        Self {
            sqlite,
            ledger,
            config,
        }
    }

    /// Run one tick's worth of bot purchases.
    pub fn run<R: Rng>(&self, rng: &mut R) -> Result<DemandOutcome, EconError> {
        let jitter = rng.gen_range(
            1.0 - self.config.budget_jitter_pct..=1.0 + self.config.budget_jitter_pct,
        );
        let budget = ((self.config.base_budget as f64) * jitter).floor() as Money;
        let budget = budget.clamp(0, money::MAX_MONEY);

        let mut candidates = self.build_candidates();
        let mut outcome = DemandOutcome {
            budget,
            ..Default::default()
        };
        let mut remaining = budget;

        while !candidates.is_empty() && outcome.purchases.len() < self.config.max_purchases_per_tick
        {
            // Drop anything the remaining budget can no longer afford.
            candidates.retain(|c| c.product.price <= remaining);
            if candidates.is_empty() {
                break;
            }

            let index = weighted_draw(&candidates, rng);
            let candidate = &mut candidates[index];

            // Spend a randomized slice of what's left, at least one unit.
            let slice_pct =
                rng.gen_range(self.config.min_slice_pct..=self.config.max_slice_pct);
            let slice = ((remaining as f64) * slice_pct).floor() as Money;
            let mut quantity = slice / candidate.product.price;
            quantity = quantity.max(1).min(candidate.product.stock);
            if quantity <= 0 {
                candidates.swap_remove(index);
                continue;
            }

            let purchase = self.sqlite.apply_bot_purchase(
                &candidate.product.id,
                quantity,
                &format!("bot purchase: {}", candidate.product.name),
            )?;
            self.ledger.refresh(&purchase.company_id);

            remaining = money::sub(remaining, purchase.total).unwrap_or(0);
            outcome.total_spent =
                money::add(outcome.total_spent, purchase.total).ok_or(EconError::OverflowDetected)?;

            candidate.product.stock -= quantity;
            if candidate.product.stock <= 0 {
                candidates.swap_remove(index);
            }
            outcome.purchases.push(purchase);

            if remaining <= 0 {
                break;
            }
        }

        info!(
            "Demand run: {} purchases, {} of {} spent",
            outcome.purchases.len(),
            outcome.total_spent,
            budget
        );
        Ok(outcome)
    }

    /// List a product on the marketplace.
    pub fn create_product(
        &self,
        company_id: &str,
        name: &str,
        price: Money,
        quality: f64,
        stock: i64,
    ) -> Result<Product, EconError> {
        if price <= 0 || !money::is_safe(price) {
            return Err(EconError::InvalidAmount(format!(
                "product price {} must be positive",
                price
            )));
        }
        if stock < 0 {
            return Err(EconError::InvalidAmount(format!(
                "product stock {} must not be negative",
                stock
            )));
        }
        self.ledger
            .get_account(company_id)
            .ok_or_else(|| EconError::AccountNotFound(company_id.to_string()))?;
        let product = Product::new(company_id.to_string(), name.to_string(), price, quality, stock);
        self.sqlite.save_product(&product)?;
        info!("Listed product {} for {} at {}", product.id, company_id, price);
        Ok(product)
    }

    /// Get a product by ID.
    pub fn get_product(&self, id: &str) -> Option<Product> {
        self.sqlite.get_product(id)
    }

    /// All products currently purchasable by bots.
    pub fn purchasable_products(&self) -> Vec<Product> {
        self.sqlite.list_purchasable_products()
    }

    /// Score all active, in-stock products.
    fn build_candidates(&self) -> Vec<Candidate> {
        let products = self.sqlite.list_purchasable_products();
        products
            .into_iter()
            .map(|product| {
                let reputation = self
                    .ledger
                    .get_account(&product.company_id)
                    .map(|a| a.reputation)
                    .unwrap_or(50.0);
                let weight = self.weigh(&product, reputation);
                Candidate { product, weight }
            })
            .collect()
    }

    /// Higher quality, higher reputation, lower price -> higher weight.
    fn weigh(&self, product: &Product, reputation: f64) -> f64 {
        let quality = self.config.quality_weight * (product.quality / 100.0);
        let rep = self.config.reputation_weight * (reputation / 100.0).clamp(0.0, 1.0);
        let price_scale = self.config.price_scale as f64;
        let affordability =
            self.config.price_weight * (price_scale / (price_scale + product.price as f64));
        let weight = quality + rep + affordability;
        debug!("Product {} weighted {:.3}", product.id, weight);
        weight.max(0.001)
    }
}

/// Roulette draw over candidate weights.
fn weighted_draw<R: Rng>(candidates: &[Candidate], rng: &mut R) -> usize {
    let total: f64 = candidates.iter().map(|c| c.weight).sum();
    let mut roll = rng.gen_range(0.0..total.max(f64::MIN_POSITIVE));
    for (i, candidate) in candidates.iter().enumerate() {
        if roll < candidate.weight {
            return i;
        }
        roll -= candidate.weight;
    }
    candidates.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn simulator(config: DemandConfig) -> (DemandSimulator, LedgerService, Arc<SqliteStore>) {
        let sqlite = Arc::new(SqliteStore::new_in_memory().unwrap());
        let ledger = LedgerService::new(sqlite.clone());
        let sim = DemandSimulator::new(sqlite.clone(), ledger.clone(), config);
        (sim, ledger, sqlite)
    }

    fn seed_product(
        sqlite: &SqliteStore,
        ledger: &LedgerService,
        price: Money,
        stock: i64,
    ) -> Product {
        let company = ledger.create_company("founder", "Widgets Inc", 0).unwrap();
        let product = Product::new(company.id, "Widget".to_string(), price, 80.0, stock);
        sqlite.save_product(&product).unwrap();
        product
    }

    #[test]
    fn test_stock_never_negative() {
        let (sim, ledger, sqlite) = simulator(DemandConfig {
            base_budget: 10_000_000,
            ..Default::default()
        });
        let product = seed_product(&sqlite, &ledger, 100, 5);

        let outcome = sim.run(&mut StdRng::seed_from_u64(1)).unwrap();
        let after = sqlite.get_product(&product.id).unwrap();
        assert!(after.stock >= 0);
        let bought: i64 = outcome.purchases.iter().map(|p| p.quantity).sum();
        assert_eq!(after.stock, 5 - bought);
        assert!(bought <= 5);
    }

    #[test]
    fn test_company_credited_exactly_total_spent() {
        let (sim, ledger, sqlite) = simulator(DemandConfig::default());
        let product = seed_product(&sqlite, &ledger, 500, 1_000);

        let outcome = sim.run(&mut StdRng::seed_from_u64(2)).unwrap();
        let company = ledger.get_account(&product.company_id).unwrap();
        assert_eq!(company.balance, outcome.total_spent);
        assert!(outcome.total_spent <= outcome.budget);
    }

    #[test]
    fn test_deterministic_given_seed() {
        let run = || {
            let (sim, ledger, sqlite) = simulator(DemandConfig::default());
            seed_product(&sqlite, &ledger, 500, 1_000);
            sim.run(&mut StdRng::seed_from_u64(42)).unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.budget, b.budget);
        assert_eq!(a.total_spent, b.total_spent);
        assert_eq!(a.purchases.len(), b.purchases.len());
    }

    #[test]
    fn test_no_products_spends_nothing() {
        let (sim, _, _) = simulator(DemandConfig::default());
        let outcome = sim.run(&mut StdRng::seed_from_u64(3)).unwrap();
        assert!(outcome.purchases.is_empty());
        assert_eq!(outcome.total_spent, 0);
    }

    #[test]
    fn test_inactive_products_excluded() {
        let (sim, ledger, sqlite) = simulator(DemandConfig::default());
        let mut product = seed_product(&sqlite, &ledger, 500, 1_000);
        product.active = false;
        sqlite.save_product(&product).unwrap();

        let outcome = sim.run(&mut StdRng::seed_from_u64(4)).unwrap();
        assert!(outcome.purchases.is_empty());
    }
}
