//! Trading engine tests: order sizing, weighted-average cost basis,
//! rejection paths, holding caps, and crypto price impact.

use std::sync::Arc;

use magnate::config::{AssetConfig, TradingConfig};
use magnate::services::{
    AssetService, EconError, HoldingsStore, LedgerService, PriceHistoryRecorder, SqliteStore,
    TradingService,
};
use magnate::types::{Account, Cryptocurrency, OrderAmount, Stock, TradeSide};

struct Stack {
    sqlite: Arc<SqliteStore>,
    ledger: LedgerService,
    assets: AssetService,
    holdings: HoldingsStore,
    trading: TradingService,
}

fn stack() -> Stack {
    let sqlite = Arc::new(SqliteStore::new_in_memory().unwrap());
    let ledger = LedgerService::new(sqlite.clone());
    let assets = AssetService::new(sqlite.clone(), ledger.clone(), AssetConfig::default());
    let holdings = HoldingsStore::new(sqlite.clone());
    let history = PriceHistoryRecorder::new(sqlite.clone());
    let trading = TradingService::new(
        sqlite.clone(),
        ledger.clone(),
        assets.clone(),
        history,
        TradingConfig::default(),
    );
    Stack {
        sqlite,
        ledger,
        assets,
        holdings,
        trading,
    }
}

fn player(stack: &Stack, balance: i64) -> Account {
    stack.ledger.create_player("user", "Trader", balance).unwrap()
}

fn listed_stock(stack: &Stack, price: i64) -> Stock {
    let company = stack.ledger.create_company("founder", "Acme", 0).unwrap();
    stack
        .assets
        .ipo_stock(&company.id, "ACME", "Acme Corp", price, 10_000_000, 0.01)
        .unwrap()
}

fn crypto(stack: &Stack, creator: &Account, price: i64, liquidity: i64) -> Cryptocurrency {
    stack
        .assets
        .create_crypto(&creator.id, "MOON", "Mooncoin", price, 1_000_000, liquidity)
        .unwrap()
}

// =============================================================================
// Cost Basis Tests
// =============================================================================

mod cost_basis_tests {
    use super::*;

    #[test]
    fn test_weighted_average_across_two_buys() {
        let s = stack();
        let p = player(&s, 1_000_000_000);
        let stock = listed_stock(&s, 100);

        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(1_000))
            .unwrap();
        s.assets.set_stock_price(&stock.id, 200).unwrap();
        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(1_000))
            .unwrap();

        let holding = s.holdings.get(&p.id, &stock.id).unwrap();
        assert_eq!(holding.quantity, 2_000);
        assert_eq!(holding.average_price, 150);
    }

    #[test]
    fn test_sell_reduces_quantity_keeps_average() {
        let s = stack();
        let p = player(&s, 1_000_000);
        let stock = listed_stock(&s, 100);

        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(100))
            .unwrap();
        s.trading
            .sell_stock(&p.id, &stock.id, OrderAmount::Quantity(40))
            .unwrap();

        let holding = s.holdings.get(&p.id, &stock.id).unwrap();
        assert_eq!(holding.quantity, 60);
        assert_eq!(holding.average_price, 100);
    }
}

// =============================================================================
// Order Sizing Tests
// =============================================================================

mod order_sizing_tests {
    use super::*;

    #[test]
    fn test_cash_amount_converts_at_price() {
        let s = stack();
        let p = player(&s, 100_000);
        let stock = listed_stock(&s, 250);

        // 10,000 cents at 250/share -> 40 shares
        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Cash(10_000))
            .unwrap();
        let holding = s.holdings.get(&p.id, &stock.id).unwrap();
        assert_eq!(holding.quantity, 40);
        assert_eq!(s.ledger.get_account(&p.id).unwrap().balance, 90_000);
    }

    #[test]
    fn test_cash_below_one_unit_rejected() {
        let s = stack();
        let p = player(&s, 100_000);
        let stock = listed_stock(&s, 250);

        let err = s
            .trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Cash(249))
            .unwrap_err();
        assert!(matches!(err, EconError::InvalidAmount(_)));
    }

    #[test]
    fn test_zero_and_negative_quantities_rejected() {
        let s = stack();
        let p = player(&s, 100_000);
        let stock = listed_stock(&s, 250);

        for qty in [0, -10] {
            let err = s
                .trading
                .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(qty))
                .unwrap_err();
            assert!(matches!(err, EconError::InvalidAmount(_)));
        }
    }

    #[test]
    fn test_unknown_asset_rejected() {
        let s = stack();
        let p = player(&s, 100_000);
        let err = s
            .trading
            .buy_stock(&p.id, "missing", OrderAmount::Quantity(1))
            .unwrap_err();
        assert!(matches!(err, EconError::AssetNotFound(_)));
    }
}

// =============================================================================
// Rejection Tests
// =============================================================================

mod rejection_tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_leaves_state_unchanged() {
        let s = stack();
        let p = player(&s, 1_000);
        let stock = listed_stock(&s, 100);

        let err = s
            .trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(11))
            .unwrap_err();
        assert!(matches!(err, EconError::InsufficientBalance { .. }));
        assert_eq!(s.ledger.get_account(&p.id).unwrap().balance, 1_000);
        assert!(s.holdings.get(&p.id, &stock.id).is_none());
        assert!(s.trading.trades(&p.id, 10).is_empty());
    }

    #[test]
    fn test_oversell_rejected_balance_unchanged() {
        let s = stack();
        let p = player(&s, 10_000);
        let stock = listed_stock(&s, 100);

        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(50))
            .unwrap();
        let balance_before = s.ledger.get_account(&p.id).unwrap().balance;

        let err = s
            .trading
            .sell_stock(&p.id, &stock.id, OrderAmount::Quantity(51))
            .unwrap_err();
        assert!(matches!(
            err,
            EconError::InsufficientHoldings {
                needed: 51,
                available: 50
            }
        ));
        assert_eq!(s.ledger.get_account(&p.id).unwrap().balance, balance_before);
        assert_eq!(s.holdings.get(&p.id, &stock.id).unwrap().quantity, 50);
    }

    #[test]
    fn test_sell_without_holding_rejected() {
        let s = stack();
        let p = player(&s, 10_000);
        let stock = listed_stock(&s, 100);

        let err = s
            .trading
            .sell_stock(&p.id, &stock.id, OrderAmount::Quantity(1))
            .unwrap_err();
        assert!(matches!(
            err,
            EconError::InsufficientHoldings {
                needed: 1,
                available: 0
            }
        ));
    }

    #[test]
    fn test_holding_cap_enforced_cumulatively() {
        let s = stack();
        let p = player(&s, 1_000_000_000_000);
        let stock = listed_stock(&s, 100);

        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(999_999))
            .unwrap();
        // One more share is fine; two pass the 1,000,000 cap.
        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(1))
            .unwrap();
        let err = s
            .trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(1))
            .unwrap_err();
        assert!(matches!(err, EconError::HoldingLimitExceeded { .. }));
    }
}

// =============================================================================
// Settlement Tests
// =============================================================================

mod settlement_tests {
    use super::*;

    #[test]
    fn test_stock_trade_settles_against_company() {
        let s = stack();
        let p = player(&s, 100_000);
        let stock = listed_stock(&s, 100);

        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(200))
            .unwrap();
        let company = s.ledger.get_account(&stock.company_id).unwrap();
        assert_eq!(company.balance, 20_000);

        s.trading
            .sell_stock(&p.id, &stock.id, OrderAmount::Quantity(200))
            .unwrap();
        let company = s.ledger.get_account(&stock.company_id).unwrap();
        assert_eq!(company.balance, 0);
        assert_eq!(s.ledger.get_account(&p.id).unwrap().balance, 100_000);
    }

    #[test]
    fn test_stock_sell_fails_when_company_cannot_cover() {
        let s = stack();
        let p = player(&s, 100_000);
        let stock = listed_stock(&s, 100);

        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(100))
            .unwrap();
        // Drain the company's treasury out from under the buyback.
        let drain = s.ledger.create_player("sink", "Sink", 0).unwrap();
        s.ledger
            .transfer(&stock.company_id, &drain.id, 10_000, "drain")
            .unwrap();

        let err = s
            .trading
            .sell_stock(&p.id, &stock.id, OrderAmount::Quantity(100))
            .unwrap_err();
        assert!(matches!(err, EconError::InsufficientBalance { .. }));
        assert_eq!(s.holdings.get(&p.id, &stock.id).unwrap().quantity, 100);
    }

    #[test]
    fn test_trade_records_written() {
        let s = stack();
        let p = player(&s, 100_000);
        let stock = listed_stock(&s, 100);

        s.trading
            .buy_stock(&p.id, &stock.id, OrderAmount::Quantity(10))
            .unwrap();
        s.trading
            .sell_stock(&p.id, &stock.id, OrderAmount::Quantity(5))
            .unwrap();

        let trades = s.trading.trades(&p.id, 10);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, TradeSide::Sell);
        assert_eq!(trades[1].side, TradeSide::Buy);
        assert_eq!(trades[1].total, 1_000);
    }
}

// =============================================================================
// Price Impact Tests
// =============================================================================

mod price_impact_tests {
    use super::*;

    #[test]
    fn test_buy_raises_stored_price_sell_lowers_it() {
        let s = stack();
        let p = player(&s, 1_000_000_000);
        let coin = crypto(&s, &p, 10_000, 100_000);
        let start = s.assets.get_crypto(&coin.id).unwrap().current_price;

        s.trading
            .buy_crypto(&p.id, &coin.id, OrderAmount::Quantity(10_000))
            .unwrap();
        let after_buy = s.assets.get_crypto(&coin.id).unwrap().current_price;
        assert!(after_buy > start);

        s.trading
            .sell_crypto(&p.id, &coin.id, OrderAmount::Quantity(10_000))
            .unwrap();
        let after_sell = s.assets.get_crypto(&coin.id).unwrap().current_price;
        assert!(after_sell < after_buy);
    }

    #[test]
    fn test_single_trade_impact_capped() {
        let s = stack();
        let p = player(&s, 1_000_000_000_000);
        let coin = crypto(&s, &p, 10_000, 1_000);
        let start = s.assets.get_crypto(&coin.id).unwrap().current_price;

        // A trade vastly larger than the pool still moves the price by at
        // most the configured cap (10%).
        s.trading
            .buy_crypto(&p.id, &coin.id, OrderAmount::Quantity(900_000))
            .unwrap();
        let after = s.assets.get_crypto(&coin.id).unwrap().current_price;
        assert!(after > start);
        assert!(after <= (start as f64 * 1.10).floor() as i64);
    }

    #[test]
    fn test_market_cap_tracks_impacted_price() {
        let s = stack();
        let p = player(&s, 1_000_000_000);
        let coin = crypto(&s, &p, 500, 100_000);

        s.trading
            .buy_crypto(&p.id, &coin.id, OrderAmount::Quantity(50_000))
            .unwrap();
        let after = s.assets.get_crypto(&coin.id).unwrap();
        assert_eq!(
            after.market_cap,
            after.current_price * after.circulating_supply
        );
    }

    #[test]
    fn test_crypto_market_cap_example() {
        let s = stack();
        let p = player(&s, 1_000_000_000);
        let coin = s
            .assets
            .create_crypto(&p.id, "BIG", "Bigcoin", 500, 1_000_000, 100_000)
            .unwrap();
        assert_eq!(coin.market_cap, 500_000_000);
    }
}

// =============================================================================
// Asset Creation Tests
// =============================================================================

mod creation_tests {
    use super::*;

    #[test]
    fn test_duplicate_ticker_rejected() {
        let s = stack();
        let p = player(&s, 1_000_000_000);
        crypto(&s, &p, 1_000, 10_000);

        let err = s
            .assets
            .create_crypto(&p.id, "MOON", "Other Mooncoin", 1_000, 500_000, 10_000)
            .unwrap_err();
        assert!(matches!(err, EconError::DuplicateTicker(_)));
    }

    #[test]
    fn test_ticker_unique_across_stocks_and_cryptos() {
        let s = stack();
        let p = player(&s, 1_000_000_000);
        listed_stock(&s, 100); // ACME

        let err = s
            .assets
            .create_crypto(&p.id, "ACME", "Acme Coin", 1_000, 500_000, 10_000)
            .unwrap_err();
        assert!(matches!(err, EconError::DuplicateTicker(_)));
    }

    #[test]
    fn test_creation_fee_burned_and_supply_delivered() {
        let s = stack();
        let p = player(&s, 2_000_000);
        let coin = crypto(&s, &p, 1_000, 10_000);

        // Default fee is 1,000,000 cents.
        assert_eq!(s.ledger.get_account(&p.id).unwrap().balance, 1_000_000);
        let holding = s.holdings.get(&p.id, &coin.id).unwrap();
        assert_eq!(holding.quantity, coin.total_supply);
    }

    #[test]
    fn test_creation_fails_without_fee() {
        let s = stack();
        let p = player(&s, 100);
        let err = s
            .assets
            .create_crypto(&p.id, "POOR", "Poorcoin", 1_000, 500_000, 10_000)
            .unwrap_err();
        assert!(matches!(err, EconError::InsufficientBalance { .. }));
        // Nothing was created.
        assert!(s.sqlite.get_crypto_by_ticker("POOR").is_none());
        assert_eq!(s.ledger.get_account(&p.id).unwrap().balance, 100);
    }

    #[test]
    fn test_ipo_marks_company_public() {
        let s = stack();
        let stock = listed_stock(&s, 100);
        let company = s.ledger.get_account(&stock.company_id).unwrap();
        assert!(company.is_public);
        assert_eq!(company.shares_outstanding, stock.total_shares);
        assert_eq!(company.market_cap, stock.market_cap);
    }
}
