//! Ledger invariants: integer cents, no negative balances, atomic
//! transfers, conservation, and privileged mint/burn.

use std::sync::Arc;

use magnate::config::LoanConfig;
use magnate::services::{EconError, LedgerService, LoanService, SqliteStore};
use magnate::types::money::MAX_MONEY;
use magnate::types::AccountKind;

fn ledger() -> LedgerService {
    LedgerService::new(Arc::new(SqliteStore::new_in_memory().unwrap()))
}

// =============================================================================
// Transfer Tests
// =============================================================================

mod transfer_tests {
    use super::*;

    #[test]
    fn test_transfer_debits_and_credits() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Alice", 100_000).unwrap();
        let b = ledger.create_player("u2", "Bob", 0).unwrap();

        let record = ledger.transfer(&a.id, &b.id, 40_000, "payment").unwrap();

        assert_eq!(record.amount, 40_000);
        assert_eq!(record.from_account.as_deref(), Some(a.id.as_str()));
        assert_eq!(record.to_account.as_deref(), Some(b.id.as_str()));
        assert_eq!(ledger.get_account(&a.id).unwrap().balance, 60_000);
        assert_eq!(ledger.get_account(&b.id).unwrap().balance, 40_000);
    }

    #[test]
    fn test_cash_conserved_across_transfers() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Alice", 500_000).unwrap();
        let b = ledger.create_player("u2", "Bob", 250_000).unwrap();
        let c = ledger.create_company("u1", "Acme", 0).unwrap();

        ledger.transfer(&a.id, &b.id, 123_456, "one").unwrap();
        ledger.transfer(&b.id, &c.id, 99_999, "two").unwrap();
        ledger.transfer(&c.id, &a.id, 50_000, "three").unwrap();

        let total: i64 = [&a.id, &b.id, &c.id]
            .iter()
            .map(|id| ledger.get_account(id).unwrap().balance)
            .sum();
        assert_eq!(total, 750_000);
    }

    #[test]
    fn test_insufficient_balance_no_side_effects() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Alice", 100).unwrap();
        let b = ledger.create_player("u2", "Bob", 0).unwrap();

        let err = ledger.transfer(&a.id, &b.id, 101, "too much").unwrap_err();
        assert!(matches!(err, EconError::InsufficientBalance { .. }));
        assert_eq!(ledger.get_account(&a.id).unwrap().balance, 100);
        assert_eq!(ledger.get_account(&b.id).unwrap().balance, 0);
        assert!(ledger.transactions(&a.id, 10).is_empty());
    }

    #[test]
    fn test_invalid_amounts_rejected() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Alice", 100).unwrap();
        let b = ledger.create_player("u2", "Bob", 0).unwrap();

        assert!(matches!(
            ledger.transfer(&a.id, &b.id, 0, ""),
            Err(EconError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.transfer(&a.id, &b.id, -10, ""),
            Err(EconError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_overflow_detected_and_rejected() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Rich", MAX_MONEY).unwrap();
        let b = ledger.create_player("u2", "Richer", MAX_MONEY).unwrap();

        let err = ledger.transfer(&a.id, &b.id, 1, "overflow").unwrap_err();
        assert!(matches!(err, EconError::OverflowDetected));
        assert_eq!(ledger.get_account(&a.id).unwrap().balance, MAX_MONEY);
        assert_eq!(ledger.get_account(&b.id).unwrap().balance, MAX_MONEY);
    }

    #[test]
    fn test_unknown_account_rejected() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Alice", 100).unwrap();
        assert!(matches!(
            ledger.transfer(&a.id, "missing", 10, ""),
            Err(EconError::AccountNotFound(_))
        ));
    }
}

// =============================================================================
// Mint/Burn Tests
// =============================================================================

mod mint_burn_tests {
    use super::*;

    #[test]
    fn test_mint_bypasses_source_check() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Alice", 0).unwrap();
        ledger.mint(&a.id, 1_000_000, "grant").unwrap();
        assert_eq!(ledger.get_account(&a.id).unwrap().balance, 1_000_000);
    }

    #[test]
    fn test_burn_still_checks_balance() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Alice", 500).unwrap();
        let err = ledger.burn(&a.id, 501, "fee").unwrap_err();
        assert!(matches!(err, EconError::InsufficientBalance { .. }));
        assert_eq!(ledger.get_account(&a.id).unwrap().balance, 500);
    }

    #[test]
    fn test_mint_burn_recorded_as_system_transactions() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Alice", 0).unwrap();
        ledger.mint(&a.id, 100, "in").unwrap();
        ledger.burn(&a.id, 100, "out").unwrap();

        let records = ledger.transactions(&a.id, 10);
        assert_eq!(records.len(), 2);
        let burn = &records[0];
        let mint = &records[1];
        assert!(mint.from_account.is_none());
        assert!(burn.to_account.is_none());
    }
}

// =============================================================================
// Account Tests
// =============================================================================

mod account_tests {
    use super::*;

    #[test]
    fn test_player_and_company_kinds() {
        let ledger = ledger();
        let player = ledger.create_player("u1", "Alice", 0).unwrap();
        let company = ledger.create_company("u1", "Acme", 0).unwrap();

        assert_eq!(player.kind, AccountKind::Player);
        assert_eq!(company.kind, AccountKind::Company);
        assert!(!company.is_public);
        assert_eq!(ledger.list_accounts(AccountKind::Company).len(), 1);
    }

    #[test]
    fn test_admin_set_balance_respects_invariants() {
        let ledger = ledger();
        let a = ledger.create_player("u1", "Alice", 100).unwrap();

        ledger.set_balance(&a.id, 0).unwrap();
        assert_eq!(ledger.get_account(&a.id).unwrap().balance, 0);

        assert!(matches!(
            ledger.set_balance(&a.id, -1),
            Err(EconError::OverflowDetected)
        ));
        assert!(matches!(
            ledger.set_balance(&a.id, MAX_MONEY + 1),
            Err(EconError::OverflowDetected)
        ));
    }

    #[test]
    fn test_balances_never_negative_after_mixed_operations() {
        let sqlite = Arc::new(SqliteStore::new_in_memory().unwrap());
        let ledger = LedgerService::new(sqlite.clone());
        let loans = LoanService::new(sqlite, ledger.clone(), LoanConfig::default());

        let a = ledger.create_player("u1", "Alice", 10_000).unwrap();
        let b = ledger.create_player("u2", "Bob", 0).unwrap();

        let _ = ledger.transfer(&a.id, &b.id, 7_000, "1");
        let _ = ledger.transfer(&b.id, &a.id, 9_000, "2"); // fails
        let _ = loans.create_loan(&b.id, 50_000, 0.05);
        let _ = ledger.burn(&b.id, 60_000, "3"); // fails
        let _ = ledger.transfer(&b.id, &a.id, 40_000, "4");

        for id in [&a.id, &b.id] {
            assert!(ledger.get_account(id).unwrap().balance >= 0);
        }
    }
}
