//! Loan Service
//!
//! Player loans: issuance mints the principal, repayment burns it, and the
//! tick engine compounds interest on every active loan. A loan becomes
//! `paid` exactly when its remaining balance reaches zero; `defaulted` is a
//! reserved status with no transition logic.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LoanConfig;
use crate::types::money::{self, Money};
use crate::types::{AccountKind, Loan, TickStepError};

use super::{EconError, LedgerService, SqliteStore};

/// Loan issuance, repayment, and interest accrual.
#[derive(Clone)]
pub struct LoanService {
    sqlite: Arc<SqliteStore>,
    ledger: LedgerService,
    config: LoanConfig,
}

impl LoanService {
    /// Create a new loan service.
    pub fn new(sqlite: Arc<SqliteStore>, ledger: LedgerService, config: LoanConfig) -> Self {
        Self {
            sqlite,
            ledger,
            config,
        }
    }

    /// Issue a loan: the principal is minted into the player's balance.
    pub fn create_loan(
        &self,
        player_account_id: &str,
        principal: Money,
        daily_rate: f64,
    ) -> Result<Loan, EconError> {
        if principal <= 0 || !money::is_safe(principal) {
            return Err(EconError::InvalidAmount(format!(
                "principal {} must be positive",
                principal
            )));
        }
        if principal > self.config.max_principal {
            return Err(EconError::LoanTooLarge {
                requested: principal,
                ceiling: self.config.max_principal,
            });
        }
        if !(0.0..=self.config.max_daily_rate).contains(&daily_rate) {
            return Err(EconError::InvalidAmount(format!(
                "daily rate {} outside 0..={}",
                daily_rate, self.config.max_daily_rate
            )));
        }
        let account = self
            .ledger
            .get_account(player_account_id)
            .ok_or_else(|| EconError::AccountNotFound(player_account_id.to_string()))?;
        if account.kind != AccountKind::Player {
            return Err(EconError::InvalidAmount(format!(
                "account {} is not a player",
                player_account_id
            )));
        }

        let loan = Loan::new(player_account_id.to_string(), principal, daily_rate);
        self.sqlite.apply_loan_issue(&loan)?;
        self.ledger.refresh(player_account_id);
        info!(
            "Issued loan {} of {} to {} at {}/day",
            loan.id, principal, player_account_id, daily_rate
        );
        Ok(loan)
    }

    /// Repay part or all of a loan. Overpayment clamps to the outstanding
    /// balance; the loan flips to `paid` exactly at zero.
    pub fn repay_loan(&self, loan_id: &str, amount: Money) -> Result<Loan, EconError> {
        if amount <= 0 || !money::is_safe(amount) {
            return Err(EconError::InvalidAmount(format!(
                "repayment {} must be positive",
                amount
            )));
        }
        let (loan, applied) = self.sqlite.apply_loan_repayment(loan_id, amount)?;
        self.ledger.refresh(&loan.player_account_id);
        info!(
            "Repaid {} on loan {} (remaining {}, status {})",
            applied, loan.id, loan.remaining_balance, loan.status
        );
        Ok(loan)
    }

    /// Apply one tick's interest to a single loan.
    pub fn apply_interest(&self, loan_id: &str, ticks_per_day: f64) -> Result<Loan, EconError> {
        let (loan, accrued) = self.sqlite.apply_loan_interest(loan_id, ticks_per_day)?;
        if accrued > 0 {
            info!("Accrued {} interest on loan {}", accrued, loan.id);
        }
        Ok(loan)
    }

    /// Apply one tick's interest to every active loan. One loan's failure
    /// is recorded and does not stop the others.
    pub fn apply_interest_all(&self, ticks_per_day: f64) -> Vec<TickStepError> {
        let mut errors = Vec::new();
        for loan in self.sqlite.active_loans() {
            if let Err(e) = self.apply_interest(&loan.id, ticks_per_day) {
                warn!("Interest accrual failed for loan {}: {}", loan.id, e);
                errors.push(TickStepError {
                    step: "loan_interest".to_string(),
                    entity_id: Some(loan.id),
                    message: e.to_string(),
                });
            }
        }
        errors
    }

    /// Get a loan by ID.
    pub fn get_loan(&self, id: &str) -> Option<Loan> {
        self.sqlite.get_loan(id)
    }

    /// All loans for a player.
    pub fn loans_for_player(&self, account_id: &str) -> Vec<Loan> {
        self.sqlite.loans_for_player(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LoanStatus;

    fn service() -> (LoanService, LedgerService) {
        let sqlite = Arc::new(SqliteStore::new_in_memory().unwrap());
        let ledger = LedgerService::new(sqlite.clone());
        let loans = LoanService::new(sqlite, ledger.clone(), LoanConfig::default());
        (loans, ledger)
    }

    #[test]
    fn test_loan_ceiling() {
        let (loans, ledger) = service();
        let player = ledger.create_player("u", "P", 0).unwrap();
        let err = loans.create_loan(&player.id, 5_000_001, 0.05).unwrap_err();
        assert!(matches!(err, EconError::LoanTooLarge { .. }));
    }

    #[test]
    fn test_issue_mints_principal() {
        let (loans, ledger) = service();
        let player = ledger.create_player("u", "P", 1_000).unwrap();
        loans.create_loan(&player.id, 500_000, 0.05).unwrap();
        assert_eq!(ledger.get_account(&player.id).unwrap().balance, 501_000);
    }

    #[test]
    fn test_overpayment_clamped_and_paid_at_zero() {
        let (loans, ledger) = service();
        let player = ledger.create_player("u", "P", 1_000_000).unwrap();
        let loan = loans.create_loan(&player.id, 500_000, 0.05).unwrap();

        let loan = loans.repay_loan(&loan.id, 9_999_999).unwrap();
        assert_eq!(loan.remaining_balance, 0);
        assert_eq!(loan.status, LoanStatus::Paid);
        // Only the outstanding 500,000 was burned.
        assert_eq!(ledger.get_account(&player.id).unwrap().balance, 1_000_000);
    }

    #[test]
    fn test_interest_skips_paid_loans() {
        let (loans, ledger) = service();
        let player = ledger.create_player("u", "P", 1_000_000).unwrap();
        let loan = loans.create_loan(&player.id, 100_000, 0.05).unwrap();
        loans.repay_loan(&loan.id, 100_000).unwrap();

        let loan = loans.apply_interest(&loan.id, 288.0).unwrap();
        assert_eq!(loan.remaining_balance, 0);
        assert_eq!(loan.status, LoanStatus::Paid);
    }
}
