//! Ledger Service
//!
//! The single entry point for moving cash. Validates amounts before any
//! mutation, then applies debit + credit + transaction record as one atomic
//! unit through the SQLite store. `mint` and `burn` are the privileged
//! variants used by loan issuance/repayment, creation fees, and bot
//! purchases.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::types::money::{self, Money};
use crate::types::{Account, AccountKind, Transaction, TransferKind};

use super::{EconError, SqliteStore};

/// Atomic balance mutation and transaction history.
#[derive(Clone)]
pub struct LedgerService {
    sqlite: Arc<SqliteStore>,
    /// Accounts cache (account_id -> Account).
    accounts: Arc<DashMap<String, Account>>,
}

impl LedgerService {
    /// Create a new ledger over the given store.
    pub fn new(sqlite: Arc<SqliteStore>) -> Self {
        Self {
            sqlite,
            accounts: Arc::new(DashMap::new()),
        }
    }

    /// Create a player account with a starting balance.
    pub fn create_player(
        &self,
        owner_id: &str,
        name: &str,
        starting_balance: Money,
    ) -> Result<Account, EconError> {
        if !money::is_safe(starting_balance) {
            return Err(EconError::OverflowDetected);
        }
        let account = Account::player(owner_id.to_string(), name.to_string(), starting_balance);
        self.sqlite.save_account(&account)?;
        self.accounts.insert(account.id.clone(), account.clone());
        info!("Created player account {} for {}", account.id, owner_id);
        Ok(account)
    }

    /// Create a company account with a starting balance.
    pub fn create_company(
        &self,
        owner_id: &str,
        name: &str,
        starting_balance: Money,
    ) -> Result<Account, EconError> {
        if !money::is_safe(starting_balance) {
            return Err(EconError::OverflowDetected);
        }
        let account = Account::company(owner_id.to_string(), name.to_string(), starting_balance);
        self.sqlite.save_account(&account)?;
        self.accounts.insert(account.id.clone(), account.clone());
        info!("Created company account {} for {}", account.id, owner_id);
        Ok(account)
    }

    /// Get an account by ID.
    pub fn get_account(&self, id: &str) -> Option<Account> {
        if let Some(account) = self.accounts.get(id) {
            return Some(account.clone());
        }
        if let Some(account) = self.sqlite.get_account(id) {
            self.accounts.insert(account.id.clone(), account.clone());
            return Some(account);
        }
        None
    }

    /// All accounts of one kind.
    pub fn list_accounts(&self, kind: AccountKind) -> Vec<Account> {
        self.sqlite.list_accounts(kind)
    }

    /// Move cash between two accounts.
    pub fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: Money,
        description: &str,
    ) -> Result<Transaction, EconError> {
        self.validate_amount(amount)?;
        self.require_account(from)?;
        self.require_account(to)?;
        let record = self.sqlite.apply_transfer(
            Some(from),
            Some(to),
            amount,
            TransferKind::Cash,
            description,
        )?;
        self.refresh(from);
        self.refresh(to);
        info!("Transfer {} -> {}: {} ({})", from, to, amount, description);
        Ok(record)
    }

    /// Mint cash into an account (system source, no balance check).
    pub fn mint(&self, to: &str, amount: Money, description: &str) -> Result<Transaction, EconError> {
        self.validate_amount(amount)?;
        self.require_account(to)?;
        let record =
            self.sqlite
                .apply_transfer(None, Some(to), amount, TransferKind::Cash, description)?;
        self.refresh(to);
        info!("Minted {} to {} ({})", amount, to, description);
        Ok(record)
    }

    /// Burn cash from an account (system sink).
    pub fn burn(
        &self,
        from: &str,
        amount: Money,
        description: &str,
    ) -> Result<Transaction, EconError> {
        self.validate_amount(amount)?;
        self.require_account(from)?;
        let record =
            self.sqlite
                .apply_transfer(Some(from), None, amount, TransferKind::Cash, description)?;
        self.refresh(from);
        info!("Burned {} from {} ({})", amount, from, description);
        Ok(record)
    }

    /// Admin override: set a balance directly. Bypasses business validation;
    /// safe-integer and non-negativity still apply.
    pub fn set_balance(&self, account_id: &str, balance: Money) -> Result<Account, EconError> {
        if !money::is_safe(balance) {
            return Err(EconError::OverflowDetected);
        }
        let mut account = self.require_account(account_id)?;
        account.balance = balance;
        self.sqlite.save_account(&account)?;
        self.accounts.insert(account.id.clone(), account.clone());
        info!("Admin set balance of {} to {}", account_id, balance);
        Ok(account)
    }

    /// Update company fields after an IPO (public flag, cap, shares).
    pub(crate) fn mark_public(
        &self,
        company_id: &str,
        market_cap: Money,
        shares_outstanding: i64,
    ) -> Result<(), EconError> {
        let mut account = self.require_account(company_id)?;
        account.is_public = true;
        account.market_cap = market_cap;
        account.shares_outstanding = shares_outstanding;
        self.sqlite.save_account(&account)?;
        self.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    /// Recent transactions touching an account.
    pub fn transactions(&self, account_id: &str, limit: usize) -> Vec<Transaction> {
        self.sqlite.transactions_for_account(account_id, limit)
    }

    /// Drop a cached account so the next read comes from the store.
    /// Callers that write account rows directly must invalidate here.
    pub fn refresh(&self, account_id: &str) {
        self.accounts.remove(account_id);
    }

    fn validate_amount(&self, amount: Money) -> Result<(), EconError> {
        if amount <= 0 {
            return Err(EconError::InvalidAmount(format!(
                "amount {} must be positive",
                amount
            )));
        }
        if !money::is_safe(amount) {
            return Err(EconError::OverflowDetected);
        }
        Ok(())
    }

    fn require_account(&self, id: &str) -> Result<Account, EconError> {
        self.get_account(id)
            .ok_or_else(|| EconError::AccountNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> LedgerService {
        LedgerService::new(Arc::new(SqliteStore::new_in_memory().unwrap()))
    }

    #[test]
    fn test_transfer_conserves_cash() {
        let ledger = service();
        let a = ledger.create_player("u1", "Alice", 100_000).unwrap();
        let b = ledger.create_player("u2", "Bob", 50_000).unwrap();

        ledger.transfer(&a.id, &b.id, 30_000, "rent").unwrap();

        let a = ledger.get_account(&a.id).unwrap();
        let b = ledger.get_account(&b.id).unwrap();
        assert_eq!(a.balance + b.balance, 150_000);
        assert_eq!(a.balance, 70_000);
    }

    #[test]
    fn test_zero_and_negative_amounts_rejected() {
        let ledger = service();
        let a = ledger.create_player("u1", "Alice", 100).unwrap();
        let b = ledger.create_player("u2", "Bob", 0).unwrap();

        assert!(matches!(
            ledger.transfer(&a.id, &b.id, 0, "nothing"),
            Err(EconError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.transfer(&a.id, &b.id, -5, "negative"),
            Err(EconError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_overflow_rejected() {
        let ledger = service();
        let a = ledger.create_player("u1", "Alice", money::MAX_MONEY).unwrap();
        let b = ledger.create_player("u2", "Bob", money::MAX_MONEY).unwrap();

        let err = ledger.transfer(&a.id, &b.id, 1, "tip").unwrap_err();
        assert!(matches!(err, EconError::OverflowDetected));
        // No partial write: both balances unchanged.
        assert_eq!(ledger.get_account(&a.id).unwrap().balance, money::MAX_MONEY);
        assert_eq!(ledger.get_account(&b.id).unwrap().balance, money::MAX_MONEY);
    }

    #[test]
    fn test_set_balance_rejects_negative() {
        let ledger = service();
        let a = ledger.create_player("u1", "Alice", 100).unwrap();
        assert!(matches!(
            ledger.set_balance(&a.id, -1),
            Err(EconError::OverflowDetected)
        ));
    }
}
