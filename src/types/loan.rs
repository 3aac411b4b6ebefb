//! Loan Types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;

/// Loan lifecycle state.
///
/// `Defaulted` is a reserved status; nothing currently transitions into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Paid,
    Defaulted,
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanStatus::Active => write!(f, "active"),
            LoanStatus::Paid => write!(f, "paid"),
            LoanStatus::Defaulted => write!(f, "defaulted"),
        }
    }
}

/// A player loan. Interest compounds per tick; repayment clamps to the
/// outstanding balance and flips status to `Paid` exactly at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    /// Unique loan ID.
    pub id: String,
    /// Borrowing player account.
    pub player_account_id: String,
    /// Amount originally issued.
    pub principal: Money,
    /// Outstanding balance including accrued interest.
    pub remaining_balance: Money,
    /// Daily interest rate as a fraction (0.05 = 5%/day).
    pub interest_rate: f64,
    /// Total interest accrued over the loan's lifetime.
    pub accrued_interest: Money,
    /// Lifecycle state.
    pub status: LoanStatus,
    /// Creation timestamp (ms).
    pub created_at: i64,
    /// Timestamp of the most recent interest application (ms).
    pub last_interest_applied: i64,
}

impl Loan {
    /// Create an active loan.
    pub fn new(player_account_id: String, principal: Money, interest_rate: f64) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            player_account_id,
            principal,
            remaining_balance: principal,
            interest_rate,
            accrued_interest: 0,
            status: LoanStatus::Active,
            created_at: now,
            last_interest_applied: now,
        }
    }
}
