//! Loan API
//!
//! - POST /api/loans - Take out a loan
//! - GET  /api/loans/:id - Loan detail
//! - POST /api/loans/:id/repay - Repay toward a loan
//! - POST /api/loans/:id/accrue - Apply one tick's interest (also done in
//!   bulk by the tick engine)
//! - GET  /api/loans/player/:account_id - All loans for a player

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::services::EconError;
use crate::types::money::Money;
use crate::types::Loan;
use crate::AppState;

/// Create loan router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_loan))
        .route("/:id", get(get_loan))
        .route("/:id/repay", post(repay_loan))
        .route("/:id/accrue", post(accrue_interest))
        .route("/player/:account_id", get(player_loans))
}

#[derive(Debug, Deserialize)]
struct CreateLoanRequest {
    player_account_id: String,
    principal: Money,
    daily_rate: f64,
}

#[derive(Debug, Deserialize)]
struct RepayRequest {
    amount: Money,
}

async fn create_loan(
    State(state): State<AppState>,
    Json(req): Json<CreateLoanRequest>,
) -> Result<Json<Loan>, EconError> {
    let loan = state
        .loans
        .create_loan(&req.player_account_id, req.principal, req.daily_rate)?;
    Ok(Json(loan))
}

async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Loan>, EconError> {
    state
        .loans
        .get_loan(&id)
        .map(Json)
        .ok_or(EconError::LoanNotFound(id))
}

async fn repay_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RepayRequest>,
) -> Result<Json<Loan>, EconError> {
    let loan = state.loans.repay_loan(&id, req.amount)?;
    Ok(Json(loan))
}

async fn accrue_interest(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Loan>, EconError> {
    let loan = state
        .loans
        .apply_interest(&id, state.config.ticks_per_day())?;
    Ok(Json(loan))
}

async fn player_loans(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Json<Vec<Loan>> {
    Json(state.loans.loans_for_player(&account_id))
}
