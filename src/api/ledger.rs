//! Ledger API
//!
//! Accounts and non-trading transfers:
//! - POST /api/ledger/players - Create a player account
//! - POST /api/ledger/companies - Create a company account
//! - GET  /api/ledger/accounts/:id - Account detail
//! - GET  /api/ledger/accounts/:id/transactions - Transaction history
//! - POST /api/ledger/transfer - Player-to-player / player-to-company cash

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::services::EconError;
use crate::types::money::Money;
use crate::types::{Account, Transaction};
use crate::AppState;

/// Create ledger router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/players", post(create_player))
        .route("/companies", post(create_company))
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/transactions", get(get_transactions))
        .route("/transfer", post(transfer))
}

#[derive(Debug, Deserialize)]
struct CreateAccountRequest {
    owner_id: String,
    name: String,
    #[serde(default)]
    starting_balance: Money,
}

#[derive(Debug, Deserialize)]
struct TransferRequest {
    from: String,
    to: String,
    amount: Money,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn create_player(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<Account>, EconError> {
    let account = state
        .ledger
        .create_player(&req.owner_id, &req.name, req.starting_balance)?;
    Ok(Json(account))
}

async fn create_company(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<Account>, EconError> {
    let account = state
        .ledger
        .create_company(&req.owner_id, &req.name, req.starting_balance)?;
    Ok(Json(account))
}

async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Account>, EconError> {
    state
        .ledger
        .get_account(&id)
        .map(Json)
        .ok_or(EconError::AccountNotFound(id))
}

async fn get_transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<Transaction>> {
    Json(state.ledger.transactions(&id, query.limit.unwrap_or(100)))
}

async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<Transaction>, EconError> {
    let record = state
        .ledger
        .transfer(&req.from, &req.to, req.amount, &req.description)?;
    Ok(Json(record))
}
