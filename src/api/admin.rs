//! Moderation and admin API
//!
//! Privileged overrides. Every route takes the acting account and checks
//! its capability before touching the privileged service operations. The
//! overrides bypass business validation but not the safe-integer and
//! non-negativity invariants.
//!
//! - POST /api/admin/stocks/:id/price - Set a stock price directly
//! - POST /api/admin/stocks/:id/flag - Flag/unflag a stock
//! - POST /api/admin/accounts/:id/balance - Set an account balance
//! - POST /api/admin/assets/:id/remove - Remove an asset and its history
//! - POST /api/admin/tick/run - Trigger a tick outside the schedule

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::services::capability::{self, Capability};
use crate::services::EconError;
use crate::types::money::Money;
use crate::types::{Account, Stock, TickRecord};
use crate::AppState;

/// Create admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stocks/:id/price", post(set_stock_price))
        .route("/stocks/:id/flag", post(set_stock_flag))
        .route("/accounts/:id/balance", post(set_balance))
        .route("/assets/:id/remove", post(remove_asset))
        .route("/tick/run", post(run_tick))
}

#[derive(Debug, Deserialize)]
struct ActorRequest {
    actor_account_id: String,
}

#[derive(Debug, Deserialize)]
struct SetPriceRequest {
    actor_account_id: String,
    price: Money,
}

#[derive(Debug, Deserialize)]
struct SetFlagRequest {
    actor_account_id: String,
    flagged: bool,
}

#[derive(Debug, Deserialize)]
struct SetBalanceRequest {
    actor_account_id: String,
    balance: Money,
}

fn authorize(
    state: &AppState,
    actor_account_id: &str,
    needed: Capability,
) -> Result<(), EconError> {
    let actor = state
        .ledger
        .get_account(actor_account_id)
        .ok_or_else(|| EconError::AccountNotFound(actor_account_id.to_string()))?;
    capability::require(&actor, needed)
}

async fn set_stock_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetPriceRequest>,
) -> Result<Json<Stock>, EconError> {
    authorize(&state, &req.actor_account_id, Capability::AdminOverride)?;
    let stock = state.assets.set_stock_price(&id, req.price)?;
    Ok(Json(stock))
}

async fn set_stock_flag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetFlagRequest>,
) -> Result<Json<Stock>, EconError> {
    authorize(&state, &req.actor_account_id, Capability::Moderate)?;
    let stock = state.assets.set_stock_flagged(&id, req.flagged)?;
    Ok(Json(stock))
}

async fn set_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetBalanceRequest>,
) -> Result<Json<Account>, EconError> {
    authorize(&state, &req.actor_account_id, Capability::AdminOverride)?;
    let account = state.ledger.set_balance(&id, req.balance)?;
    Ok(Json(account))
}

async fn remove_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<serde_json::Value>, EconError> {
    authorize(&state, &req.actor_account_id, Capability::Moderate)?;
    state.assets.remove_asset(&id)?;
    Ok(Json(serde_json::json!({ "removed": id })))
}

async fn run_tick(
    State(state): State<AppState>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<TickRecord>, EconError> {
    authorize(&state, &req.actor_account_id, Capability::AdminOverride)?;
    let record = state.tick.execute_tick()?;
    Ok(Json(record))
}
