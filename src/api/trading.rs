//! Trading API
//!
//! Player-facing trade execution:
//! - POST /api/trading/stocks/buy - Buy stock shares
//! - POST /api/trading/stocks/sell - Sell stock shares
//! - POST /api/trading/cryptos/buy - Buy cryptocurrency
//! - POST /api/trading/cryptos/sell - Sell cryptocurrency
//! - GET  /api/trading/trades - Trade history for an account
//! - GET  /api/trading/holdings/:account_id - Valued holdings
//!
//! Orders are sized either by `quantity` or by `cash` (converted at the
//! current price); exactly one must be given.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::services::holdings::ValuedHolding;
use crate::services::EconError;
use crate::types::money::Money;
use crate::types::{OrderAmount, Trade};
use crate::AppState;

/// Create trading router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stocks/buy", post(buy_stock))
        .route("/stocks/sell", post(sell_stock))
        .route("/cryptos/buy", post(buy_crypto))
        .route("/cryptos/sell", post(sell_crypto))
        .route("/trades", get(list_trades))
        .route("/holdings/:account_id", get(get_holdings))
}

#[derive(Debug, Deserialize)]
struct OrderRequest {
    account_id: String,
    /// Asset ID or ticker.
    asset: String,
    quantity: Option<i64>,
    cash: Option<Money>,
}

impl OrderRequest {
    fn amount(&self) -> Result<OrderAmount, EconError> {
        match (self.quantity, self.cash) {
            (Some(q), None) => Ok(OrderAmount::Quantity(q)),
            (None, Some(c)) => Ok(OrderAmount::Cash(c)),
            _ => Err(EconError::InvalidAmount(
                "exactly one of quantity or cash must be given".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListTradesQuery {
    account_id: String,
    limit: Option<usize>,
}

async fn buy_stock(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<Trade>, EconError> {
    let amount = req.amount()?;
    let trade = state.trading.buy_stock(&req.account_id, &req.asset, amount)?;
    Ok(Json(trade))
}

async fn sell_stock(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<Trade>, EconError> {
    let amount = req.amount()?;
    let trade = state.trading.sell_stock(&req.account_id, &req.asset, amount)?;
    Ok(Json(trade))
}

async fn buy_crypto(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<Trade>, EconError> {
    let amount = req.amount()?;
    let trade = state.trading.buy_crypto(&req.account_id, &req.asset, amount)?;
    Ok(Json(trade))
}

async fn sell_crypto(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<Trade>, EconError> {
    let amount = req.amount()?;
    let trade = state.trading.sell_crypto(&req.account_id, &req.asset, amount)?;
    Ok(Json(trade))
}

async fn list_trades(
    State(state): State<AppState>,
    Query(query): Query<ListTradesQuery>,
) -> Json<Vec<Trade>> {
    Json(
        state
            .trading
            .trades(&query.account_id, query.limit.unwrap_or(100)),
    )
}

async fn get_holdings(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Vec<ValuedHolding>>, EconError> {
    Ok(Json(state.holdings.valued_for_account(&account_id)?))
}
