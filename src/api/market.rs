//! Market API
//!
//! Asset listings, market data, and creation flows:
//! - GET  /api/market/stocks - List all stocks
//! - POST /api/market/stocks - IPO a company's stock
//! - GET  /api/market/stocks/:id - Stock detail
//! - GET  /api/market/cryptos - List all cryptocurrencies
//! - POST /api/market/cryptos - Create a cryptocurrency (fee applies)
//! - GET  /api/market/cryptos/:id - Crypto detail
//! - GET  /api/market/assets/:id/candles - Price history candles
//! - GET  /api/market/ticks - Recent tick records
//! - GET  /api/market/products - Products bots can buy
//! - POST /api/market/products - List a product

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::services::EconError;
use crate::types::money::Money;
use crate::types::{Candle, Cryptocurrency, Product, Stock, TickRecord};
use crate::AppState;

/// Create market router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stocks", get(list_stocks))
        .route("/stocks", post(ipo_stock))
        .route("/stocks/:id", get(get_stock))
        .route("/cryptos", get(list_cryptos))
        .route("/cryptos", post(create_crypto))
        .route("/cryptos/:id", get(get_crypto))
        .route("/assets/:id/candles", get(get_candles))
        .route("/ticks", get(recent_ticks))
        .route("/products", get(list_products))
        .route("/products", post(create_product))
}

#[derive(Debug, Deserialize)]
struct IpoRequest {
    company_id: String,
    ticker: String,
    name: String,
    price: Money,
    total_shares: i64,
    #[serde(default)]
    growth_rate: f64,
}

#[derive(Debug, Deserialize)]
struct CreateCryptoRequest {
    creator_account_id: String,
    ticker: String,
    name: String,
    initial_price: Money,
    total_supply: i64,
    liquidity: i64,
}

#[derive(Debug, Deserialize)]
struct CreateProductRequest {
    company_id: String,
    name: String,
    price: Money,
    quality: f64,
    stock: i64,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn list_stocks(State(state): State<AppState>) -> Json<Vec<Stock>> {
    Json(state.assets.list_stocks())
}

async fn ipo_stock(
    State(state): State<AppState>,
    Json(req): Json<IpoRequest>,
) -> Result<Json<Stock>, EconError> {
    let stock = state.assets.ipo_stock(
        &req.company_id,
        &req.ticker,
        &req.name,
        req.price,
        req.total_shares,
        req.growth_rate,
    )?;
    Ok(Json(stock))
}

async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Stock>, EconError> {
    state
        .assets
        .resolve_stock(&id)
        .map(Json)
        .ok_or(EconError::AssetNotFound(id))
}

async fn list_cryptos(State(state): State<AppState>) -> Json<Vec<Cryptocurrency>> {
    Json(state.assets.list_cryptos())
}

async fn create_crypto(
    State(state): State<AppState>,
    Json(req): Json<CreateCryptoRequest>,
) -> Result<Json<Cryptocurrency>, EconError> {
    let crypto = state.assets.create_crypto(
        &req.creator_account_id,
        &req.ticker,
        &req.name,
        req.initial_price,
        req.total_supply,
        req.liquidity,
    )?;
    Ok(Json(crypto))
}

async fn get_crypto(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Cryptocurrency>, EconError> {
    state
        .assets
        .resolve_crypto(&id)
        .map(Json)
        .ok_or(EconError::AssetNotFound(id))
}

async fn get_candles(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<Candle>> {
    Json(state.history.candles(&id, query.limit.unwrap_or(288)))
}

async fn recent_ticks(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<TickRecord>> {
    Json(state.tick.recent_ticks(query.limit.unwrap_or(20)))
}

async fn list_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.demand.purchasable_products())
}

async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<Json<Product>, EconError> {
    let product = state.demand.create_product(
        &req.company_id,
        &req.name,
        req.price,
        req.quality,
        req.stock,
    )?;
    Ok(Json(product))
}
