pub mod admin;
pub mod health;
pub mod ledger;
pub mod loans;
pub mod market;
pub mod trading;

use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/market", market::router())
        .nest("/api/trading", trading::router())
        .nest("/api/ledger", ledger::router())
        .nest("/api/loans", loans::router())
        .nest("/api/admin", admin::router())
}
