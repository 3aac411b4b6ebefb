use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::EconError;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Econ(#[from] EconError),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Econ(e) => e.into_response(),
            AppError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, "NOT_FOUND", &msg),
            AppError::BadRequest(msg) => {
                error_response(StatusCode::BAD_REQUEST, "BAD_REQUEST", &msg)
            }
            AppError::Internal(msg) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", &msg)
            }
            AppError::SerdeJson(e) => {
                error_response(StatusCode::BAD_REQUEST, "BAD_JSON", &e.to_string())
            }
            AppError::Anyhow(e) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", &e.to_string())
            }
        }
    }
}

/// Map the economic error taxonomy to HTTP responses so callers can branch
/// on a stable code instead of message strings.
impl IntoResponse for EconError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            EconError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            EconError::InsufficientBalance { .. } => {
                (StatusCode::BAD_REQUEST, "INSUFFICIENT_BALANCE")
            }
            EconError::InsufficientHoldings { .. } => {
                (StatusCode::BAD_REQUEST, "INSUFFICIENT_HOLDINGS")
            }
            EconError::HoldingLimitExceeded { .. } => {
                (StatusCode::BAD_REQUEST, "HOLDING_LIMIT_EXCEEDED")
            }
            EconError::LoanTooLarge { .. } => (StatusCode::BAD_REQUEST, "LOAN_TOO_LARGE"),
            EconError::DuplicateTicker(_) => (StatusCode::CONFLICT, "DUPLICATE_TICKER"),
            EconError::AssetNotFound(_) => (StatusCode::NOT_FOUND, "ASSET_NOT_FOUND"),
            EconError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            EconError::LoanNotFound(_) => (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND"),
            EconError::ProductNotFound(_) => (StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND"),
            EconError::OverflowDetected => (StatusCode::BAD_REQUEST, "OVERFLOW_DETECTED"),
            EconError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            EconError::TickInProgress => (StatusCode::CONFLICT, "TICK_IN_PROGRESS"),
            EconError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        };
        error_response(status, code, &self.to_string())
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = Json(json!({
        "error": message,
        "code": code,
        "status": status.as_u16(),
    }));
    (status, body).into_response()
}

pub type Result<T> = std::result::Result<T, AppError>;
