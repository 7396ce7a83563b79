use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::Symbol;

/// Core engine error taxonomy.
///
/// Validation errors (insufficient balance/position, invalid order) are
/// returned before any state is mutated. Persistence and price errors are
/// transient and safe to retry with the same inputs.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance {
        needed: crate::domain::Decimal,
        available: crate::domain::Decimal,
    },

    #[error("insufficient position in {symbol}: requested {requested}, held {held}")]
    InsufficientPosition {
        symbol: Symbol,
        requested: crate::domain::Decimal,
        held: crate::domain::Decimal,
    },

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("trade not found: {0}")]
    TradeNotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("price unavailable for {0}")]
    PriceUnavailable(Symbol),

    /// Settlement guard tripped: another caller already moved this bet
    /// past the attempted transition. Treated as a no-op by callers.
    #[error("duplicate settlement attempt for bet {0}")]
    DoubleSettlementAttempt(String),
}

impl EngineError {
    /// Whether a retry with identical inputs can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Persistence(_) | EngineError::PriceUnavailable(_)
        )
    }
}

/// HTTP-facing error wrapper.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InsufficientBalance { .. }
            | EngineError::InsufficientPosition { .. }
            | EngineError::InvalidOrder(_) => AppError::BadRequest(err.to_string()),
            EngineError::TradeNotFound(id) => AppError::NotFound(format!("trade {}", id)),
            EngineError::PriceUnavailable(_) => AppError::Unavailable(err.to_string()),
            EngineError::DoubleSettlementAttempt(_) | EngineError::Persistence(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
