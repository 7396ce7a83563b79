use crate::api::AppState;
use crate::domain::{BetDirection, Decimal, Symbol, TradeRecord, UserId};
use crate::engine::TickOutcome;
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    pub user: String,
    pub symbol: String,
    /// "up" or "down".
    pub direction: String,
    pub stake: Decimal,
    pub duration_secs: i64,
    pub entry_price: Decimal,
}

pub async fn place_bet(
    State(state): State<AppState>,
    Json(req): Json<PlaceBetRequest>,
) -> Result<Json<TradeRecord>, AppError> {
    if req.user.is_empty() || req.symbol.is_empty() {
        return Err(AppError::BadRequest("user and symbol are required".into()));
    }
    let direction = BetDirection::parse(&req.direction)
        .ok_or_else(|| AppError::BadRequest(format!("unknown direction: {}", req.direction)))?;

    let user = UserId::new(req.user);
    let symbol = Symbol::new(req.symbol);
    let bet = state
        .service
        .place_timed_bet(
            &user,
            &symbol,
            direction,
            req.stake,
            req.duration_secs,
            req.entry_price,
        )
        .await?;
    Ok(Json(bet))
}

/// Host-driven settlement tick for a single bet; idempotent.
pub async fn tick_bet(
    State(state): State<AppState>,
    Path(bet_id): Path<String>,
) -> Result<Json<TickOutcome>, AppError> {
    let outcome = state
        .service
        .tick_settlement(&bet_id, state.price_source.as_ref())
        .await?;
    Ok(Json(outcome))
}
