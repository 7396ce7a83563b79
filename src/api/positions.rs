use crate::api::AppState;
use crate::domain::{Decimal, PositionView, Symbol, UserId};
use crate::engine::SettlementReceipt;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PositionsQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub positions: Vec<PositionView>,
}

pub async fn get_positions(
    Query(params): Query<PositionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, AppError> {
    if params.user.is_empty() {
        return Err(AppError::BadRequest("user is required".into()));
    }
    let user = UserId::new(params.user);
    let positions = state
        .service
        .open_positions(&user, state.price_source.as_ref())
        .await?;
    Ok(Json(PositionsResponse { positions }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePositionRequest {
    pub user: String,
    pub symbol: String,
    pub current_price: Decimal,
}

pub async fn close_position(
    State(state): State<AppState>,
    Json(req): Json<ClosePositionRequest>,
) -> Result<Json<SettlementReceipt>, AppError> {
    if req.user.is_empty() || req.symbol.is_empty() {
        return Err(AppError::BadRequest("user and symbol are required".into()));
    }
    let user = UserId::new(req.user);
    let symbol = Symbol::new(req.symbol);
    let receipt = state
        .service
        .close_position(&user, &symbol, req.current_price)
        .await?;
    Ok(Json(receipt))
}
