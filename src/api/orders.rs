use crate::api::AppState;
use crate::domain::{Decimal, Symbol, TradeKind, TradeRecord, UserId};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user: String,
    pub symbol: String,
    /// One of: buy, sell, short, cover.
    pub kind: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

pub async fn place_order(
    State(state): State<AppState>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<TradeRecord>, AppError> {
    if req.user.is_empty() || req.symbol.is_empty() {
        return Err(AppError::BadRequest("user and symbol are required".into()));
    }
    let kind = TradeKind::parse(&req.kind)
        .ok_or_else(|| AppError::BadRequest(format!("unknown order kind: {}", req.kind)))?;

    let user = UserId::new(req.user);
    let symbol = Symbol::new(req.symbol);
    let trade = state
        .service
        .place_spot_order(&user, &symbol, kind, req.quantity, req.price)
        .await?;
    Ok(Json(trade))
}
