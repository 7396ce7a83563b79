use crate::api::AppState;
use crate::domain::{TradeRecord, UserId};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<TradeRecord>,
}

pub async fn get_trades(
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    if params.user.is_empty() {
        return Err(AppError::BadRequest("user is required".into()));
    }
    let user = UserId::new(params.user);
    let trades = state.service.trade_history(&user).await?;
    Ok(Json(TradesResponse { trades }))
}
