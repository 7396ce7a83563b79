use crate::api::AppState;
use crate::domain::{Decimal, UserId};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user: String,
    pub balance: Decimal,
}

pub async fn get_balance(
    Query(params): Query<BalanceQuery>,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, AppError> {
    if params.user.is_empty() {
        return Err(AppError::BadRequest("user is required".into()));
    }
    let user = UserId::new(params.user.clone());
    let balance = state.service.balance(&user).await?;
    Ok(Json(BalanceResponse {
        user: params.user,
        balance,
    }))
}
