pub mod balance;
pub mod bets;
pub mod health;
pub mod orders;
pub mod positions;
pub mod trades;

use crate::pricesource::PriceSource;
use crate::service::TradingService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TradingService>,
    pub price_source: Arc<dyn PriceSource>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/positions", get(positions::get_positions))
        .route("/v1/positions/close", post(positions::close_position))
        .route("/v1/trades", get(trades::get_trades))
        .route("/v1/balance", get(balance::get_balance))
        .route("/v1/orders", post(orders::place_order))
        .route("/v1/bets", post(bets::place_bet))
        .route("/v1/bets/:id/tick", post(bets::tick_bet))
        .layer(cors)
        .with_state(state)
}
