use axum::http::StatusCode;
use paperdesk::api;
use paperdesk::db::init_db;
use paperdesk::{
    BalanceLedger, Decimal, MockPriceSource, PriceSource, Repository, TradingService,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

struct TestApp {
    app: axum::Router,
    _temp: TempDir,
}

async fn setup_test_app(prices: Arc<MockPriceSource>) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let ledger = Arc::new(BalanceLedger::new(repo.clone(), d("100000")));
    let service = Arc::new(TradingService::new(repo, ledger, d("1.8")));

    let state = api::AppState {
        service,
        price_source: prices as Arc<dyn PriceSource>,
    };
    let app = api::create_router(state);

    TestApp {
        app,
        _temp: temp_dir,
    }
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    send(app, req).await
}

async fn post(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

async fn send(
    app: axum::Router,
    req: axum::http::Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_and_ready() {
    let test_app = setup_test_app(Arc::new(MockPriceSource::new())).await;
    let (status, body) = get(test_app.app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(test_app.app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_balance_starts_at_opening() {
    let test_app = setup_test_app(Arc::new(MockPriceSource::new())).await;
    let (status, body) = get(test_app.app, "/v1/balance?user=alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "alice");
    assert_eq!(body["balance"], json!(100000.0));
}

#[tokio::test]
async fn test_place_order_and_read_back() {
    let test_app = setup_test_app(Arc::new(MockPriceSource::new())).await;

    let (status, trade) = post(
        test_app.app.clone(),
        "/v1/orders",
        json!({
            "user": "alice",
            "symbol": "BTC",
            "kind": "buy",
            "quantity": 2,
            "price": 50
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trade["kind"], "buy");
    assert_eq!(trade["symbol"], "BTC");
    assert_eq!(trade["notional"], json!(100.0));
    assert!(trade["id"].is_string());

    // Notional debited from the balance.
    let (_, balance) = get(test_app.app.clone(), "/v1/balance?user=alice").await;
    assert_eq!(balance["balance"], json!(99900.0));

    let (status, trades) = get(test_app.app, "/v1/trades?user=alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trades["trades"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_order_kind_is_bad_request() {
    let test_app = setup_test_app(Arc::new(MockPriceSource::new())).await;
    let (status, body) = post(
        test_app.app,
        "/v1/orders",
        json!({
            "user": "alice",
            "symbol": "BTC",
            "kind": "yolo",
            "quantity": 1,
            "price": 50
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("yolo"));
}

#[tokio::test]
async fn test_insufficient_balance_is_bad_request() {
    let test_app = setup_test_app(Arc::new(MockPriceSource::new())).await;
    let (status, body) = post(
        test_app.app,
        "/v1/orders",
        json!({
            "user": "alice",
            "symbol": "BTC",
            "kind": "buy",
            "quantity": 100,
            "price": 50000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("insufficient balance"));
}

#[tokio::test]
async fn test_positions_marked_with_live_price() {
    let prices = Arc::new(MockPriceSource::new().with_price("BTC", d("70")));
    let test_app = setup_test_app(prices).await;

    for (qty, px) in [(2, 50), (1, 80)] {
        let (status, _) = post(
            test_app.app.clone(),
            "/v1/orders",
            json!({
                "user": "alice",
                "symbol": "BTC",
                "kind": "buy",
                "quantity": qty,
                "price": px
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = get(test_app.app, "/v1/positions?user=alice").await;
    assert_eq!(status, StatusCode::OK);
    let positions = body["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 1);
    let p = &positions[0];
    assert_eq!(p["symbol"], "BTC");
    assert_eq!(p["quantity"], json!(3.0));
    assert_eq!(p["avgPrice"], json!(60.0));
    assert_eq!(p["currentPrice"], json!(70.0));
    assert_eq!(p["unrealizedPnl"], json!(30.0));
}

#[tokio::test]
async fn test_positions_unavailable_without_price() {
    let test_app = setup_test_app(Arc::new(MockPriceSource::new())).await;
    let (status, _) = post(
        test_app.app.clone(),
        "/v1/orders",
        json!({
            "user": "alice",
            "symbol": "BTC",
            "kind": "buy",
            "quantity": 1,
            "price": 50
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(test_app.app, "/v1/positions?user=alice").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_close_position_returns_settled_receipt() {
    let test_app = setup_test_app(Arc::new(MockPriceSource::new())).await;
    let (status, _) = post(
        test_app.app.clone(),
        "/v1/orders",
        json!({
            "user": "alice",
            "symbol": "BTC",
            "kind": "buy",
            "quantity": 2,
            "price": 50
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, receipt) = post(
        test_app.app.clone(),
        "/v1/positions/close",
        json!({
            "user": "alice",
            "symbol": "BTC",
            "currentPrice": 70
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["state"], "settled");
    assert_eq!(receipt["realizedPnl"], json!(40.0));
    assert_eq!(receipt["credited"], json!(140.0));

    // Closing again has nothing to settle.
    let (status, _) = post(
        test_app.app,
        "/v1/positions/close",
        json!({
            "user": "alice",
            "symbol": "BTC",
            "currentPrice": 70
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_place_bet_and_early_tick() {
    let prices = Arc::new(MockPriceSource::new().with_price("BTC", d("105")));
    let test_app = setup_test_app(prices).await;

    let (status, bet) = post(
        test_app.app.clone(),
        "/v1/bets",
        json!({
            "user": "alice",
            "symbol": "BTC",
            "direction": "up",
            "stake": 10,
            "durationSecs": 600,
            "entryPrice": 100
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bet["kind"], "bet_up");
    assert_eq!(bet["status"], "pending");
    let bet_id = bet["id"].as_str().unwrap().to_string();

    // Stake debited at placement.
    let (_, balance) = get(test_app.app.clone(), "/v1/balance?user=alice").await;
    assert_eq!(balance["balance"], json!(99990.0));

    // A tick before expiry reports the remaining countdown.
    let (status, outcome) = post(
        test_app.app,
        &format!("/v1/bets/{}/tick", bet_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["tick"], "notDue");
    assert!(outcome["remainingMs"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_tick_unknown_bet_is_not_found() {
    let test_app = setup_test_app(Arc::new(MockPriceSource::new())).await;
    let (status, _) = post(test_app.app, "/v1/bets/no-such-bet/tick", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_user_is_bad_request() {
    let test_app = setup_test_app(Arc::new(MockPriceSource::new())).await;
    let (status, _) = get(test_app.app.clone(), "/v1/balance?user=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(test_app.app, "/v1/positions?user=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
