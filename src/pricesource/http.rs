//! HTTP price source against a Binance-style ticker endpoint.

use super::{PriceSource, PriceSourceError};
use crate::domain::{Decimal, Symbol};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Price source backed by `GET {base}/api/v3/ticker/price?symbol=XXXUSDT`.
#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    price: String,
}

impl HttpPriceSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn fetch_ticker(&self, pair: &str) -> Result<TickerResponse, PriceSourceError> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(10)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&[("symbol", pair)])
                .send()
                .await
                .map_err(|e| backoff::Error::transient(PriceSourceError::Network(e.to_string())))?;

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(PriceSourceError::Http {
                    status: status.as_u16(),
                    message: "Retryable upstream error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(PriceSourceError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<TickerResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(PriceSourceError::Parse(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, PriceSourceError> {
        // Bare symbols are quoted against USDT, e.g. BTC -> BTCUSDT.
        let pair = if symbol.as_str().ends_with("USDT") {
            symbol.as_str().to_string()
        } else {
            format!("{}USDT", symbol.as_str())
        };

        debug!(symbol = %symbol, pair = %pair, "fetching price");
        let ticker = self.fetch_ticker(&pair).await?;

        Decimal::from_str_canonical(&ticker.price)
            .map_err(|e| PriceSourceError::Parse(format!("bad price '{}': {}", ticker.price, e)))
    }
}
