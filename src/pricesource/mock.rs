//! Mock price source for tests: fixed prices plus fault injection.

use super::{PriceSource, PriceSourceError};
use crate::domain::{Decimal, Symbol};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Mock price source that serves a fixed price table and can be told to
/// fail the next N fetches.
#[derive(Debug, Default)]
pub struct MockPriceSource {
    prices: Mutex<HashMap<String, Decimal>>,
    failures_remaining: AtomicU32,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, symbol: &str, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    /// Replace the price served for a symbol.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices
            .lock()
            .expect("price table lock poisoned")
            .insert(symbol.to_string(), price);
    }

    /// Fail the next `n` fetches with a network error.
    pub fn fail_next(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, PriceSourceError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(PriceSourceError::Network("injected failure".to_string()));
        }

        self.prices
            .lock()
            .expect("price table lock poisoned")
            .get(symbol.as_str())
            .copied()
            .ok_or_else(|| PriceSourceError::UnknownSymbol(symbol.as_str().to_string()))
    }
}
