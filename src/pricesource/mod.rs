//! Price source abstraction: the engine's only view of market data.
//!
//! The core never caches or interpolates prices. If a price cannot be
//! fetched, settlement stays where it is and is retried; an outcome is
//! never computed from a defaulted price.

use crate::domain::{Decimal, Symbol};
use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod mock;

pub use http::HttpPriceSource;
pub use mock::MockPriceSource;

/// Supplies a current price for a symbol on demand.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// Fetch the current price for a symbol.
    ///
    /// # Errors
    /// Returns `PriceSourceError` when no price can be obtained; callers
    /// treat every variant as transient.
    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, PriceSourceError>;
}

/// Error type for price fetches.
#[derive(Debug, Clone)]
pub enum PriceSourceError {
    /// Network error (connection timeout, DNS failure).
    Network(String),
    /// HTTP error (rate limit, server error).
    Http { status: u16, message: String },
    /// Malformed response body.
    Parse(String),
    /// The source has no price for this symbol.
    UnknownSymbol(String),
}

impl fmt::Display for PriceSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSourceError::Network(msg) => write!(f, "Network error: {}", msg),
            PriceSourceError::Http { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            PriceSourceError::Parse(msg) => write!(f, "Parse error: {}", msg),
            PriceSourceError::UnknownSymbol(sym) => write!(f, "No price for symbol: {}", sym),
        }
    }
}

impl std::error::Error for PriceSourceError {}
