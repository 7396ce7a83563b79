//! Derived position types.
//!
//! A Position is never persisted; it is always recomputed from the trade
//! ledger so there is a single source of truth.

use crate::domain::{Decimal, PositionDirection, Symbol};
use serde::{Deserialize, Serialize};

/// Net holding in one symbol, derived from the trade history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    /// Signed net quantity: positive = long, negative = short.
    pub quantity: Decimal,
    /// Total cost basis attributed to the current quantity. For shorts
    /// this holds the sale proceeds owed back on cover.
    pub cost: Decimal,
    pub direction: PositionDirection,
    /// Ids of the trades that make up this position, in creation order.
    pub trade_ids: Vec<String>,
}

impl Position {
    /// Average entry price: |cost| / |quantity|.
    pub fn avg_price(&self) -> Decimal {
        if self.quantity.is_zero() {
            return Decimal::zero();
        }
        self.cost.abs() / self.quantity.abs()
    }

    /// Unrealized P&L against a current price.
    ///
    /// Long: (current - avg) * qty. Short: (avg - current) * |qty|.
    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        let avg = self.avg_price();
        match self.direction {
            PositionDirection::Long => (current_price - avg) * self.quantity,
            PositionDirection::Short => (avg - current_price) * self.quantity.abs(),
        }
    }

    /// P&L as a percentage of cost basis; 0 when cost is 0.
    pub fn pnl_percent(&self, current_price: Decimal) -> Decimal {
        if self.cost.is_zero() {
            return Decimal::zero();
        }
        self.unrealized_pnl(current_price) / self.cost.abs() * Decimal::hundred()
    }
}

/// A position marked to market, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub direction: PositionDirection,
    pub avg_price: Decimal,
    pub cost: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub pnl_percent: Decimal,
}

impl PositionView {
    pub fn mark(position: &Position, current_price: Decimal) -> Self {
        PositionView {
            symbol: position.symbol.clone(),
            quantity: position.quantity,
            direction: position.direction,
            avg_price: position.avg_price(),
            cost: position.cost,
            current_price,
            unrealized_pnl: position.unrealized_pnl(current_price),
            pnl_percent: position.pnl_percent(current_price),
        }
    }
}
