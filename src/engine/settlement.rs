//! Standing-position settlement: closing an aggregated position in full
//! against a caller-supplied price.
//!
//! Planning is pure; applying the plan (marking constituent trades and
//! crediting the balance) is the service layer's job. The realized P&L is
//! recorded once at the position level and replicated onto each
//! constituent trade for the audit trail, not divided among them.

use crate::domain::{Decimal, Position, PositionDirection, Symbol, TimeMs};
use serde::Serialize;

/// Everything needed to apply a full position close.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosePlan {
    pub symbol: Symbol,
    pub trade_ids: Vec<String>,
    pub close_price: Decimal,
    pub realized_pnl: Decimal,
    /// Cash returned to the balance: full notional for longs, stake plus
    /// P&L for shorts.
    pub credit: Decimal,
}

/// Compute the close plan for a position at the given price.
///
/// Long: pnl = (price - avg) * qty, credit = qty * price.
/// Short: pnl = (avg - price) * |qty|, credit = |cost| + pnl.
pub fn plan_close(position: &Position, current_price: Decimal) -> ClosePlan {
    let realized_pnl = position.unrealized_pnl(current_price);
    let credit = match position.direction {
        PositionDirection::Long => position.quantity * current_price,
        PositionDirection::Short => position.cost.abs() + realized_pnl,
    };
    ClosePlan {
        symbol: position.symbol.clone(),
        trade_ids: position.trade_ids.clone(),
        close_price: current_price,
        realized_pnl,
        credit,
    }
}

/// Result of applying a close plan.
///
/// `CreditPending` is the partial-failure report: every constituent trade
/// was marked closed but the balance credit did not land. The caller must
/// resume by applying the credit alone, never by re-running the close.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "state")]
pub enum SettlementReceipt {
    Settled {
        symbol: Symbol,
        close_price: Decimal,
        closed_ms: TimeMs,
        realized_pnl: Decimal,
        credited: Decimal,
        trade_count: usize,
        new_balance: Decimal,
    },
    CreditPending {
        symbol: Symbol,
        close_price: Decimal,
        closed_ms: TimeMs,
        realized_pnl: Decimal,
        credit_due: Decimal,
        trade_count: usize,
    },
}
