//! Timed-bet settlement rules.
//!
//! A bet moves Pending -> Settling -> Settled{Win|Loss}. The transitions
//! themselves are applied as conditional status updates in the repository
//! so each fires at most once per bet id; this module holds the pure
//! evaluation of an outcome from the stored entry price and a settlement
//! price snapshot.

use crate::domain::{BetDirection, BetOutcome, BetStatus, Decimal, TimeMs, TradeRecord};
use serde::Serialize;

/// Outcome of evaluating a due bet against a settlement price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetSettlement {
    pub status: BetStatus,
    pub outcome: BetOutcome,
    /// Cash credited back: stake * multiplier on a win, 0 on a loss (the
    /// stake was debited at placement and is not returned).
    pub payout: Decimal,
    /// payout - stake on a win, -stake on a loss.
    pub realized_pnl: Decimal,
    pub close_price: Decimal,
}

/// Evaluate a bet's outcome. Pure; a tie (close == entry) is a loss.
pub fn evaluate_bet(
    direction: BetDirection,
    entry_price: Decimal,
    close_price: Decimal,
    stake: Decimal,
    payout_multiplier: Decimal,
) -> BetSettlement {
    if direction.is_win(entry_price, close_price) {
        let payout = stake * payout_multiplier;
        BetSettlement {
            status: BetStatus::Win,
            outcome: BetOutcome::Win,
            payout,
            realized_pnl: payout - stake,
            close_price,
        }
    } else {
        BetSettlement {
            status: BetStatus::Loss,
            outcome: BetOutcome::Loss,
            payout: Decimal::zero(),
            realized_pnl: -stake,
            close_price,
        }
    }
}

/// What a settlement tick did for one bet. Every variant other than
/// `Settled` left the ledger and balance untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "tick")]
pub enum TickOutcome {
    /// Countdown still running.
    NotDue { remaining_ms: i64 },
    /// Another caller holds the Settling transition; nothing to do.
    InFlight,
    /// The bet was already settled; repeated ticks are no-ops.
    AlreadySettled { outcome: BetOutcome },
    /// This tick settled the bet.
    Settled {
        outcome: BetOutcome,
        payout: Decimal,
        realized_pnl: Decimal,
        close_price: Decimal,
    },
}

/// Milliseconds left on a pending bet's countdown, clamped at zero.
pub fn remaining_ms(bet: &TradeRecord, now: TimeMs) -> i64 {
    bet.expires_ms
        .map(|e| (e.as_i64() - now.as_i64()).max(0))
        .unwrap_or(0)
}
