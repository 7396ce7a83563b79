//! TradeRecord: a single entry in the trade ledger.
//!
//! Spot trades (buy/sell/short/cover) are terminal ledger entries at
//! creation; a standing position is closed by marking its constituent
//! trades, never by mutating aggregates. Timed bets carry extra fields
//! (direction, duration, entry price snapshot) and a settlement status
//! that moves pending -> settling -> win|loss exactly once.

use crate::domain::{
    BetDirection, BetOutcome, Decimal, OrderStyle, Symbol, TimeMs, TradeKind, UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settlement status of a timed bet, persisted as the single-flight guard.
///
/// Transitions are applied as conditional updates keyed on the current
/// value, so each edge fires at most once per bet id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Settling,
    Win,
    Loss,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Settling => "settling",
            BetStatus::Win => "win",
            BetStatus::Loss => "loss",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BetStatus::Pending),
            "settling" => Some(BetStatus::Settling),
            "win" => Some(BetStatus::Win),
            "loss" => Some(BetStatus::Loss),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BetStatus::Win | BetStatus::Loss)
    }

    pub fn outcome(&self) -> BetOutcome {
        match self {
            BetStatus::Win => BetOutcome::Win,
            BetStatus::Loss => BetOutcome::Loss,
            _ => BetOutcome::Pending,
        }
    }
}

/// A single trade ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    /// Unique trade id (UUID v4).
    pub id: String,
    pub user: UserId,
    pub symbol: Symbol,
    pub kind: TradeKind,
    pub style: OrderStyle,
    /// Absolute quantity. The sign convention (add for buy/cover,
    /// subtract for sell/short) lives in `TradeKind`, not here.
    pub quantity: Decimal,
    /// Unit price at placement; for timed bets this equals the entry price.
    pub price: Decimal,
    /// quantity * price for spot trades; the stake for timed bets.
    pub notional: Decimal,
    pub created_ms: TimeMs,
    pub closed: bool,
    pub close_price: Option<Decimal>,
    pub closed_ms: Option<TimeMs>,
    pub realized_pnl: Option<Decimal>,
    /// Timed-bet fields; None for spot trades.
    pub direction: Option<BetDirection>,
    pub duration_secs: Option<i64>,
    pub entry_price: Option<Decimal>,
    pub expires_ms: Option<TimeMs>,
    pub status: Option<BetStatus>,
}

impl TradeRecord {
    /// Create a spot trade (buy/sell/short/cover).
    pub fn spot(
        user: UserId,
        symbol: Symbol,
        kind: TradeKind,
        style: OrderStyle,
        quantity: Decimal,
        price: Decimal,
        created_ms: TimeMs,
    ) -> Self {
        TradeRecord {
            id: Uuid::new_v4().to_string(),
            user,
            symbol,
            kind,
            style,
            quantity,
            price,
            notional: quantity * price,
            created_ms,
            closed: false,
            close_price: None,
            closed_ms: None,
            realized_pnl: None,
            direction: None,
            duration_secs: None,
            entry_price: None,
            expires_ms: None,
            status: None,
        }
    }

    /// Create a timed directional bet. The entry price is snapshotted here
    /// and never re-read during settlement.
    pub fn timed_bet(
        user: UserId,
        symbol: Symbol,
        direction: BetDirection,
        stake: Decimal,
        duration_secs: i64,
        entry_price: Decimal,
        created_ms: TimeMs,
    ) -> Self {
        TradeRecord {
            id: Uuid::new_v4().to_string(),
            user,
            symbol,
            kind: direction.kind(),
            style: OrderStyle::Timed,
            quantity: Decimal::zero(),
            price: entry_price,
            notional: stake,
            created_ms,
            closed: false,
            close_price: None,
            closed_ms: None,
            realized_pnl: None,
            direction: Some(direction),
            duration_secs: Some(duration_secs),
            entry_price: Some(entry_price),
            expires_ms: Some(created_ms.plus_secs(duration_secs)),
            status: Some(BetStatus::Pending),
        }
    }

    pub fn is_bet(&self) -> bool {
        self.kind.is_bet()
    }

    /// Stake of a timed bet (its notional).
    pub fn stake(&self) -> Decimal {
        self.notional
    }

    /// Outcome of a timed bet; `Pending` until settled, `Pending` also for
    /// spot trades (which have no bet outcome).
    pub fn outcome(&self) -> BetOutcome {
        self.status.map(|s| s.outcome()).unwrap_or(BetOutcome::Pending)
    }

    /// Whether a pending bet is due for settlement at `now`.
    pub fn is_due(&self, now: TimeMs) -> bool {
        match (self.status, self.expires_ms) {
            (Some(BetStatus::Pending), Some(expires)) => now >= expires,
            _ => false,
        }
    }
}
