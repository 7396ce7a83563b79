//! Domain types for the trade ledger and settlement engine.
//!
//! This module provides:
//! - Exact numeric handling via a Decimal wrapper
//! - Domain primitives: UserId, Symbol, TimeMs, TradeKind, OrderStyle
//! - TradeRecord, the immutable-once-settled ledger entry
//! - Derived Position types (never persisted)

pub mod decimal;
pub mod position;
pub mod primitives;
pub mod trade;

pub use decimal::Decimal;
pub use position::{Position, PositionView};
pub use primitives::{
    BetDirection, BetOutcome, OrderStyle, PositionDirection, Symbol, TimeMs, TradeKind, UserId,
};
pub use trade::{BetStatus, TradeRecord};
