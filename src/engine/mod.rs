//! Pure computation engines for the trade ledger.
//!
//! Nothing in this module performs I/O: aggregation folds a trade list
//! into positions, settlement planning turns a position and a price into
//! a close plan, and bet evaluation turns a price snapshot into an
//! outcome. The service layer applies the results.

pub mod aggregator;
pub mod settlement;
pub mod timed_bet;

pub use aggregator::{aggregate, find_position};
pub use settlement::{plan_close, ClosePlan, SettlementReceipt};
pub use timed_bet::{evaluate_bet, remaining_ms, BetSettlement, TickOutcome};
