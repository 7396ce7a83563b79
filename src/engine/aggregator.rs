//! Position aggregation: a pure fold of a user's trade history into the
//! current set of open positions.
//!
//! The fold never mutates its input and is idempotent: replaying the same
//! trade list always yields the same positions. Realized P&L is NOT
//! tracked here; a partial sell only shrinks cost basis proportionally.
//! P&L is realized exclusively by explicit settlement.

use crate::domain::{Decimal, Position, PositionDirection, Symbol, TradeKind, TradeRecord};
use crate::error::EngineError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct Running {
    quantity: Decimal,
    cost: Decimal,
    trade_ids: Vec<String>,
}

/// Reduce a user's trades into open positions, one per symbol.
///
/// Timed bets and trades already marked closed are ignored. Trades are
/// replayed in ascending creation order (id as tiebreak) regardless of
/// input order. Positions with |quantity| at or below the epsilon are
/// considered flat and dropped.
///
/// # Errors
/// Returns `InsufficientPosition` if a sell or cover removes more
/// quantity than the running position holds; such orders are rejected at
/// placement, so hitting this on a persisted history means the ledger is
/// inconsistent.
pub fn aggregate(trades: &[TradeRecord]) -> Result<Vec<Position>, EngineError> {
    let mut ordered: Vec<&TradeRecord> = trades
        .iter()
        .filter(|t| !t.is_bet() && !t.closed)
        .collect();
    ordered.sort_by(|a, b| a.created_ms.cmp(&b.created_ms).then_with(|| a.id.cmp(&b.id)));

    let mut book: BTreeMap<Symbol, Running> = BTreeMap::new();
    let epsilon = Decimal::position_epsilon();

    for trade in ordered {
        let entry = book.entry(trade.symbol.clone()).or_default();
        apply(entry, trade, epsilon)?;
    }

    Ok(book
        .into_iter()
        .filter(|(_, r)| r.quantity.abs() > epsilon)
        .map(|(symbol, r)| {
            let direction = if r.quantity.is_positive() {
                PositionDirection::Long
            } else {
                PositionDirection::Short
            };
            Position {
                symbol,
                quantity: r.quantity,
                cost: r.cost,
                direction,
                trade_ids: r.trade_ids,
            }
        })
        .collect())
}

/// Convenience lookup of a single symbol's open position.
pub fn find_position(
    trades: &[TradeRecord],
    symbol: &Symbol,
) -> Result<Option<Position>, EngineError> {
    Ok(aggregate(trades)?.into_iter().find(|p| &p.symbol == symbol))
}

fn apply(running: &mut Running, trade: &TradeRecord, epsilon: Decimal) -> Result<(), EngineError> {
    let qty = trade.quantity;
    let before = running.quantity;

    match trade.kind {
        TradeKind::Buy => {
            running.quantity += qty;
            running.cost += trade.notional;
        }
        TradeKind::Cover => {
            // A cover buys back short quantity; covering past flat means the
            // ledger recorded more cover than short.
            if before + qty > epsilon {
                return Err(EngineError::InsufficientPosition {
                    symbol: trade.symbol.clone(),
                    requested: qty,
                    held: before.abs(),
                });
            }
            running.quantity += qty;
            running.cost += trade.notional;
        }
        TradeKind::Sell => {
            if qty > before + epsilon {
                return Err(EngineError::InsufficientPosition {
                    symbol: trade.symbol.clone(),
                    requested: qty,
                    held: before,
                });
            }
            reduce_cost(running, qty, before, epsilon);
            running.quantity -= qty;
        }
        TradeKind::Short => {
            // Shorting while long first unwinds the long basis, then the
            // sale proceeds are carried as cost owed back on cover.
            reduce_cost(running, qty.min(before), before, epsilon);
            running.quantity -= qty;
            running.cost += trade.notional;
        }
        TradeKind::BetUp | TradeKind::BetDown => unreachable!("bets are filtered before the fold"),
    }

    running.trade_ids.push(trade.id.clone());
    Ok(())
}

/// Cost-proportional reduction: cost -= cost * removed / quantity_before,
/// applied before the quantity itself changes. No P&L is realized here.
fn reduce_cost(running: &mut Running, removed: Decimal, before: Decimal, epsilon: Decimal) {
    if before > epsilon && removed.is_positive() {
        running.cost -= running.cost * removed / before;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderStyle, TimeMs, UserId};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn trade(kind: TradeKind, qty: &str, px: &str, time_ms: i64) -> TradeRecord {
        TradeRecord::spot(
            UserId::new("u1"),
            Symbol::new("BTC"),
            kind,
            OrderStyle::Market,
            d(qty),
            d(px),
            TimeMs::new(time_ms),
        )
    }

    #[test]
    fn test_single_buy() {
        let trades = vec![trade(TradeKind::Buy, "2", "50", 1000)];
        let positions = aggregate(&trades).unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, d("2"));
        assert_eq!(positions[0].cost, d("100"));
        assert_eq!(positions[0].direction, PositionDirection::Long);
        assert_eq!(positions[0].avg_price(), d("50"));
    }

    #[test]
    fn test_cost_proportional_reduction_keeps_avg() {
        // buy 2 @ 50, buy 1 @ 80 -> qty 3, cost 180, avg 60;
        // sell 1 @ 90 -> cost 120, qty 2, avg still 60.
        let trades = vec![
            trade(TradeKind::Buy, "2", "50", 1000),
            trade(TradeKind::Buy, "1", "80", 2000),
            trade(TradeKind::Sell, "1", "90", 3000),
        ];
        let positions = aggregate(&trades).unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, d("2"));
        assert_eq!(positions[0].cost, d("120"));
        assert_eq!(positions[0].avg_price(), d("60"));
    }

    #[test]
    fn test_buy_then_sell_everything_is_flat() {
        let trades = vec![
            trade(TradeKind::Buy, "2", "50", 1000),
            trade(TradeKind::Sell, "2", "50", 2000),
        ];
        assert!(aggregate(&trades).unwrap().is_empty());
    }

    #[test]
    fn test_replay_is_pure() {
        let trades = vec![
            trade(TradeKind::Buy, "2", "50", 1000),
            trade(TradeKind::Buy, "1", "80", 2000),
            trade(TradeKind::Sell, "1", "90", 3000),
        ];
        let first = aggregate(&trades).unwrap();
        let second = aggregate(&trades).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_out_of_order_input_is_sorted_by_creation() {
        let sell = trade(TradeKind::Sell, "1", "60", 3000);
        let buy = trade(TradeKind::Buy, "2", "50", 1000);
        let positions = aggregate(&[sell, buy]).unwrap();
        assert_eq!(positions[0].quantity, d("1"));
    }

    #[test]
    fn test_short_creates_short_position_with_proceeds_as_cost() {
        let trades = vec![trade(TradeKind::Short, "2", "100", 1000)];
        let positions = aggregate(&trades).unwrap();
        assert_eq!(positions[0].quantity, d("-2"));
        assert_eq!(positions[0].cost, d("200"));
        assert_eq!(positions[0].direction, PositionDirection::Short);
        assert_eq!(positions[0].avg_price(), d("100"));
    }

    #[test]
    fn test_short_then_cover_is_flat() {
        let trades = vec![
            trade(TradeKind::Short, "2", "100", 1000),
            trade(TradeKind::Cover, "2", "90", 2000),
        ];
        assert!(aggregate(&trades).unwrap().is_empty());
    }

    #[test]
    fn test_oversell_signals_insufficient_position() {
        let trades = vec![
            trade(TradeKind::Buy, "1", "50", 1000),
            trade(TradeKind::Sell, "2", "50", 2000),
        ];
        match aggregate(&trades) {
            Err(EngineError::InsufficientPosition {
                requested, held, ..
            }) => {
                assert_eq!(requested, d("2"));
                assert_eq!(held, d("1"));
            }
            other => panic!("expected InsufficientPosition, got {:?}", other),
        }
    }

    #[test]
    fn test_overcover_signals_insufficient_position() {
        let trades = vec![
            trade(TradeKind::Short, "1", "100", 1000),
            trade(TradeKind::Cover, "2", "100", 2000),
        ];
        assert!(matches!(
            aggregate(&trades),
            Err(EngineError::InsufficientPosition { .. })
        ));
    }

    #[test]
    fn test_closed_trades_are_excluded() {
        let mut closed = trade(TradeKind::Buy, "2", "50", 1000);
        closed.closed = true;
        let trades = vec![closed, trade(TradeKind::Buy, "1", "80", 2000)];
        let positions = aggregate(&trades).unwrap();
        assert_eq!(positions[0].quantity, d("1"));
        assert_eq!(positions[0].cost, d("80"));
    }

    #[test]
    fn test_bets_are_excluded() {
        let bet = TradeRecord::timed_bet(
            UserId::new("u1"),
            Symbol::new("BTC"),
            crate::domain::BetDirection::Up,
            d("10"),
            60,
            d("100"),
            TimeMs::new(1000),
        );
        assert!(aggregate(&[bet]).unwrap().is_empty());
    }

    #[test]
    fn test_dust_position_is_dropped() {
        let trades = vec![
            trade(TradeKind::Buy, "1", "50", 1000),
            trade(TradeKind::Sell, "0.999999999", "50", 2000),
        ];
        // Remaining 1e-9 is below the 1e-8 epsilon.
        assert!(aggregate(&trades).unwrap().is_empty());
    }

    #[test]
    fn test_contributing_trade_ids_tracked_in_order() {
        let a = trade(TradeKind::Buy, "1", "50", 1000);
        let b = trade(TradeKind::Buy, "1", "60", 2000);
        let ids = vec![a.id.clone(), b.id.clone()];
        let positions = aggregate(&[a, b]).unwrap();
        assert_eq!(positions[0].trade_ids, ids);
    }

    #[test]
    fn test_multiple_symbols() {
        let mut eth = trade(TradeKind::Buy, "5", "10", 1500);
        eth.symbol = Symbol::new("ETH");
        let trades = vec![trade(TradeKind::Buy, "1", "50", 1000), eth];
        let positions = aggregate(&trades).unwrap();
        assert_eq!(positions.len(), 2);
        // BTreeMap ordering: BTC before ETH.
        assert_eq!(positions[0].symbol, Symbol::new("BTC"));
        assert_eq!(positions[1].symbol, Symbol::new("ETH"));
    }
}
