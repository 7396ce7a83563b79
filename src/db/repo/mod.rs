//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `trades.rs` - trade ledger inserts, queries, close and bet-status updates
//! - `balances.rs` - balance rows

mod balances;
mod trades;

use crate::domain::{
    BetDirection, BetStatus, Decimal, OrderStyle, Symbol, TimeMs, TradeKind, TradeRecord, UserId,
};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

/// Repository for trade-ledger and balance persistence.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

fn decode_decimal(raw: &str, column: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str_canonical(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn decode_enum<T>(parsed: Option<T>, column: &str, raw: &str) -> Result<T, sqlx::Error> {
    parsed.ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unrecognized value: {}", raw).into(),
    })
}

/// Map a trades row to a TradeRecord.
pub(crate) fn trade_from_row(row: &SqliteRow) -> Result<TradeRecord, sqlx::Error> {
    let kind_raw: String = row.get("kind");
    let style_raw: String = row.get("style");

    let direction = match row.get::<Option<String>, _>("direction") {
        Some(raw) => Some(decode_enum(BetDirection::parse(&raw), "direction", &raw)?),
        None => None,
    };
    let status = match row.get::<Option<String>, _>("status") {
        Some(raw) => Some(decode_enum(BetStatus::parse(&raw), "status", &raw)?),
        None => None,
    };
    let close_price = match row.get::<Option<String>, _>("close_price") {
        Some(raw) => Some(decode_decimal(&raw, "close_price")?),
        None => None,
    };
    let realized_pnl = match row.get::<Option<String>, _>("realized_pnl") {
        Some(raw) => Some(decode_decimal(&raw, "realized_pnl")?),
        None => None,
    };
    let entry_price = match row.get::<Option<String>, _>("entry_price") {
        Some(raw) => Some(decode_decimal(&raw, "entry_price")?),
        None => None,
    };

    Ok(TradeRecord {
        id: row.get("id"),
        user: UserId::new(row.get::<String, _>("user")),
        symbol: Symbol::new(row.get::<String, _>("symbol")),
        kind: decode_enum(TradeKind::parse(&kind_raw), "kind", &kind_raw)?,
        style: decode_enum(OrderStyle::parse(&style_raw), "style", &style_raw)?,
        quantity: decode_decimal(&row.get::<String, _>("quantity"), "quantity")?,
        price: decode_decimal(&row.get::<String, _>("price"), "price")?,
        notional: decode_decimal(&row.get::<String, _>("notional"), "notional")?,
        created_ms: TimeMs::new(row.get::<i64, _>("created_ms")),
        closed: row.get::<i64, _>("closed") != 0,
        close_price,
        closed_ms: row.get::<Option<i64>, _>("closed_ms").map(TimeMs::new),
        realized_pnl,
        direction,
        duration_secs: row.get::<Option<i64>, _>("duration_secs"),
        entry_price,
        expires_ms: row.get::<Option<i64>, _>("expires_ms").map(TimeMs::new),
        status,
    })
}
