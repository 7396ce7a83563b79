//! Trade ledger operations for the repository.

use crate::domain::{BetStatus, Decimal, TimeMs, TradeRecord, UserId};
use sqlx::Row;
use tracing::debug;

use super::{trade_from_row, Repository};

fn insert_trade_query(
    trade: &TradeRecord,
) -> sqlx::query::Query<'_, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(
        r#"
        INSERT INTO trades
        (id, user, symbol, kind, style, quantity, price, notional, created_ms,
         closed, close_price, closed_ms, realized_pnl,
         direction, duration_secs, entry_price, expires_ms, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&trade.id)
    .bind(trade.user.as_str())
    .bind(trade.symbol.as_str())
    .bind(trade.kind.as_str())
    .bind(trade.style.as_str())
    .bind(trade.quantity.to_canonical_string())
    .bind(trade.price.to_canonical_string())
    .bind(trade.notional.to_canonical_string())
    .bind(trade.created_ms.as_i64())
    .bind(trade.closed as i64)
    .bind(trade.close_price.map(|d| d.to_canonical_string()))
    .bind(trade.closed_ms.map(|t| t.as_i64()))
    .bind(trade.realized_pnl.map(|d| d.to_canonical_string()))
    .bind(trade.direction.map(|d| d.as_str()))
    .bind(trade.duration_secs)
    .bind(trade.entry_price.map(|d| d.to_canonical_string()))
    .bind(trade.expires_ms.map(|t| t.as_i64()))
    .bind(trade.status.map(|s| s.as_str()))
}

impl Repository {
    /// Insert a trade record.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_trade(&self, trade: &TradeRecord) -> Result<(), sqlx::Error> {
        insert_trade_query(trade).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert a trade and write the trader's new balance in one
    /// transaction.
    ///
    /// This is the cash flow at order placement: the ledger entry and the
    /// balance move land together or not at all. The caller must have
    /// ensured the balance row exists.
    pub async fn insert_trade_with_balance(
        &self,
        trade: &TradeRecord,
        new_balance: Decimal,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        insert_trade_query(trade).execute(&mut *tx).await?;

        sqlx::query("UPDATE balances SET amount = ? WHERE user = ?")
            .bind(new_balance.to_canonical_string())
            .bind(trade.user.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// List all trades for a user in ascending creation order (id tiebreak).
    pub async fn list_trades(&self, user: &UserId) -> Result<Vec<TradeRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM trades
            WHERE user = ?
            ORDER BY created_ms ASC, id ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(trade_from_row).collect()
    }

    /// Fetch a single trade by id.
    pub async fn get_trade(&self, id: &str) -> Result<Option<TradeRecord>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM trades WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(trade_from_row).transpose()
    }

    /// Mark a set of constituent trades closed in one transaction.
    ///
    /// Each update is conditional on `closed = 0`, so a replay of the same
    /// close is a no-op. Returns the number of trades newly closed.
    pub async fn close_trades(
        &self,
        trade_ids: &[String],
        close_price: Decimal,
        closed_ms: TimeMs,
        realized_pnl: Decimal,
    ) -> Result<usize, sqlx::Error> {
        if trade_ids.is_empty() {
            return Ok(0);
        }

        let mut total_closed = 0usize;
        let mut tx = self.pool.begin().await?;

        for id in trade_ids {
            let result = sqlx::query(
                r#"
                UPDATE trades
                SET closed = 1, close_price = ?, closed_ms = ?, realized_pnl = ?
                WHERE id = ? AND closed = 0
                "#,
            )
            .bind(close_price.to_canonical_string())
            .bind(closed_ms.as_i64())
            .bind(realized_pnl.to_canonical_string())
            .bind(id)
            .execute(&mut *tx)
            .await?;

            total_closed += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(total_closed)
    }

    /// Flip a bet from `pending` to `settling`.
    ///
    /// The conditional update is the single-flight guard: only one caller
    /// ever observes a true return for a given bet id.
    pub async fn mark_bet_settling(&self, bet_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE trades
            SET status = 'settling'
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(bet_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write a bet's final outcome and, when it won, the balance payout,
    /// in a single transaction.
    ///
    /// The outcome write is conditional on `status = 'settling'`; if some
    /// other caller already settled the bet, nothing is written (including
    /// the payout) and false is returned.
    #[allow(clippy::too_many_arguments)]
    pub async fn settle_bet(
        &self,
        bet_id: &str,
        status: BetStatus,
        close_price: Decimal,
        closed_ms: TimeMs,
        realized_pnl: Decimal,
        user: &UserId,
        new_balance: Option<Decimal>,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE trades
            SET status = ?, closed = 1, close_price = ?, closed_ms = ?, realized_pnl = ?
            WHERE id = ? AND status = 'settling'
            "#,
        )
        .bind(status.as_str())
        .bind(close_price.to_canonical_string())
        .bind(closed_ms.as_i64())
        .bind(realized_pnl.to_canonical_string())
        .bind(bet_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(bet_id, "settle skipped: bet no longer in settling state");
            return Ok(false);
        }

        if let Some(amount) = new_balance {
            sqlx::query("UPDATE balances SET amount = ? WHERE user = ?")
                .bind(amount.to_canonical_string())
                .bind(user.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Pending bets whose expiry has passed, oldest first.
    pub async fn list_due_bets(&self, now: TimeMs) -> Result<Vec<TradeRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM trades
            WHERE status = 'pending' AND expires_ms <= ?
            ORDER BY expires_ms ASC, id ASC
            "#,
        )
        .bind(now.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(trade_from_row).collect()
    }

    /// Bets stuck mid-settlement (e.g. after a crash or a price outage).
    pub async fn list_settling_bets(&self) -> Result<Vec<TradeRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM trades
            WHERE status = 'settling'
            ORDER BY expires_ms ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(trade_from_row).collect()
    }

    /// Count of trades for a user (diagnostics).
    pub async fn count_trades(&self, user: &UserId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM trades WHERE user = ?")
            .bind(user.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n"))
    }
}
