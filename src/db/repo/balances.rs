//! Balance row operations for the repository.
//!
//! These are raw reads/writes. Serialization of read-modify-write cycles
//! is enforced above, in the balance ledger's per-user locks; nothing
//! here should be called without holding the owning user's lock.

use crate::domain::{Decimal, UserId};
use sqlx::Row;

use super::{decode_decimal, Repository};

impl Repository {
    /// Read a user's balance, if a row exists.
    pub async fn get_balance(&self, user: &UserId) -> Result<Option<Decimal>, sqlx::Error> {
        let row = sqlx::query("SELECT amount FROM balances WHERE user = ?")
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("amount");
                Ok(Some(decode_decimal(&raw, "amount")?))
            }
            None => Ok(None),
        }
    }

    /// Create a balance row with the opening amount if none exists.
    ///
    /// Idempotent: an existing row is left untouched. Returns true if a
    /// row was created.
    pub async fn ensure_balance(
        &self,
        user: &UserId,
        opening: Decimal,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO balances (user, amount)
            VALUES (?, ?)
            ON CONFLICT(user) DO NOTHING
            "#,
        )
        .bind(user.as_str())
        .bind(opening.to_canonical_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite a user's balance.
    pub async fn set_balance(&self, user: &UserId, amount: Decimal) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE balances SET amount = ? WHERE user = ?")
            .bind(amount.to_canonical_string())
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
