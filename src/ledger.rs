//! Balance ledger: the single mutation path for user balances.
//!
//! Every balance change is a read-modify-write against the balances table.
//! Those cycles are serialized per user through an async lock registry:
//! every mutator takes a `UserLock` token, so the type system makes it
//! impossible to mutate a balance without holding the owning user's lock.
//!
//! Order placement couples its cash flow to the trade insert through
//! `debit_and_record`/`credit_and_record`, which commit both writes in a
//! single transaction so a failed insert never leaves a dangling debit or
//! credit.

use crate::db::Repository;
use crate::domain::{Decimal, TradeRecord, UserId};
use crate::error::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Proof that the holder owns a user's balance lock.
pub struct UserLock {
    user: UserId,
    _guard: OwnedMutexGuard<()>,
}

impl UserLock {
    pub fn user(&self) -> &UserId {
        &self.user
    }
}

pub struct BalanceLedger {
    repo: Arc<Repository>,
    opening_balance: Decimal,
    locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl BalanceLedger {
    pub fn new(repo: Arc<Repository>, opening_balance: Decimal) -> Self {
        BalanceLedger {
            repo,
            opening_balance,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the serialization lock for a user's balance.
    pub async fn lock_user(&self, user: &UserId) -> UserLock {
        let mutex = {
            let mut locks = self.locks.lock().expect("lock registry poisoned");
            locks
                .entry(user.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        UserLock {
            user: user.clone(),
            _guard: mutex.lock_owned().await,
        }
    }

    /// Current balance, creating the row with the opening amount on first
    /// touch. Read-only; safe without the user lock.
    pub async fn balance(&self, user: &UserId) -> Result<Decimal, EngineError> {
        self.repo.ensure_balance(user, self.opening_balance).await?;
        let amount = self
            .repo
            .get_balance(user)
            .await?
            .unwrap_or(self.opening_balance);
        Ok(amount)
    }

    /// Remove funds. Fails with `InsufficientBalance` before anything is
    /// written; validation happens against the balance read under the
    /// held lock. Returns the new balance.
    pub async fn debit(
        &self,
        lock: &UserLock,
        amount: Decimal,
    ) -> Result<Decimal, EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidOrder(
                "debit amount must be positive".to_string(),
            ));
        }

        let available = self.balance(lock.user()).await?;
        if amount > available {
            return Err(EngineError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        let new_balance = available - amount;
        self.repo.set_balance(lock.user(), new_balance).await?;
        debug!(user = %lock.user(), %amount, %new_balance, "debit applied");
        Ok(new_balance)
    }

    /// Add funds. A zero credit is a no-op. Returns the new balance.
    pub async fn credit(
        &self,
        lock: &UserLock,
        amount: Decimal,
    ) -> Result<Decimal, EngineError> {
        if amount.is_negative() {
            return Err(EngineError::InvalidOrder(
                "credit amount must be non-negative".to_string(),
            ));
        }

        let current = self.balance(lock.user()).await?;
        if amount.is_zero() {
            return Ok(current);
        }

        let new_balance = current + amount;
        self.repo.set_balance(lock.user(), new_balance).await?;
        debug!(user = %lock.user(), %amount, %new_balance, "credit applied");
        Ok(new_balance)
    }

    /// Debit `amount` and persist `trade` in one transaction. Validation
    /// matches `debit`; nothing is written when it fails. Returns the new
    /// balance.
    pub async fn debit_and_record(
        &self,
        lock: &UserLock,
        amount: Decimal,
        trade: &TradeRecord,
    ) -> Result<Decimal, EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidOrder(
                "debit amount must be positive".to_string(),
            ));
        }

        let available = self.balance(lock.user()).await?;
        if amount > available {
            return Err(EngineError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        let new_balance = available - amount;
        self.repo.insert_trade_with_balance(trade, new_balance).await?;
        debug!(user = %lock.user(), %amount, %new_balance, trade_id = %trade.id, "debit recorded");
        Ok(new_balance)
    }

    /// Credit `amount` and persist `trade` in one transaction. Returns
    /// the new balance.
    pub async fn credit_and_record(
        &self,
        lock: &UserLock,
        amount: Decimal,
        trade: &TradeRecord,
    ) -> Result<Decimal, EngineError> {
        if amount.is_negative() {
            return Err(EngineError::InvalidOrder(
                "credit amount must be non-negative".to_string(),
            ));
        }

        let current = self.balance(lock.user()).await?;
        let new_balance = current + amount;
        self.repo.insert_trade_with_balance(trade, new_balance).await?;
        debug!(user = %lock.user(), %amount, %new_balance, trade_id = %trade.id, "credit recorded");
        Ok(new_balance)
    }
}
