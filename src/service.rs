//! Trading service: the operations exposed to callers.
//!
//! Owns the order-placement and settlement flows, holding the per-user
//! balance lock across each compound read-modify-write so concurrent
//! placements and settlements for the same user cannot interleave.

use crate::db::Repository;
use crate::domain::{
    BetDirection, BetStatus, Decimal, OrderStyle, PositionDirection, PositionView, Symbol, TimeMs,
    TradeKind, TradeRecord, UserId,
};
use crate::engine::{self, SettlementReceipt, TickOutcome};
use crate::error::EngineError;
use crate::ledger::BalanceLedger;
use crate::pricesource::PriceSource;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct TradingService {
    repo: Arc<Repository>,
    ledger: Arc<BalanceLedger>,
    payout_multiplier: Decimal,
}

impl TradingService {
    pub fn new(
        repo: Arc<Repository>,
        ledger: Arc<BalanceLedger>,
        payout_multiplier: Decimal,
    ) -> Self {
        TradingService {
            repo,
            ledger,
            payout_multiplier,
        }
    }

    /// Place a spot order (buy/sell/short/cover).
    ///
    /// Cash flows at placement: buys debit the notional, sells credit the
    /// proceeds, shorts debit the notional as the escrowed stake returned
    /// at close. A cover must liquidate the full short position; its
    /// credit is stake plus realized P&L, matching `close_position`.
    /// Every cash flow commits in the same transaction as the trade
    /// insert, so a rejected write leaves the balance untouched.
    pub async fn place_spot_order(
        &self,
        user: &UserId,
        symbol: &Symbol,
        kind: TradeKind,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<TradeRecord, EngineError> {
        if kind.is_bet() {
            return Err(EngineError::InvalidOrder(
                "timed bets are placed via place_timed_bet".to_string(),
            ));
        }
        if !quantity.is_positive() {
            return Err(EngineError::InvalidOrder(
                "quantity must be positive".to_string(),
            ));
        }
        if !price.is_positive() {
            return Err(EngineError::InvalidOrder(
                "price must be positive".to_string(),
            ));
        }

        let lock = self.ledger.lock_user(user).await;
        let trade = TradeRecord::spot(
            user.clone(),
            symbol.clone(),
            kind,
            OrderStyle::Market,
            quantity,
            price,
            TimeMs::now(),
        );

        match kind {
            TradeKind::Buy => {
                self.ledger
                    .debit_and_record(&lock, trade.notional, &trade)
                    .await?;
            }
            TradeKind::Short => {
                // Stake escrow: held until the short is covered or closed.
                self.ledger
                    .debit_and_record(&lock, trade.notional, &trade)
                    .await?;
            }
            TradeKind::Sell => {
                let held = self.held_long_quantity(user, symbol).await?;
                if quantity > held + Decimal::position_epsilon() {
                    return Err(EngineError::InsufficientPosition {
                        symbol: symbol.clone(),
                        requested: quantity,
                        held,
                    });
                }
                self.ledger
                    .credit_and_record(&lock, trade.notional, &trade)
                    .await?;
            }
            TradeKind::Cover => {
                let position = engine::find_position(&self.repo.list_trades(user).await?, symbol)?
                    .filter(|p| p.direction == PositionDirection::Short)
                    .ok_or_else(|| EngineError::InsufficientPosition {
                        symbol: symbol.clone(),
                        requested: quantity,
                        held: Decimal::zero(),
                    })?;
                let held = position.quantity.abs();
                if quantity > held + Decimal::position_epsilon() {
                    return Err(EngineError::InsufficientPosition {
                        symbol: symbol.clone(),
                        requested: quantity,
                        held,
                    });
                }
                if quantity < held - Decimal::position_epsilon() {
                    return Err(EngineError::InvalidOrder(
                        "cover must liquidate the full short position".to_string(),
                    ));
                }
                // Full cover settles like a short close: stake plus P&L.
                let plan = engine::plan_close(&position, price);
                self.ledger
                    .credit_and_record(&lock, plan.credit, &trade)
                    .await?;
            }
            TradeKind::BetUp | TradeKind::BetDown => unreachable!("rejected above"),
        }

        info!(user = %user, symbol = %symbol, kind = %kind, %quantity, %price, "spot order placed");
        Ok(trade)
    }

    /// Close a user's entire position in a symbol at the given price.
    ///
    /// Constituent trades are marked closed in one transaction; the
    /// balance credit follows. If the credit fails after the trades are
    /// closed, a `CreditPending` receipt reports the outstanding amount so
    /// the caller can apply it once via `apply_pending_credit` instead of
    /// re-running the close.
    pub async fn close_position(
        &self,
        user: &UserId,
        symbol: &Symbol,
        current_price: Decimal,
    ) -> Result<SettlementReceipt, EngineError> {
        if !current_price.is_positive() {
            return Err(EngineError::InvalidOrder(
                "price must be positive".to_string(),
            ));
        }

        let lock = self.ledger.lock_user(user).await;
        let trades = self.repo.list_trades(user).await?;
        let position = engine::find_position(&trades, symbol)?.ok_or_else(|| {
            EngineError::InsufficientPosition {
                symbol: symbol.clone(),
                requested: Decimal::zero(),
                held: Decimal::zero(),
            }
        })?;

        let plan = engine::plan_close(&position, current_price);
        let closed_ms = TimeMs::now();

        let closed = self
            .repo
            .close_trades(&plan.trade_ids, plan.close_price, closed_ms, plan.realized_pnl)
            .await?;
        if closed == 0 {
            // Every constituent was already closed by a concurrent call.
            warn!(user = %user, symbol = %symbol, "close was a duplicate; no trades updated");
            return Err(EngineError::DoubleSettlementAttempt(format!(
                "position {} already closed",
                symbol
            )));
        }

        match self.ledger.credit(&lock, plan.credit).await {
            Ok(new_balance) => {
                info!(
                    user = %user, symbol = %symbol,
                    realized_pnl = %plan.realized_pnl, credited = %plan.credit,
                    "position closed"
                );
                Ok(SettlementReceipt::Settled {
                    symbol: symbol.clone(),
                    close_price: plan.close_price,
                    closed_ms,
                    realized_pnl: plan.realized_pnl,
                    credited: plan.credit,
                    trade_count: closed,
                    new_balance,
                })
            }
            Err(e) => {
                error!(
                    user = %user, symbol = %symbol, credit_due = %plan.credit,
                    "trades closed but balance credit failed: {}", e
                );
                Ok(SettlementReceipt::CreditPending {
                    symbol: symbol.clone(),
                    close_price: plan.close_price,
                    closed_ms,
                    realized_pnl: plan.realized_pnl,
                    credit_due: plan.credit,
                    trade_count: closed,
                })
            }
        }
    }

    /// Apply the outstanding credit from a `CreditPending` receipt.
    /// Must be called exactly once per receipt.
    pub async fn apply_pending_credit(
        &self,
        user: &UserId,
        amount: Decimal,
    ) -> Result<Decimal, EngineError> {
        let lock = self.ledger.lock_user(user).await;
        self.ledger.credit(&lock, amount).await
    }

    /// Place a timed directional bet. The stake is debited here, before
    /// the bet is persisted, so the spendable balance always reflects all
    /// placed-but-unsettled stakes. The entry price passed in is the
    /// snapshot used at settlement; it is never re-read.
    pub async fn place_timed_bet(
        &self,
        user: &UserId,
        symbol: &Symbol,
        direction: BetDirection,
        stake: Decimal,
        duration_secs: i64,
        entry_price: Decimal,
    ) -> Result<TradeRecord, EngineError> {
        if !stake.is_positive() {
            return Err(EngineError::InvalidOrder(
                "stake must be positive".to_string(),
            ));
        }
        if duration_secs <= 0 {
            return Err(EngineError::InvalidOrder(
                "duration must be positive".to_string(),
            ));
        }
        if !entry_price.is_positive() {
            return Err(EngineError::InvalidOrder(
                "entry price must be positive".to_string(),
            ));
        }

        let lock = self.ledger.lock_user(user).await;
        let bet = TradeRecord::timed_bet(
            user.clone(),
            symbol.clone(),
            direction,
            stake,
            duration_secs,
            entry_price,
            TimeMs::now(),
        );

        self.ledger.debit_and_record(&lock, stake, &bet).await?;

        info!(
            user = %user, symbol = %symbol, direction = %direction.as_str(),
            %stake, duration_secs, %entry_price, bet_id = %bet.id,
            "timed bet placed"
        );
        Ok(bet)
    }

    /// Drive one bet through the settlement state machine. Idempotent:
    /// ticks before expiry and ticks after settlement change nothing.
    ///
    /// On `PriceUnavailable` or a persistence failure the bet stays in
    /// `Settling` and the next tick retries with the stored entry price.
    pub async fn tick_settlement(
        &self,
        bet_id: &str,
        price_source: &dyn PriceSource,
    ) -> Result<TickOutcome, EngineError> {
        let bet = self
            .repo
            .get_trade(bet_id)
            .await?
            .ok_or_else(|| EngineError::TradeNotFound(bet_id.to_string()))?;
        if !bet.is_bet() {
            return Err(EngineError::InvalidOrder(format!(
                "trade {} is not a timed bet",
                bet_id
            )));
        }

        match bet.status {
            Some(BetStatus::Win) | Some(BetStatus::Loss) => Ok(TickOutcome::AlreadySettled {
                outcome: bet.outcome(),
            }),
            Some(BetStatus::Pending) => {
                let now = TimeMs::now();
                if !bet.is_due(now) {
                    return Ok(TickOutcome::NotDue {
                        remaining_ms: engine::remaining_ms(&bet, now),
                    });
                }
                // Single-flight: only the caller that wins this flip settles.
                if !self.repo.mark_bet_settling(bet_id).await? {
                    return Ok(TickOutcome::InFlight);
                }
                self.settle(&bet, price_source).await
            }
            Some(BetStatus::Settling) => self.settle(&bet, price_source).await,
            None => Err(EngineError::InvalidOrder(format!(
                "bet {} has no settlement status",
                bet_id
            ))),
        }
    }

    /// Retry a bet stuck in `Settling` (crash or price outage recovery).
    pub async fn resume_settlement(
        &self,
        bet_id: &str,
        price_source: &dyn PriceSource,
    ) -> Result<TickOutcome, EngineError> {
        self.tick_settlement(bet_id, price_source).await
    }

    async fn settle(
        &self,
        bet: &TradeRecord,
        price_source: &dyn PriceSource,
    ) -> Result<TickOutcome, EngineError> {
        let close_price = price_source.get_price(&bet.symbol).await.map_err(|e| {
            warn!(bet_id = %bet.id, symbol = %bet.symbol, "price fetch failed, bet stays settling: {}", e);
            EngineError::PriceUnavailable(bet.symbol.clone())
        })?;

        let direction = bet.direction.ok_or_else(|| {
            EngineError::InvalidOrder(format!("bet {} has no direction", bet.id))
        })?;
        let entry_price = bet.entry_price.ok_or_else(|| {
            EngineError::InvalidOrder(format!("bet {} has no entry price", bet.id))
        })?;

        let settlement = engine::evaluate_bet(
            direction,
            entry_price,
            close_price,
            bet.stake(),
            self.payout_multiplier,
        );

        let lock = self.ledger.lock_user(&bet.user).await;
        let new_balance = if settlement.payout.is_positive() {
            Some(self.ledger.balance(lock.user()).await? + settlement.payout)
        } else {
            None
        };

        let settled = self
            .repo
            .settle_bet(
                &bet.id,
                settlement.status,
                settlement.close_price,
                TimeMs::now(),
                settlement.realized_pnl,
                &bet.user,
                new_balance,
            )
            .await?;

        if !settled {
            // Guard trip: a concurrent caller finished first. No-op.
            info!(bet_id = %bet.id, "duplicate settlement attempt ignored");
            let current = self
                .repo
                .get_trade(&bet.id)
                .await?
                .ok_or_else(|| EngineError::TradeNotFound(bet.id.clone()))?;
            return Ok(TickOutcome::AlreadySettled {
                outcome: current.outcome(),
            });
        }

        info!(
            bet_id = %bet.id, user = %bet.user, outcome = ?settlement.outcome,
            payout = %settlement.payout, realized_pnl = %settlement.realized_pnl,
            %close_price, "timed bet settled"
        );
        Ok(TickOutcome::Settled {
            outcome: settlement.outcome,
            payout: settlement.payout,
            realized_pnl: settlement.realized_pnl,
            close_price: settlement.close_price,
        })
    }

    /// Open positions marked to market.
    pub async fn open_positions(
        &self,
        user: &UserId,
        price_source: &dyn PriceSource,
    ) -> Result<Vec<PositionView>, EngineError> {
        let trades = self.repo.list_trades(user).await?;
        let positions = engine::aggregate(&trades)?;

        let marks = positions.iter().map(|position| async move {
            let price = price_source
                .get_price(&position.symbol)
                .await
                .map_err(|_| EngineError::PriceUnavailable(position.symbol.clone()))?;
            Ok::<_, EngineError>(PositionView::mark(position, price))
        });
        try_join_all(marks).await
    }

    /// Full trade history, oldest first.
    pub async fn trade_history(&self, user: &UserId) -> Result<Vec<TradeRecord>, EngineError> {
        Ok(self.repo.list_trades(user).await?)
    }

    /// Current spendable balance.
    pub async fn balance(&self, user: &UserId) -> Result<Decimal, EngineError> {
        self.ledger.balance(user).await
    }

    /// Pending bets due for settlement at `now`.
    pub async fn due_bets(&self, now: TimeMs) -> Result<Vec<TradeRecord>, EngineError> {
        Ok(self.repo.list_due_bets(now).await?)
    }

    /// Bets stuck mid-settlement.
    pub async fn settling_bets(&self) -> Result<Vec<TradeRecord>, EngineError> {
        Ok(self.repo.list_settling_bets().await?)
    }

    async fn held_long_quantity(
        &self,
        user: &UserId,
        symbol: &Symbol,
    ) -> Result<Decimal, EngineError> {
        let trades = self.repo.list_trades(user).await?;
        Ok(engine::find_position(&trades, symbol)?
            .filter(|p| p.direction == PositionDirection::Long)
            .map(|p| p.quantity)
            .unwrap_or_else(Decimal::zero))
    }
}
