//! Settlement sweeper: the periodic tick that drives timed bets through
//! expiry.
//!
//! Runs once per configured interval. A bet that fails to settle on a
//! sweep (price outage, persistence failure) stays in `Settling` and is
//! picked up again on the next sweep; a bet is never abandoned once its
//! stake has been taken.

use crate::domain::TimeMs;
use crate::engine::TickOutcome;
use crate::error::EngineError;
use crate::pricesource::PriceSource;
use crate::service::TradingService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct SettlementSweeper {
    service: Arc<TradingService>,
    price_source: Arc<dyn PriceSource>,
    interval: Duration,
}

impl SettlementSweeper {
    pub fn new(
        service: Arc<TradingService>,
        price_source: Arc<dyn PriceSource>,
        interval_ms: u64,
    ) -> Self {
        SettlementSweeper {
            service,
            price_source,
            interval: Duration::from_millis(interval_ms),
        }
    }

    /// Run forever. Spawn this on the runtime.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "settlement sweeper started");

        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_once(TimeMs::now()).await {
                warn!("sweep failed, will retry next tick: {}", e);
            }
        }
    }

    /// One sweep: resume stuck bets first, then settle newly due ones.
    /// Transient per-bet failures are logged and retried on the next
    /// sweep; they never abort the rest of the batch.
    pub async fn sweep_once(&self, now: TimeMs) -> Result<(), EngineError> {
        for bet in self.service.settling_bets().await? {
            match self
                .service
                .resume_settlement(&bet.id, self.price_source.as_ref())
                .await
            {
                Ok(outcome) => debug!(bet_id = %bet.id, ?outcome, "resumed settling bet"),
                Err(e) if e.is_transient() => {
                    warn!(bet_id = %bet.id, "resume deferred: {}", e)
                }
                Err(e) => warn!(bet_id = %bet.id, "resume failed: {}", e),
            }
        }

        for bet in self.service.due_bets(now).await? {
            match self
                .service
                .tick_settlement(&bet.id, self.price_source.as_ref())
                .await
            {
                Ok(TickOutcome::Settled { .. }) => {}
                Ok(outcome) => debug!(bet_id = %bet.id, ?outcome, "tick was a no-op"),
                Err(e) if e.is_transient() => {
                    warn!(bet_id = %bet.id, "settlement deferred: {}", e)
                }
                Err(e) => warn!(bet_id = %bet.id, "settlement failed: {}", e),
            }
        }

        Ok(())
    }
}
