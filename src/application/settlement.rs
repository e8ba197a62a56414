//! Background settlement of withdrawals whose holding window has ended.
//!
//! A sweep may overlap with another sweep or with a freelancer cancelling the
//! same request. Whoever commits first wins; the loser re-reads, finds the
//! request no longer pending, and the sweep counts it as already handled.

use super::engine::MarketplaceEngine;
use crate::domain::events::{LedgerEvent, SweepReport};
use crate::error::{EngineError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

pub struct SettlementScheduler {
    engine: Arc<MarketplaceEngine>,
    period: Duration,
}

impl SettlementScheduler {
    pub fn new(engine: Arc<MarketplaceEngine>) -> Self {
        let period = engine.config().settlement_interval();
        Self { engine, period }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Settles every request that is due now, up to the configured batch size.
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let now = self.engine.now();
        let due = self
            .engine
            .retrying("due_withdrawals", move || self.engine.due(now))
            .await?;

        let mut report = SweepReport {
            due: due.len(),
            ..SweepReport::default()
        };

        for request in due {
            match self.engine.auto_complete_withdrawal(&request.request_id).await {
                Ok(_) => report.settled += 1,
                Err(EngineError::InvalidState { state, .. }) => {
                    debug!(request_id = %request.request_id, %state, "already handled");
                    report.already_handled += 1;
                }
                Err(EngineError::NotFound { .. }) => report.already_handled += 1,
                Err(e) => {
                    warn!(request_id = %request.request_id, code = e.code(), error = %e, "settlement failed");
                    report.failed += 1;
                }
            }
        }

        if report.due > 0 {
            info!(
                settled = report.settled,
                already_handled = report.already_handled,
                failed = report.failed,
                "settlement sweep"
            );
        }
        self.engine.publish(LedgerEvent::SettlementSweep(report));
        Ok(report)
    }

    /// Runs sweeps on a fixed period until the returned handle is shut down.
    /// Ticks missed while a sweep is running are skipped, not queued.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("settlement scheduler received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep_once().await {
                            error!(code = e.code(), error = %e, "settlement sweep failed");
                        }
                    }
                }
            }
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

pub struct SchedulerHandle {
    shutdown: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the scheduler after any in-flight sweep finishes.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(()).await;
        if let Err(e) = self.task.await {
            error!(error = %e, "settlement scheduler task panicked");
        }
    }
}
