use crate::domain::events::LedgerEvent;
use crate::domain::ports::EventSink;
use tracing::info;

/// Writes every ledger event to the `gigledger::events` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::SettlementSweep(report) => info!(
                target: "gigledger::events",
                due = report.due,
                settled = report.settled,
                already_handled = report.already_handled,
                failed = report.failed,
                "settlement sweep finished"
            ),
            other => match serde_json::to_string(other) {
                Ok(json) => info!(target: "gigledger::events", event = %json),
                Err(e) => info!(target: "gigledger::events", ?other, error = %e),
            },
        }
    }
}
