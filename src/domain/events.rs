use super::ids::{OrderId, UserId, WithdrawalId};
use super::money::Balance;
use serde::Serialize;

/// Committed state changes worth telling the outside world about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    OrderCompleted {
        order_id: OrderId,
        freelancer_id: UserId,
        earnings: Balance,
    },
    WithdrawalRequested {
        request_id: WithdrawalId,
        freelancer_id: UserId,
        reserved: Balance,
    },
    WithdrawalCancelled {
        request_id: WithdrawalId,
        freelancer_id: UserId,
    },
    WithdrawalRejected {
        request_id: WithdrawalId,
        freelancer_id: UserId,
        reason: String,
    },
    WithdrawalSettled {
        request_id: WithdrawalId,
        freelancer_id: UserId,
        amount: Balance,
        auto_completed: bool,
    },
    SettlementSweep(SweepReport),
}

/// Outcome of one settlement sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Requests the sweep found due.
    pub due: usize,
    pub settled: usize,
    /// Requests another actor finished first (cancelled or settled).
    pub already_handled: usize,
    pub failed: usize,
}
