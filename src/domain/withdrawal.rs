use super::ids::{UserId, WithdrawalId};
use super::money::{Amount, Balance};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    /// Pending and processing requests hold a reservation on the wallet.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Bank details; opaque to the ledger beyond being non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
}

impl Destination {
    pub fn validate(&self) -> Result<()> {
        let blank = [
            ("bank name", &self.bank_name),
            ("account number", &self.account_number),
            ("account holder", &self.account_holder),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty());
        match blank {
            Some((field, _)) => Err(EngineError::ValidationError(format!("{field} is required"))),
            None => Ok(()),
        }
    }
}

/// How a request reached `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Settled by the sweep after the holding window.
    Auto,
    /// Settled explicitly by an operator.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub request_id: WithdrawalId,
    pub freelancer_id: UserId,
    pub amount: Amount,
    pub admin_fee: Balance,
    pub destination: Destination,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub auto_complete_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub is_auto_completed: bool,
    pub notes: Option<String>,
    pub version: u64,
}

impl WithdrawalRequest {
    pub fn open(
        request_id: WithdrawalId,
        freelancer_id: UserId,
        amount: Amount,
        admin_fee: Balance,
        destination: Destination,
        now: DateTime<Utc>,
        holding_window: Duration,
    ) -> Result<Self> {
        let auto_complete_at = now.checked_add_signed(holding_window).ok_or_else(|| {
            EngineError::ValidationError(format!(
                "holding window of {}s overflows the calendar",
                holding_window.num_seconds()
            ))
        })?;
        Ok(Self {
            request_id,
            freelancer_id,
            amount,
            admin_fee,
            destination,
            status: WithdrawalStatus::Pending,
            created_at: now,
            auto_complete_at,
            processed_at: None,
            is_auto_completed: false,
            notes: None,
            version: 0,
        })
    }

    /// The amount held against the wallet while the request is live.
    pub fn reserved(&self) -> Balance {
        Balance::from(self.amount) + self.admin_fee
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == WithdrawalStatus::Pending && self.auto_complete_at <= now
    }

    /// Freelancer-initiated cancellation; only while still pending.
    pub fn cancel(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        if self.status != WithdrawalStatus::Pending {
            return Err(EngineError::invalid_state("withdrawal", self.status, "cancel"));
        }
        self.status = WithdrawalStatus::Rejected;
        self.processed_at = Some(now);
        self.notes = Some(reason.to_string());
        Ok(())
    }

    pub fn begin_processing(&mut self) -> Result<()> {
        if self.status != WithdrawalStatus::Pending {
            return Err(EngineError::invalid_state("withdrawal", self.status, "process"));
        }
        self.status = WithdrawalStatus::Processing;
        Ok(())
    }

    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        if !self.status.is_reserved() {
            return Err(EngineError::invalid_state("withdrawal", self.status, "reject"));
        }
        self.status = WithdrawalStatus::Rejected;
        self.processed_at = Some(now);
        self.notes = Some(reason.to_string());
        Ok(())
    }

    pub fn complete(&mut self, completion: Completion, now: DateTime<Utc>) -> Result<()> {
        let allowed = match completion {
            Completion::Auto => self.is_due(now),
            Completion::Manual => self.status.is_reserved(),
        };
        if !allowed {
            return Err(EngineError::invalid_state("withdrawal", self.status, "complete"));
        }
        self.status = WithdrawalStatus::Completed;
        self.processed_at = Some(now);
        self.is_auto_completed = completion == Completion::Auto;
        if completion == Completion::Auto {
            self.notes = Some("Auto-completed after holding window".to_string());
        }
        Ok(())
    }
}
