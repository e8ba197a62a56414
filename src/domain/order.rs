//! Orders and their lifecycle.
//!
//! Every lifecycle change goes through [`transition`], a total function of
//! `(status, action, role)`. The `Order` methods layer the per-action side
//! effects (revision bookkeeping, timestamps) on top of it and leave the record
//! untouched when they fail.

use super::escrow::EscrowBreakdown;
use super::ids::{OrderId, ServiceId, UserId};
use super::money::{Amount, Balance};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Basic,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Submitted,
    RevisionRequested,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::Pending,
        Self::InProgress,
        Self::Submitted,
        Self::RevisionRequested,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Submitted => "submitted",
            Self::RevisionRequested => "revision-requested",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderAction {
    Accept,
    SubmitWork,
    RequestRevision,
    Approve,
    Cancel,
}

impl OrderAction {
    pub const ALL: [OrderAction; 5] = [
        Self::Accept,
        Self::SubmitWork,
        Self::RequestRevision,
        Self::Approve,
        Self::Cancel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::SubmitWork => "submit work on",
            Self::RequestRevision => "request a revision of",
            Self::Approve => "approve",
            Self::Cancel => "cancel",
        }
    }

    fn permits(&self, role: Role) -> bool {
        match self {
            Self::Accept | Self::SubmitWork => role == Role::Freelancer,
            Self::RequestRevision | Self::Approve => role == Role::Client,
            Self::Cancel => true,
        }
    }
}

/// The caller's relationship to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Freelancer,
}

/// Resolves the next status for `action` performed by `role` from `status`.
///
/// The role check comes first: an action the role may never perform fails
/// with `InvalidActor` regardless of status.
pub fn transition(status: OrderStatus, action: OrderAction, role: Role) -> Result<OrderStatus> {
    use OrderAction as A;
    use OrderStatus as S;

    if !action.permits(role) {
        return Err(EngineError::InvalidActor {
            caller: format!("{role:?}").to_lowercase(),
            action: action.name(),
        });
    }

    match (status, action) {
        (S::Pending, A::Accept) => Ok(S::InProgress),
        (S::InProgress | S::RevisionRequested, A::SubmitWork) => Ok(S::Submitted),
        (S::Submitted, A::RequestRevision) => Ok(S::RevisionRequested),
        (S::Submitted, A::Approve) => Ok(S::Completed),
        (S::Pending | S::InProgress | S::RevisionRequested, A::Cancel) => Ok(S::Cancelled),
        (from, action) => Err(EngineError::invalid_state("order", from, action.name())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRequest {
    pub message: String,
    pub requested_at: DateTime<Utc>,
}

/// Opaque file references; the files themselves live elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
    pub client_files: Vec<String>,
    pub freelancer_files: Vec<String>,
}

/// Input for [`Order::create`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: UserId,
    pub freelancer_id: UserId,
    pub service_id: ServiceId,
    pub package_type: PackageType,
    pub price: Amount,
    pub revisions_allowed: u32,
    pub requirements: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub client_id: UserId,
    pub freelancer_id: UserId,
    pub service_id: ServiceId,
    pub package_type: PackageType,
    pub package_price: Amount,
    pub platform_fee_rate: Decimal,
    pub platform_fee: Balance,
    pub escrow_amount: Balance,
    pub freelancer_earnings: Balance,
    pub client_total: Balance,
    pub requirements: String,
    pub revisions_allowed: u32,
    pub revision_count: u32,
    pub status: OrderStatus,
    pub revision_requests: Vec<RevisionRequest>,
    pub attachments: Attachments,
    pub review_id: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_transition_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version, owned by the store.
    pub version: u64,
}

impl Order {
    pub fn create(
        order_id: OrderId,
        new: NewOrder,
        platform_fee_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if new.client_id.is_blank() || new.freelancer_id.is_blank() || new.service_id.is_blank() {
            return Err(EngineError::ValidationError(
                "client, freelancer and service ids are required".to_string(),
            ));
        }
        if new.client_id == new.freelancer_id {
            return Err(EngineError::ValidationError(
                "a client cannot order their own service".to_string(),
            ));
        }

        let terms = EscrowBreakdown::compute(new.price, platform_fee_rate)?;
        Ok(Self {
            order_id,
            client_id: new.client_id,
            freelancer_id: new.freelancer_id,
            service_id: new.service_id,
            package_type: new.package_type,
            package_price: terms.package_price,
            platform_fee_rate: terms.platform_fee_rate,
            platform_fee: terms.platform_fee,
            escrow_amount: terms.escrow_amount,
            freelancer_earnings: terms.freelancer_earnings,
            client_total: terms.client_total,
            requirements: new.requirements,
            revisions_allowed: new.revisions_allowed,
            revision_count: 0,
            status: OrderStatus::Pending,
            revision_requests: Vec::new(),
            attachments: Attachments::default(),
            review_id: None,
            cancellation_reason: None,
            created_at: now,
            last_transition_at: now,
            completed_at: None,
            version: 0,
        })
    }

    pub fn role_of(&self, caller: &UserId) -> Option<Role> {
        if *caller == self.client_id {
            Some(Role::Client)
        } else if *caller == self.freelancer_id {
            Some(Role::Freelancer)
        } else {
            None
        }
    }

    fn require_role(&self, caller: &UserId, action: &'static str) -> Result<Role> {
        self.role_of(caller).ok_or_else(|| EngineError::InvalidActor {
            caller: caller.to_string(),
            action,
        })
    }

    fn next_status(&self, caller: &UserId, action: OrderAction) -> Result<OrderStatus> {
        let role = self.require_role(caller, action.name())?;
        transition(self.status, action, role).map_err(|e| match e {
            EngineError::InvalidActor { action, .. } => EngineError::InvalidActor {
                caller: caller.to_string(),
                action,
            },
            other => other,
        })
    }

    fn enter(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.last_transition_at = now;
    }

    pub fn accept(&mut self, caller: &UserId, now: DateTime<Utc>) -> Result<()> {
        let next = self.next_status(caller, OrderAction::Accept)?;
        self.enter(next, now);
        Ok(())
    }

    pub fn submit_work(&mut self, caller: &UserId, now: DateTime<Utc>) -> Result<()> {
        let next = self.next_status(caller, OrderAction::SubmitWork)?;
        if self.attachments.freelancer_files.is_empty() {
            return Err(EngineError::PreconditionFailed(
                "attach at least one delivery file before submitting".to_string(),
            ));
        }
        self.enter(next, now);
        Ok(())
    }

    pub fn request_revision(
        &mut self,
        caller: &UserId,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let next = self.next_status(caller, OrderAction::RequestRevision)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(EngineError::ValidationError(
                "revision message must not be empty".to_string(),
            ));
        }
        if self.revision_count >= self.revisions_allowed {
            return Err(EngineError::RevisionLimitExceeded {
                allowed: self.revisions_allowed,
            });
        }
        self.revision_count += 1;
        self.revision_requests.push(RevisionRequest {
            message: message.to_string(),
            requested_at: now,
        });
        self.enter(next, now);
        Ok(())
    }

    /// Marks the order completed. Crediting the freelancer is the caller's
    /// job and must be committed together with this record.
    pub fn approve(&mut self, caller: &UserId, now: DateTime<Utc>) -> Result<()> {
        let next = self.next_status(caller, OrderAction::Approve)?;
        self.enter(next, now);
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn cancel(&mut self, caller: &UserId, reason: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        let next = self.next_status(caller, OrderAction::Cancel)?;
        self.cancellation_reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        self.enter(next, now);
        Ok(())
    }

    /// Records a file reference on the caller's side of the order.
    pub fn attach(&mut self, caller: &UserId, file_ref: &str) -> Result<()> {
        let role = self.require_role(caller, "attach files to")?;
        if self.status.is_terminal() {
            return Err(EngineError::invalid_state("order", self.status, "attach files to"));
        }
        let file_ref = file_ref.trim();
        if file_ref.is_empty() {
            return Err(EngineError::ValidationError(
                "file reference must not be empty".to_string(),
            ));
        }
        let files = match role {
            Role::Client => &mut self.attachments.client_files,
            Role::Freelancer => &mut self.attachments.freelancer_files,
        };
        files.push(file_ref.to_string());
        Ok(())
    }

    /// Links a review; the only change allowed once the order is completed.
    pub fn link_review(&mut self, caller: &UserId, review_id: &str) -> Result<()> {
        if self.require_role(caller, "review")? != Role::Client {
            return Err(EngineError::InvalidActor {
                caller: caller.to_string(),
                action: "review",
            });
        }
        if self.status != OrderStatus::Completed || self.review_id.is_some() {
            return Err(EngineError::invalid_state("order", self.status, "review"));
        }
        if review_id.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "review id must not be empty".to_string(),
            ));
        }
        self.review_id = Some(review_id.trim().to_string());
        Ok(())
    }
}
