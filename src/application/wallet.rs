//! Wallet ledger operations: withdrawals, settlement and reads.
//!
//! Every mutation commits the withdrawal request together with its owner's
//! account record. The account version is what serializes operations on one
//! wallet: two concurrent mutations on the same wallet cannot both commit.

use super::engine::MarketplaceEngine;
use crate::domain::account::{WalletAccount, WalletSummary};
use crate::domain::events::LedgerEvent;
use crate::domain::ids::{UserId, WithdrawalId};
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::LedgerBatch;
use crate::domain::withdrawal::{Completion, Destination, WithdrawalRequest};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use tracing::info;

const CANCELLED_BY_FREELANCER: &str = "Cancelled by freelancer";

impl MarketplaceEngine {
    /// Reserves `amount` plus the admin fee against the available balance and
    /// opens a `pending` request that settles after the holding window.
    pub async fn request_withdrawal(
        &self,
        freelancer_id: &UserId,
        amount: Amount,
        destination: &Destination,
    ) -> Result<WithdrawalRequest> {
        let minimum = self.config().min_withdrawal;
        if amount.value() < minimum {
            return Err(EngineError::ValidationError(format!(
                "minimum withdrawal is {minimum}"
            )));
        }
        destination.validate()?;

        let request_id = &WithdrawalId::generate();
        let request = self
            .retrying("request_withdrawal", move || {
                self.try_request_withdrawal(request_id, freelancer_id, amount, destination)
            })
            .await?;

        info!(
            request_id = %request.request_id,
            freelancer_id = %request.freelancer_id,
            reserved = %request.reserved(),
            auto_complete_at = %request.auto_complete_at,
            "withdrawal requested"
        );
        self.publish(LedgerEvent::WithdrawalRequested {
            request_id: request.request_id.clone(),
            freelancer_id: request.freelancer_id.clone(),
            reserved: request.reserved(),
        });
        Ok(request)
    }

    async fn try_request_withdrawal(
        &self,
        request_id: &WithdrawalId,
        freelancer_id: &UserId,
        amount: Amount,
        destination: &Destination,
    ) -> Result<WithdrawalRequest> {
        let snapshot = self.snapshot(freelancer_id).await?;
        let available = snapshot.summary().available_balance;
        let admin_fee = Balance::new(self.config().admin_fee);
        let needed = Balance::from(amount) + admin_fee;
        if needed > available {
            return Err(EngineError::InsufficientBalance {
                needed: needed.value(),
                available: available.value(),
            });
        }

        let request = WithdrawalRequest::open(
            request_id.clone(),
            freelancer_id.clone(),
            amount,
            admin_fee,
            destination.clone(),
            self.now(),
            self.config().holding_window()?,
        )?;
        self.commit(
            LedgerBatch::new()
                .withdrawal(request.clone())
                .account(snapshot.account),
        )
        .await?;
        Ok(WithdrawalRequest {
            version: request.version + 1,
            ..request
        })
    }

    /// Cancels a still-pending request on behalf of its owner, releasing the
    /// reservation.
    pub async fn cancel_withdrawal(&self, request_id: &WithdrawalId, caller: &UserId) -> Result<()> {
        let request = self
            .update_withdrawal("cancel_withdrawal", request_id, &|request, _, now| {
                if request.freelancer_id != *caller {
                    return Err(EngineError::InvalidActor {
                        caller: caller.to_string(),
                        action: "cancel",
                    });
                }
                request.cancel(CANCELLED_BY_FREELANCER, now)
            })
            .await?;

        self.publish(LedgerEvent::WithdrawalCancelled {
            request_id: request.request_id,
            freelancer_id: request.freelancer_id,
        });
        Ok(())
    }

    /// Takes a pending request into manual review. From here on only an
    /// operator can complete or reject it.
    pub async fn begin_withdrawal_processing(&self, request_id: &WithdrawalId) -> Result<WithdrawalRequest> {
        self.update_withdrawal("begin_withdrawal_processing", request_id, &|request, _, _| {
            request.begin_processing()
        })
        .await
    }

    pub async fn reject_withdrawal(&self, request_id: &WithdrawalId, reason: &str) -> Result<WithdrawalRequest> {
        let request = self
            .update_withdrawal("reject_withdrawal", request_id, &|request, _, now| {
                request.reject(reason, now)
            })
            .await?;

        self.publish(LedgerEvent::WithdrawalRejected {
            request_id: request.request_id.clone(),
            freelancer_id: request.freelancer_id.clone(),
            reason: reason.to_string(),
        });
        Ok(request)
    }

    /// Settles a pending or processing request on operator instruction.
    pub async fn complete_withdrawal(&self, request_id: &WithdrawalId) -> Result<WithdrawalRequest> {
        self.settle(request_id, Completion::Manual).await
    }

    /// Settles a pending request whose holding window has ended. Anything
    /// else (already settled, cancelled, taken into processing, not yet due)
    /// is `InvalidState`.
    pub async fn auto_complete_withdrawal(&self, request_id: &WithdrawalId) -> Result<WithdrawalRequest> {
        self.settle(request_id, Completion::Auto).await
    }

    async fn settle(&self, request_id: &WithdrawalId, completion: Completion) -> Result<WithdrawalRequest> {
        let request = self
            .update_withdrawal("settle_withdrawal", request_id, &|request, account, now| {
                request.complete(completion, now)?;
                account.record_settlement(request)
            })
            .await?;

        self.publish(LedgerEvent::WithdrawalSettled {
            request_id: request.request_id.clone(),
            freelancer_id: request.freelancer_id.clone(),
            amount: request.reserved(),
            auto_completed: request.is_auto_completed,
        });
        Ok(request)
    }

    pub async fn get_wallet_summary(&self, freelancer_id: &UserId) -> Result<WalletSummary> {
        let snapshot = self
            .retrying("get_wallet_summary", move || self.snapshot(freelancer_id))
            .await?;
        Ok(snapshot.summary())
    }

    /// All of the freelancer's withdrawal requests, newest first.
    pub async fn get_withdrawal_history(&self, freelancer_id: &UserId) -> Result<Vec<WithdrawalRequest>> {
        let snapshot = self
            .retrying("get_withdrawal_history", move || self.snapshot(freelancer_id))
            .await?;
        let mut history = snapshot.withdrawals;
        history.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.request_id.cmp(&a.request_id))
        });
        Ok(history)
    }

    async fn update_withdrawal<F>(
        &self,
        operation: &str,
        request_id: &WithdrawalId,
        apply: &F,
    ) -> Result<WithdrawalRequest>
    where
        F: Fn(&mut WithdrawalRequest, &mut WalletAccount, DateTime<Utc>) -> Result<()> + Sync,
    {
        let request = self
            .retrying(operation, move || self.try_update_withdrawal(request_id, apply))
            .await?;
        info!(
            request_id = %request.request_id,
            freelancer_id = %request.freelancer_id,
            status = %request.status,
            operation,
            "withdrawal updated"
        );
        Ok(request)
    }

    async fn try_update_withdrawal<F>(&self, request_id: &WithdrawalId, apply: &F) -> Result<WithdrawalRequest>
    where
        F: Fn(&mut WithdrawalRequest, &mut WalletAccount, DateTime<Utc>) -> Result<()> + Sync,
    {
        let mut request = self.load_withdrawal(request_id).await?;
        let snapshot = self.snapshot(&request.freelancer_id).await?;
        let mut account = snapshot.account;

        apply(&mut request, &mut account, self.now())?;

        self.commit(
            LedgerBatch::new()
                .withdrawal(request.clone())
                .account(account),
        )
        .await?;
        request.version += 1;
        Ok(request)
    }
}
