use super::retry::with_retry;
use crate::config::EngineConfig;
use crate::domain::account::WalletSnapshot;
use crate::domain::events::LedgerEvent;
use crate::domain::ids::{OrderId, UserId, WithdrawalId};
use crate::domain::order::Order;
use crate::domain::ports::{Clock, EventSink, LedgerBatch, LedgerStoreBox};
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;

/// The entry point for every order and wallet operation.
///
/// The engine owns the ledger store and is shared (behind an `Arc`) between
/// request handlers and the settlement scheduler. It holds no balances of its
/// own: each operation reads what it needs, validates, and commits a
/// versioned batch. A lost race surfaces from the store as a conflict and the
/// whole operation is re-run against fresh state.
pub struct MarketplaceEngine {
    store: LedgerStoreBox,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    config: EngineConfig,
}

impl MarketplaceEngine {
    /// Creates a new `MarketplaceEngine`.
    ///
    /// # Arguments
    ///
    /// * `store` - The ledger store holding orders, accounts and withdrawals.
    /// * `clock` - Source of the current time.
    /// * `events` - Sink for committed ledger events.
    /// * `config` - Fees, limits, holding window and retry settings.
    pub fn new(
        store: LedgerStoreBox,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn publish(&self, event: LedgerEvent) {
        self.events.publish(&event);
    }

    pub(crate) async fn retrying<T, F, Fut>(&self, operation: &str, attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retry(&self.config.retry, operation, attempt).await
    }

    /// Bounds a store call by the configured timeout.
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = self.config.store_timeout();
        match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(EngineError::StoreUnavailable(format!(
                "store call exceeded {}ms",
                limit.as_millis()
            ))),
        }
    }

    pub(crate) async fn load_order(&self, order_id: &OrderId) -> Result<Order> {
        self.bounded(self.store.get_order(order_id))
            .await?
            .ok_or_else(|| EngineError::not_found("order", order_id))
    }

    pub(crate) async fn load_withdrawal(&self, request_id: &WithdrawalId) -> Result<WithdrawalRequest> {
        self.bounded(self.store.get_withdrawal(request_id))
            .await?
            .ok_or_else(|| EngineError::not_found("withdrawal", request_id))
    }

    pub(crate) async fn snapshot(&self, freelancer_id: &UserId) -> Result<WalletSnapshot> {
        self.bounded(self.store.wallet_snapshot(freelancer_id)).await
    }

    pub(crate) async fn due(&self, now: DateTime<Utc>) -> Result<Vec<WithdrawalRequest>> {
        let limit = self.config.settlement_batch_size;
        self.bounded(self.store.due_withdrawals(now, limit)).await
    }

    pub(crate) async fn commit(&self, batch: LedgerBatch) -> Result<()> {
        self.bounded(self.store.commit(batch)).await
    }

    /// Every freelancer with a wallet account.
    pub async fn wallet_ids(&self) -> Result<Vec<UserId>> {
        self.retrying("wallet_ids", move || self.bounded(self.store.wallet_ids()))
            .await
    }
}
