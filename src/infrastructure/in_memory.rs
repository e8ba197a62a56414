use super::check_version;
use crate::domain::account::{WalletAccount, WalletSnapshot};
use crate::domain::ids::{OrderId, UserId, WithdrawalId};
use crate::domain::order::Order;
use crate::domain::ports::{LedgerBatch, LedgerStore};
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    accounts: HashMap<UserId, WalletAccount>,
    withdrawals: HashMap<WithdrawalId, WithdrawalRequest>,
}

/// A thread-safe in-memory ledger store.
///
/// All tables sit behind one `RwLock`, so a commit's version check and its
/// writes happen under the same write guard and snapshots see a single
/// point in time. Ideal for tests and for replaying scripts.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(order_id).cloned())
    }

    async fn get_withdrawal(&self, request_id: &WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.withdrawals.get(request_id).cloned())
    }

    async fn wallet_snapshot(&self, freelancer_id: &UserId) -> Result<WalletSnapshot> {
        let tables = self.tables.read().await;
        let account = tables
            .accounts
            .get(freelancer_id)
            .cloned()
            .unwrap_or_else(|| WalletAccount::new(freelancer_id.clone()));
        let withdrawals = tables
            .withdrawals
            .values()
            .filter(|w| w.freelancer_id == *freelancer_id)
            .cloned()
            .collect();
        Ok(WalletSnapshot {
            account,
            withdrawals,
        })
    }

    async fn due_withdrawals(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<WithdrawalRequest>> {
        let tables = self.tables.read().await;
        let mut due: Vec<WithdrawalRequest> = tables
            .withdrawals
            .values()
            .filter(|w| w.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            a.auto_complete_at
                .cmp(&b.auto_complete_at)
                .then_with(|| a.request_id.cmp(&b.request_id))
        });
        due.truncate(limit);
        Ok(due)
    }

    async fn wallet_ids(&self) -> Result<Vec<UserId>> {
        let tables = self.tables.read().await;
        let mut ids: Vec<UserId> = tables.accounts.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn commit(&self, batch: LedgerBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.write().await;

        for order in &batch.orders {
            let stored = tables.orders.get(&order.order_id).map(|o| o.version);
            check_version("order", &order.order_id, stored, order.version)?;
        }
        for account in &batch.accounts {
            let stored = tables.accounts.get(&account.freelancer_id).map(|a| a.version);
            check_version("account", &account.freelancer_id, stored, account.version)?;
        }
        for request in &batch.withdrawals {
            let stored = tables.withdrawals.get(&request.request_id).map(|w| w.version);
            check_version("withdrawal", &request.request_id, stored, request.version)?;
        }

        for mut order in batch.orders {
            order.version += 1;
            tables.orders.insert(order.order_id.clone(), order);
        }
        for mut account in batch.accounts {
            account.version += 1;
            tables.accounts.insert(account.freelancer_id.clone(), account);
        }
        for mut request in batch.withdrawals {
            request.version += 1;
            tables.withdrawals.insert(request.request_id.clone(), request);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Amount, Balance};
    use crate::domain::withdrawal::Destination;
    use crate::error::EngineError;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn request(id: &str, owner: &str, created: DateTime<Utc>) -> WithdrawalRequest {
        WithdrawalRequest::open(
            WithdrawalId::from(id),
            UserId::from(owner),
            Amount::new(dec!(100000)).unwrap(),
            Balance::new(dec!(7000)),
            Destination {
                bank_name: "Mandiri".to_string(),
                account_number: "1".to_string(),
                account_holder: "A".to_string(),
            },
            created,
            Duration::hours(24),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_commit_bumps_versions() {
        let store = InMemoryLedgerStore::new();
        let account = WalletAccount::new(UserId::from("f1"));

        store
            .commit(LedgerBatch::new().account(account.clone()))
            .await
            .unwrap();
        let snapshot = store.wallet_snapshot(&UserId::from("f1")).await.unwrap();
        assert_eq!(snapshot.account.version, 1);
        assert_eq!(store.wallet_ids().await.unwrap(), vec![UserId::from("f1")]);
    }

    #[tokio::test]
    async fn test_stale_version_rejects_whole_batch() {
        let store = InMemoryLedgerStore::new();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let account = WalletAccount::new(UserId::from("f1"));
        store
            .commit(LedgerBatch::new().account(account.clone()))
            .await
            .unwrap();

        // `account` still carries version 0, the store is at 1.
        let result = store
            .commit(
                LedgerBatch::new()
                    .withdrawal(request("w1", "f1", t0))
                    .account(account),
            )
            .await;
        assert!(matches!(result, Err(EngineError::ConcurrencyConflict(_))));
        assert!(store.get_withdrawal(&WithdrawalId::from("w1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_due_withdrawals_range() {
        let store = InMemoryLedgerStore::new();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        store
            .commit(
                LedgerBatch::new()
                    .withdrawal(request("late", "f1", t0 + Duration::hours(2)))
                    .withdrawal(request("early", "f2", t0))
                    .withdrawal(request("future", "f1", t0 + Duration::hours(10))),
            )
            .await
            .unwrap();

        let due = store
            .due_withdrawals(t0 + Duration::hours(26), 10)
            .await
            .unwrap();
        let ids: Vec<&str> = due.iter().map(|w| w.request_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);

        let limited = store
            .due_withdrawals(t0 + Duration::hours(40), 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].request_id.as_str(), "early");
    }

    #[tokio::test]
    async fn test_snapshot_only_contains_owner_requests() {
        let store = InMemoryLedgerStore::new();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        store
            .commit(
                LedgerBatch::new()
                    .withdrawal(request("a", "f1", t0))
                    .withdrawal(request("b", "f2", t0)),
            )
            .await
            .unwrap();
        let snapshot = store.wallet_snapshot(&UserId::from("f1")).await.unwrap();
        assert_eq!(snapshot.withdrawals.len(), 1);
        assert_eq!(snapshot.account.version, 0);
    }
}
