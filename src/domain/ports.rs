use super::account::{WalletAccount, WalletSnapshot};
use super::events::LedgerEvent;
use super::ids::{OrderId, UserId, WithdrawalId};
use super::order::Order;
use super::withdrawal::WithdrawalRequest;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A set of records to be written atomically.
///
/// Each record carries the version it was read at (0 for a record that must
/// not exist yet). A store applies the batch only if every version still
/// matches, bumping each by one; otherwise nothing is written and the commit
/// fails with `ConcurrencyConflict`.
#[derive(Debug, Clone, Default)]
pub struct LedgerBatch {
    pub orders: Vec<Order>,
    pub accounts: Vec<WalletAccount>,
    pub withdrawals: Vec<WithdrawalRequest>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn account(mut self, account: WalletAccount) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn withdrawal(mut self, request: WithdrawalRequest) -> Self {
        self.withdrawals.push(request);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.accounts.is_empty() && self.withdrawals.is_empty()
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    async fn get_withdrawal(&self, request_id: &WithdrawalId) -> Result<Option<WithdrawalRequest>>;

    /// The freelancer's account (fresh if never written) and every withdrawal
    /// request they own, read from one consistent view.
    async fn wallet_snapshot(&self, freelancer_id: &UserId) -> Result<WalletSnapshot>;

    /// Pending requests whose holding window ended at or before `now`,
    /// oldest deadline first.
    async fn due_withdrawals(&self, now: DateTime<Utc>, limit: usize)
    -> Result<Vec<WithdrawalRequest>>;

    /// Every freelancer that has a wallet account.
    async fn wallet_ids(&self) -> Result<Vec<UserId>>;

    async fn commit(&self, batch: LedgerBatch) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Receives committed ledger events. Must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &LedgerEvent);
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type LedgerStoreFactory = Box<dyn Fn() -> LedgerStoreBox + Send + Sync>;
