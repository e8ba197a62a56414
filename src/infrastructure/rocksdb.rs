use super::check_version;
use crate::domain::account::{WalletAccount, WalletSnapshot};
use crate::domain::ids::{OrderId, UserId, WithdrawalId};
use crate::domain::order::Order;
use crate::domain::ports::{LedgerBatch, LedgerStore};
use crate::domain::withdrawal::{WithdrawalRequest, WithdrawalStatus};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for order records.
pub const CF_ORDERS: &str = "orders";
/// Column Family for wallet accounts.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for withdrawal requests.
pub const CF_WITHDRAWALS: &str = "withdrawals";
/// Index of pending requests keyed by `auto_complete_at` millis (big-endian)
/// followed by the request id.
pub const CF_WITHDRAWALS_DUE: &str = "withdrawals_due";
/// Index of requests keyed by `freelancer_id 0x00 request_id`.
pub const CF_WITHDRAWALS_BY_FREELANCER: &str = "withdrawals_by_freelancer";

/// A persistent ledger store implementation using RocksDB.
///
/// Records are stored as JSON in their own column families, next to two
/// index families that serve the settlement range query and the per-wallet
/// lookup. A commit is a single `WriteBatch`; the version check that
/// precedes it runs under `commit_lock`, so check and write are atomic with
/// respect to every other commit through this handle.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbLedgerStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| EngineError::internal(format!("Serialization error: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| EngineError::internal(format!("Deserialization error: {e}")))
}

fn due_key(request: &WithdrawalRequest) -> Vec<u8> {
    let millis = request.auto_complete_at.timestamp_millis().max(0) as u64;
    let mut key = millis.to_be_bytes().to_vec();
    key.extend_from_slice(request.request_id.as_str().as_bytes());
    key
}

fn freelancer_prefix(freelancer_id: &UserId) -> Vec<u8> {
    let mut prefix = freelancer_id.as_str().as_bytes().to_vec();
    prefix.push(0);
    prefix
}

fn freelancer_key(request: &WithdrawalRequest) -> Vec<u8> {
    let mut key = freelancer_prefix(&request.freelancer_id);
    key.extend_from_slice(request.request_id.as_str().as_bytes());
    key
}

impl RocksDbLedgerStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [
            CF_ORDERS,
            CF_ACCOUNTS,
            CF_WITHDRAWALS,
            CF_WITHDRAWALS_DUE,
            CF_WITHDRAWALS_BY_FREELANCER,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| EngineError::internal(format!("{name} column family not found")))
    }

    fn read<T: DeserializeOwned>(&self, family: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn stored_version<T: DeserializeOwned>(
        &self,
        family: &str,
        key: &[u8],
        version_of: impl Fn(&T) -> u64,
    ) -> Result<Option<u64>> {
        Ok(self.read::<T>(family, key)?.map(|record| version_of(&record)))
    }
}

#[async_trait]
impl LedgerStore for RocksDbLedgerStore {
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.read(CF_ORDERS, order_id.as_str().as_bytes())
    }

    async fn get_withdrawal(&self, request_id: &WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        self.read(CF_WITHDRAWALS, request_id.as_str().as_bytes())
    }

    async fn wallet_snapshot(&self, freelancer_id: &UserId) -> Result<WalletSnapshot> {
        let accounts = self.cf(CF_ACCOUNTS)?;
        let withdrawals = self.cf(CF_WITHDRAWALS)?;
        let by_freelancer = self.cf(CF_WITHDRAWALS_BY_FREELANCER)?;
        let snapshot = self.db.snapshot();

        let account = match snapshot.get_cf(accounts, freelancer_id.as_str().as_bytes())? {
            Some(bytes) => decode(&bytes)?,
            None => WalletAccount::new(freelancer_id.clone()),
        };

        let prefix = freelancer_prefix(freelancer_id);
        let mut requests = Vec::new();
        let iter = snapshot.iterator_cf(by_freelancer, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            let (key, request_id) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let bytes = snapshot.get_cf(withdrawals, &request_id)?.ok_or_else(|| {
                EngineError::internal("freelancer index points at a missing withdrawal")
            })?;
            requests.push(decode::<WithdrawalRequest>(&bytes)?);
        }

        Ok(WalletSnapshot {
            account,
            withdrawals: requests,
        })
    }

    async fn due_withdrawals(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<WithdrawalRequest>> {
        let due_index = self.cf(CF_WITHDRAWALS_DUE)?;
        let cutoff = now.timestamp_millis().max(0) as u64;

        let mut due = Vec::new();
        for item in self.db.iterator_cf(due_index, IteratorMode::Start) {
            if due.len() >= limit {
                break;
            }
            let (key, request_id) = item?;
            let millis_bytes: [u8; 8] = key
                .get(..8)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| EngineError::internal("malformed due index key"))?;
            if u64::from_be_bytes(millis_bytes) > cutoff {
                break;
            }
            let request: Option<WithdrawalRequest> = self.read(CF_WITHDRAWALS, &request_id)?;
            if let Some(request) = request
                && request.is_due(now)
            {
                due.push(request);
            }
        }
        Ok(due)
    }

    async fn wallet_ids(&self) -> Result<Vec<UserId>> {
        let accounts = self.cf(CF_ACCOUNTS)?;
        let mut ids = Vec::new();
        for item in self.db.iterator_cf(accounts, IteratorMode::Start) {
            let (key, _) = item?;
            let id = String::from_utf8(key.to_vec())
                .map_err(|e| EngineError::internal(format!("non-utf8 account key: {e}")))?;
            ids.push(UserId::from(id));
        }
        Ok(ids)
    }

    async fn commit(&self, batch: LedgerBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let _guard = self.commit_lock.lock().await;

        let orders = self.cf(CF_ORDERS)?;
        let accounts = self.cf(CF_ACCOUNTS)?;
        let withdrawals = self.cf(CF_WITHDRAWALS)?;
        let due_index = self.cf(CF_WITHDRAWALS_DUE)?;
        let by_freelancer = self.cf(CF_WITHDRAWALS_BY_FREELANCER)?;

        let mut write = WriteBatch::default();

        for order in batch.orders {
            let key = order.order_id.as_str().as_bytes().to_vec();
            let stored = self.stored_version(CF_ORDERS, &key, |o: &Order| o.version)?;
            check_version("order", &order.order_id, stored, order.version)?;
            let mut order = order;
            order.version += 1;
            write.put_cf(orders, key, encode(&order)?);
        }

        for account in batch.accounts {
            let key = account.freelancer_id.as_str().as_bytes().to_vec();
            let stored = self.stored_version(CF_ACCOUNTS, &key, |a: &WalletAccount| a.version)?;
            check_version("account", &account.freelancer_id, stored, account.version)?;
            let mut account = account;
            account.version += 1;
            write.put_cf(accounts, key, encode(&account)?);
        }

        for request in batch.withdrawals {
            let key = request.request_id.as_str().as_bytes().to_vec();
            let previous: Option<WithdrawalRequest> = self.read(CF_WITHDRAWALS, &key)?;
            check_version(
                "withdrawal",
                &request.request_id,
                previous.as_ref().map(|p| p.version),
                request.version,
            )?;

            if let Some(previous) = &previous
                && previous.status == WithdrawalStatus::Pending
            {
                write.delete_cf(due_index, due_key(previous));
            }
            if request.status == WithdrawalStatus::Pending {
                write.put_cf(due_index, due_key(&request), &key);
            }
            write.put_cf(by_freelancer, freelancer_key(&request), &key);

            let mut request = request;
            request.version += 1;
            write.put_cf(withdrawals, &key, encode(&request)?);
        }

        self.db.write(write)?;
        Ok(())
    }
}
