use super::ids::{OrderId, UserId};
use super::money::Balance;
use super::withdrawal::WithdrawalRequest;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The authoritative facts of one freelancer's wallet.
///
/// Only the two monotonic totals are stored. Pending and available balances
/// are derived from these plus the live withdrawal requests every time they
/// are read; see [`WalletSnapshot::summary`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct WalletAccount {
    pub freelancer_id: UserId,
    /// Sum of earnings from completed orders.
    pub total_earnings: Balance,
    /// Sum of amounts (including admin fees) from completed withdrawals.
    pub total_withdrawn_completed: Balance,
    /// Orders already credited; the dedupe key for [`WalletAccount::credit`].
    pub credited_orders: BTreeSet<OrderId>,
    pub version: u64,
}

impl WalletAccount {
    pub fn new(freelancer_id: UserId) -> Self {
        Self {
            freelancer_id,
            total_earnings: Balance::ZERO,
            total_withdrawn_completed: Balance::ZERO,
            credited_orders: BTreeSet::new(),
            version: 0,
        }
    }

    /// Credits earnings for a completed order. Returns `false` without
    /// changing anything when `order_id` was already credited.
    pub fn credit(&mut self, order_id: &OrderId, amount: Balance) -> Result<bool> {
        if amount.is_negative() {
            return Err(EngineError::ValidationError(
                "credited earnings must not be negative".to_string(),
            ));
        }
        if self.credited_orders.contains(order_id) {
            return Ok(false);
        }
        self.total_earnings = self.total_earnings.checked_add(amount)?;
        self.credited_orders.insert(order_id.clone());
        Ok(true)
    }

    /// Permanently consumes a settled withdrawal's reservation.
    pub fn record_settlement(&mut self, settled: &WithdrawalRequest) -> Result<()> {
        self.total_withdrawn_completed = self
            .total_withdrawn_completed
            .checked_add(settled.reserved())?;
        Ok(())
    }
}

/// The four observable wallet quantities, all from one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletSummary {
    pub total_earnings: Balance,
    pub wallet_balance: Balance,
    pub pending_withdrawal: Balance,
    pub available_balance: Balance,
}

/// An account together with all of its withdrawal requests, read at once.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletSnapshot {
    pub account: WalletAccount,
    pub withdrawals: Vec<WithdrawalRequest>,
}

impl WalletSnapshot {
    pub fn empty(freelancer_id: UserId) -> Self {
        Self {
            account: WalletAccount::new(freelancer_id),
            withdrawals: Vec::new(),
        }
    }

    pub fn pending_withdrawal(&self) -> Balance {
        self.withdrawals
            .iter()
            .filter(|w| w.status.is_reserved())
            .map(WithdrawalRequest::reserved)
            .sum()
    }

    pub fn summary(&self) -> WalletSummary {
        let pending = self.pending_withdrawal();
        let wallet_balance = self.account.total_earnings - self.account.total_withdrawn_completed;
        WalletSummary {
            total_earnings: self.account.total_earnings,
            wallet_balance,
            pending_withdrawal: pending,
            available_balance: wallet_balance - pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::WithdrawalId;
    use crate::domain::money::Amount;
    use crate::domain::withdrawal::{Completion, Destination};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn withdrawal(id: &str, amount: rust_decimal::Decimal) -> WithdrawalRequest {
        WithdrawalRequest::open(
            WithdrawalId::from(id),
            UserId::from("f"),
            Amount::new(amount).unwrap(),
            Balance::new(dec!(7000)),
            Destination {
                bank_name: "BNI".to_string(),
                account_number: "42".to_string(),
                account_holder: "F".to_string(),
            },
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Duration::hours(24),
        )
        .unwrap()
    }

    #[test]
    fn test_credit_is_idempotent_per_order() {
        let mut account = WalletAccount::new(UserId::from("f"));
        let order = OrderId::from("o-1");
        assert!(account.credit(&order, Balance::new(dec!(500000))).unwrap());
        assert!(!account.credit(&order, Balance::new(dec!(500000))).unwrap());
        assert_eq!(account.total_earnings, Balance::new(dec!(500000)));
    }

    #[test]
    fn test_credit_overflow_leaves_account_untouched() {
        let mut account = WalletAccount::new(UserId::from("f"));
        account.total_earnings = Balance::new(rust_decimal::Decimal::MAX);
        let before = account.clone();

        let result = account.credit(&OrderId::from("o-big"), Balance::new(dec!(1)));
        assert!(matches!(result, Err(EngineError::ValidationError(_))));
        assert_eq!(account, before);
    }

    #[test]
    fn test_summary_identity() {
        let mut snapshot = WalletSnapshot::empty(UserId::from("f"));
        snapshot
            .account
            .credit(&OrderId::from("o-1"), Balance::new(dec!(500000)))
            .unwrap();
        snapshot.withdrawals.push(withdrawal("w-1", dec!(200000)));

        let summary = snapshot.summary();
        assert_eq!(summary.total_earnings, Balance::new(dec!(500000)));
        assert_eq!(summary.pending_withdrawal, Balance::new(dec!(207000)));
        assert_eq!(summary.available_balance, Balance::new(dec!(293000)));
        assert_eq!(summary.wallet_balance, Balance::new(dec!(500000)));
    }

    #[test]
    fn test_settlement_moves_reservation_into_withdrawn() {
        let mut snapshot = WalletSnapshot::empty(UserId::from("f"));
        snapshot
            .account
            .credit(&OrderId::from("o-1"), Balance::new(dec!(500000)))
            .unwrap();
        let mut req = withdrawal("w-1", dec!(200000));
        req.complete(Completion::Manual, req.created_at).unwrap();
        snapshot.account.record_settlement(&req).unwrap();
        snapshot.withdrawals.push(req);

        let summary = snapshot.summary();
        assert_eq!(summary.pending_withdrawal, Balance::ZERO);
        assert_eq!(summary.available_balance, Balance::new(dec!(293000)));
        assert_eq!(summary.wallet_balance, Balance::new(dec!(293000)));
    }

    #[test]
    fn test_rejected_requests_release_reservation() {
        let mut snapshot = WalletSnapshot::empty(UserId::from("f"));
        let mut req = withdrawal("w-1", dec!(100000));
        req.cancel("no longer needed", req.created_at).unwrap();
        snapshot.withdrawals.push(req);
        assert_eq!(snapshot.pending_withdrawal(), Balance::ZERO);
    }
}
