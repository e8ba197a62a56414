use crate::domain::account::WalletSummary;
use crate::domain::ids::UserId;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct WalletRow<'a> {
    freelancer: &'a str,
    total_earnings: String,
    wallet_balance: String,
    pending_withdrawal: String,
    available_balance: String,
}

/// Writes wallet summaries as CSV, one row per freelancer.
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_wallets<'a>(
        &mut self,
        wallets: impl IntoIterator<Item = (&'a UserId, &'a WalletSummary)>,
    ) -> Result<()> {
        for (freelancer, summary) in wallets {
            self.writer.serialize(WalletRow {
                freelancer: freelancer.as_str(),
                total_earnings: summary.total_earnings.to_string(),
                wallet_balance: summary.wallet_balance.to_string(),
                pending_withdrawal: summary.pending_withdrawal.to_string(),
                available_balance: summary.available_balance.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
