//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config file.

use crate::domain::money::MAX_MINOR_UNITS;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest holding window a config may ask for: ten years.
pub const MAX_HOLDING_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fraction of the package price charged to the client on top.
    pub platform_fee_rate: Decimal,
    /// Smallest withdrawal a freelancer may request, in minor units.
    pub min_withdrawal: Decimal,
    /// Fixed service charge consumed by every settled withdrawal.
    pub admin_fee: Decimal,
    pub holding_window_secs: u64,
    pub settlement_interval_secs: u64,
    pub settlement_batch_size: usize,
    pub store_timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform_fee_rate: dec!(0.10),
            min_withdrawal: dec!(100000),
            admin_fee: dec!(7000),
            holding_window_secs: 24 * 60 * 60,
            settlement_interval_secs: 60,
            settlement_batch_size: 500,
            store_timeout_ms: 2_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.platform_fee_rate < Decimal::ZERO || self.platform_fee_rate >= Decimal::ONE {
            return Err(EngineError::ValidationError(format!(
                "platform_fee_rate must be in [0, 1), got {}",
                self.platform_fee_rate
            )));
        }
        if self.admin_fee < Decimal::ZERO
            || !self.admin_fee.fract().is_zero()
            || self.admin_fee > MAX_MINOR_UNITS
        {
            return Err(EngineError::ValidationError(format!(
                "admin_fee must be a whole amount between 0 and {MAX_MINOR_UNITS}"
            )));
        }
        if self.min_withdrawal <= Decimal::ZERO || self.min_withdrawal > MAX_MINOR_UNITS {
            return Err(EngineError::ValidationError(format!(
                "min_withdrawal must be positive and at most {MAX_MINOR_UNITS}"
            )));
        }
        if self.holding_window_secs > MAX_HOLDING_WINDOW_SECS {
            return Err(EngineError::ValidationError(format!(
                "holding_window_secs must be at most {MAX_HOLDING_WINDOW_SECS}, got {}",
                self.holding_window_secs
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(EngineError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.store_timeout_ms == 0 || self.settlement_batch_size == 0 {
            return Err(EngineError::ValidationError(
                "store_timeout_ms and settlement_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn holding_window(&self) -> Result<chrono::Duration> {
        seconds(self.holding_window_secs)
    }

    pub fn settlement_interval(&self) -> Duration {
        Duration::from_secs(self.settlement_interval_secs.max(1))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Converts a caller-supplied second count into a `chrono::Duration`,
/// rejecting counts chrono cannot represent.
pub fn seconds(secs: u64) -> Result<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| EngineError::ValidationError(format!("{secs} seconds is out of range")))
}

/// Exponential backoff for retryable store failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 10,
            max_backoff_ms: 250,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32) as i32;
        let delay = self.initial_backoff_ms as f64 * self.multiplier.powi(exp);
        let delay = delay.min(self.max_backoff_ms as f64);
        Duration::from_millis(delay as u64)
    }
}
