//! Escrow arithmetic for order creation.
//!
//! All functions are pure. The breakdown is computed once when an order is
//! created and frozen onto the order record, so later fee policy changes never
//! reach existing orders.
//!
//! The platform fee is a surcharge paid by the client on top of the package
//! price; the freelancer's earnings are the full price.

use super::money::{Amount, Balance};
use crate::error::{EngineError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Platform fee for `price` at `rate`, rounded half-up to whole minor units.
pub fn platform_fee(price: Amount, rate: Decimal) -> Result<Balance> {
    let raw = price.value().checked_mul(rate).ok_or_else(|| {
        EngineError::ValidationError(format!("platform fee overflow for price {price}"))
    })?;
    Ok(Balance::new(raw.round_dp_with_strategy(
        0,
        RoundingStrategy::MidpointAwayFromZero,
    )))
}

pub fn escrow_amount(price: Amount) -> Balance {
    Balance::from(price)
}

pub fn freelancer_earnings(price: Amount) -> Balance {
    Balance::from(price)
}

/// The frozen commercial terms of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowBreakdown {
    pub package_price: Amount,
    pub platform_fee_rate: Decimal,
    pub platform_fee: Balance,
    pub escrow_amount: Balance,
    pub freelancer_earnings: Balance,
    /// What the client is charged at checkout.
    pub client_total: Balance,
}

impl EscrowBreakdown {
    pub fn compute(price: Amount, rate: Decimal) -> Result<Self> {
        let fee = platform_fee(price, rate)?;
        let escrow = escrow_amount(price);
        Ok(Self {
            package_price: price,
            platform_fee_rate: rate,
            platform_fee: fee,
            escrow_amount: escrow,
            freelancer_earnings: freelancer_earnings(price),
            client_total: escrow.checked_add(fee)?,
        })
    }
}
