use crate::error::EngineError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Largest amount a caller may supply, in minor units. Keeps every fee and
/// total derived from caller amounts well inside `Decimal`'s range.
pub const MAX_MINOR_UNITS: Decimal = dec!(1000000000000000000);

/// A ledger quantity in minor units of the single ledger currency.
///
/// Balances may be compared and combined freely; whether a balance is allowed
/// to go negative is decided by the ledger operation, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// A strictly positive amount of whole minor units, as supplied by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value <= Decimal::ZERO {
            return Err(EngineError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if !value.fract().is_zero() {
            return Err(EngineError::ValidationError(format!(
                "Amount {value} is not a whole number of minor units"
            )));
        }
        if value > MAX_MINOR_UNITS {
            return Err(EngineError::ValidationError(format!(
                "Amount {value} exceeds the maximum of {MAX_MINOR_UNITS}"
            )));
        }
        Ok(Self(value.normalize()))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Addition for running totals, which grow without a per-call bound.
    pub fn checked_add(self, rhs: Self) -> Result<Self, EngineError> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(|| {
            EngineError::ValidationError(format!("balance overflow adding {rhs} to {self}"))
        })
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Balance {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10));
        let b2 = Balance::new(dec!(5));
        assert_eq!(b1 + b2, Balance::new(dec!(15)));
        assert_eq!(b1 - b2, Balance::new(dec!(5)));
        assert!((b2 - b1).is_negative());
        assert!(!Balance::ZERO.is_negative());
    }

    #[test]
    fn test_balance_sum() {
        let total: Balance = [dec!(1), dec!(2), dec!(3)]
            .into_iter()
            .map(Balance::new)
            .sum();
        assert_eq!(total, Balance::new(dec!(6)));
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1)).is_ok());
        assert!(Amount::new(dec!(100000.00)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0)),
            Err(EngineError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1)),
            Err(EngineError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(1.5)),
            Err(EngineError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_upper_bound() {
        assert!(Amount::new(MAX_MINOR_UNITS).is_ok());
        assert!(matches!(
            Amount::new(MAX_MINOR_UNITS + dec!(1)),
            Err(EngineError::ValidationError(_))
        ));
        assert!(Amount::new(Decimal::MAX).is_err());
        assert!(serde_json::from_str::<Amount>("\"79228162514264337593543950335\"").is_err());
    }

    #[test]
    fn test_checked_add_reports_overflow() {
        let big = Balance::new(Decimal::MAX);
        assert!(matches!(
            big.checked_add(Balance::new(dec!(1))),
            Err(EngineError::ValidationError(_))
        ));
        assert_eq!(
            Balance::new(dec!(2)).checked_add(Balance::new(dec!(3))).unwrap(),
            Balance::new(dec!(5))
        );
    }

    #[test]
    fn test_amount_deserialization_validates() {
        let ok: Amount = serde_json::from_str("\"500000\"").unwrap();
        assert_eq!(ok.value(), dec!(500000));
        assert!(serde_json::from_str::<Amount>("\"-3\"").is_err());
    }

    #[test]
    fn test_balance_display_is_normalized() {
        assert_eq!(Balance::new(dec!(293000.00)).to_string(), "293000");
    }
}
