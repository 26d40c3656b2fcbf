//! Fixed-point money arithmetic for catalog prices and cart totals.
//!
//! All amounts carry exactly two decimal places so that `89` and `89.00`
//! serialize identically (`"89.00"`), matching how prices are stored.

use core::fmt;
use core::iter::Sum;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::Quantity;

/// Number of decimal places every [`Money`] value is normalized to.
pub const MONEY_SCALE: u32 = 2;

/// Errors that can occur when parsing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
}

/// A non-negative monetary amount with two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero, already scaled to two places.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, MONEY_SCALE));

    /// Wrap a decimal, rounding to two places.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        Ok(Self(normalize(amount)))
    }

    /// Build an amount from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), MONEY_SCALE))
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price multiplied by a line quantity.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(normalize(self.0 * Decimal::from(quantity.get())))
    }
}

fn normalize(amount: Decimal) -> Decimal {
    let mut amount = amount.round_dp(MONEY_SCALE);
    amount.rescale(MONEY_SCALE);
    amount
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount =
            Decimal::from_str(s.trim()).map_err(|_| MoneyError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(normalize(iter.map(|m| m.0).sum()))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}
