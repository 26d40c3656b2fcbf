//! Line-item quantities.
//!
//! Cart clients send integers either as JSON numbers or as numeric strings
//! (`"quantity": "2"`), so parsing goes through [`parse_integer`] before the
//! range checks of [`Quantity`] and [`QuantityDelta`] apply.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors that can occur when reading a quantity from client input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The value is not an integer (or a string holding one).
    #[error("quantity must be an integer")]
    NotInteger,
    /// An absolute quantity must be at least one.
    #[error("quantity must be greater than 0")]
    NotPositive,
    /// A quantity adjustment of zero is meaningless.
    #[error("quantity change cannot be 0")]
    ZeroDelta,
    /// The value does not fit the quantity range.
    #[error("quantity is out of range")]
    OutOfRange,
}

/// Read an integer from a loosely typed JSON value.
///
/// Accepts integral numbers and strings that parse as `i64` after trimming.
/// Floats with a fractional part, booleans, arrays, and objects are rejected.
///
/// ```
/// use novel_cart_core::parse_integer;
/// use serde_json::json;
///
/// assert_eq!(parse_integer(&json!(3)), Some(3));
/// assert_eq!(parse_integer(&json!(" -2 ")), Some(-2));
/// assert_eq!(parse_integer(&json!("two")), None);
/// assert_eq!(parse_integer(&json!(1.5)), None);
/// ```
#[must_use]
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A positive number of copies of one novel in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A single copy.
    pub const ONE: Self = Self(1);

    /// Create a quantity, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` for zero.
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError::NotPositive);
        }
        Ok(Self(value))
    }

    /// Parse a quantity from client JSON.
    ///
    /// # Errors
    ///
    /// Returns `NotInteger` for non-integral input, `NotPositive` for values
    /// below one, and `OutOfRange` for values beyond `u32`.
    pub fn from_json(value: &Value) -> Result<Self, QuantityError> {
        let raw = parse_integer(value).ok_or(QuantityError::NotInteger)?;
        if raw <= 0 {
            return Err(QuantityError::NotPositive);
        }
        let raw = u32::try_from(raw).map_err(|_| QuantityError::OutOfRange)?;
        Self::new(raw)
    }

    /// The raw count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Apply a signed adjustment.
    ///
    /// Returns `Ok(None)` when the result drops to zero or below, meaning the
    /// line should be removed rather than stored.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::OutOfRange` if the result exceeds `u32::MAX`.
    pub fn adjust(self, delta: QuantityDelta) -> Result<Option<Self>, QuantityError> {
        let next = i64::from(self.0).saturating_add(delta.get());
        if next <= 0 {
            return Ok(None);
        }
        u32::try_from(next)
            .map(|q| Some(Self(q)))
            .map_err(|_| QuantityError::OutOfRange)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A nonzero signed change to a line quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantityDelta(i64);

impl QuantityDelta {
    /// Create a delta, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::ZeroDelta` for zero.
    pub const fn new(value: i64) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError::ZeroDelta);
        }
        Ok(Self(value))
    }

    /// Parse a delta from client JSON.
    ///
    /// # Errors
    ///
    /// Returns `NotInteger` for non-integral input and `ZeroDelta` for zero.
    pub fn from_json(value: &Value) -> Result<Self, QuantityError> {
        let raw = parse_integer(value).ok_or(QuantityError::NotInteger)?;
        Self::new(raw)
    }

    /// The raw signed change.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}
