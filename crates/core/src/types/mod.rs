//! Core types for Novel Cart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod quantity;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{MONEY_SCALE, Money, MoneyError};
pub use quantity::{Quantity, QuantityDelta, QuantityError, parse_integer};
