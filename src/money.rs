//! Money

use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while constructing monetary amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// The supplied value was negative.
    #[error("monetary amounts cannot be negative")]
    Negative,
}

/// A non-negative monetary amount in minor units (pence/cents).
///
/// Wraps a fixed-point decimal so cart arithmetic is exact; binary floating
/// point would drift at the cent level under repeated addition.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates an amount from a value in minor units.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] if `value` is negative.
    pub fn from_minor(value: i64) -> Result<Self, MoneyError> {
        if value < 0 {
            return Err(MoneyError::Negative);
        }

        Ok(Amount(Decimal::from(value)))
    }

    /// Subtracts `other`, clamping at zero rather than going negative.
    #[must_use]
    pub fn saturating_sub(self, other: Amount) -> Amount {
        if other.0 >= self.0 {
            Amount::ZERO
        } else {
            Amount(self.0 - other.0)
        }
    }

    /// Multiplies the amount by a whole quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Amount {
        Amount(self.0 * Decimal::from(quantity))
    }

    /// Whether this is the zero amount.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The underlying decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
