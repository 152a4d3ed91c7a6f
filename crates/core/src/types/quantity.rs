//! Stock quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The input is not a number at all.
    #[error("quantity must be a number")]
    NotANumber,
    /// The input is a number but not a whole one.
    #[error("quantity must be a whole number")]
    NotWhole,
    /// The input is below zero.
    #[error("quantity cannot be negative")]
    Negative,
    /// The input does not fit the stored column.
    #[error("quantity is too large")]
    TooLarge,
}

/// Units in stock. Always a non-negative whole number.
///
/// Form submissions carry the quantity as text; [`Quantity::parse`] is the
/// single place where that text becomes a number.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity that fits a Postgres `INTEGER` column.
    pub const MAX: u32 = i32::MAX as u32;

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::TooLarge`] above [`Quantity::MAX`].
    pub const fn new(units: u32) -> Result<Self, QuantityError> {
        if units > Self::MAX {
            return Err(QuantityError::TooLarge);
        }
        Ok(Self(units))
    }

    /// Parse a quantity from user input.
    ///
    /// # Errors
    ///
    /// Returns an error for non-numeric, fractional, negative or oversized input.
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        let s = s.trim();
        if let Ok(units) = s.parse::<i64>() {
            if units < 0 {
                return Err(QuantityError::Negative);
            }
            let units = u32::try_from(units).map_err(|_| QuantityError::TooLarge)?;
            return Self::new(units);
        }
        // "3.0" and "1e3" are whole numbers written as decimals.
        match s.parse::<f64>() {
            Ok(value) if !value.is_finite() => Err(QuantityError::NotANumber),
            Ok(value) if value < 0.0 => Err(QuantityError::Negative),
            Ok(value) if value.fract() != 0.0 => Err(QuantityError::NotWhole),
            Ok(value) if value > f64::from(Self::MAX) => Err(QuantityError::TooLarge),
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // whole, 0..=MAX
            Ok(value) => Self::new(value as u32),
            Err(_) => Err(QuantityError::NotANumber),
        }
    }

    /// Units as `u32`.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Units as `i32`, for storage.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // bounded by Self::MAX
    pub const fn as_i32(&self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(units: i32) -> Result<Self, Self::Error> {
        u32::try_from(units)
            .map(Self)
            .map_err(|_| QuantityError::Negative)
    }
}
