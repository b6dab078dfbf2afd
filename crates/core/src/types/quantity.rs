//! Cart line quantities.
//!
//! A [`Quantity`] is always at least one. A cart line whose quantity would
//! drop to zero is removed instead.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative.
    #[error("quantity must be at least 1 (got {0})")]
    NotPositive(i64),
    /// Larger than the store can hold.
    #[error("quantity must be at most {max} (got {got})")]
    TooLarge {
        /// Maximum allowed quantity.
        max: u32,
        /// The rejected value.
        got: i64,
    },
}

/// A positive unit count.
///
/// Bounded by `i32::MAX` so it always fits the `INTEGER` column it is
/// stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(1);

    /// Largest representable quantity.
    pub const MAX: u32 = i32::MAX.unsigned_abs();

    /// Create a quantity, returning `None` for zero or values above [`Self::MAX`].
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 || value > Self::MAX {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Coerce any requested amount into a valid quantity: `max(1, value)`,
    /// saturating at [`Self::MAX`].
    ///
    /// ```
    /// use loam_core::Quantity;
    ///
    /// assert_eq!(Quantity::at_least_one(0).get(), 1);
    /// assert_eq!(Quantity::at_least_one(-5).get(), 1);
    /// assert_eq!(Quantity::at_least_one(3).get(), 3);
    /// ```
    #[must_use]
    pub fn at_least_one(value: i64) -> Self {
        let clamped = value.clamp(1, i64::from(Self::MAX));
        Self(u32::try_from(clamped).unwrap_or(Self::MAX))
    }

    /// The unit count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The unit count as stored in the database.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }

    /// Add two quantities, returning `None` on overflow past [`Self::MAX`].
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).and_then(Self::new)
    }

    /// Whether `stock` units are enough to cover this quantity.
    #[must_use]
    pub const fn fits_within(self, stock: u32) -> bool {
        self.0 <= stock
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 1 {
            return Err(QuantityError::NotPositive(value));
        }
        u32::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(QuantityError::TooLarge {
                max: Self::MAX,
                got: value,
            })
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_at_least_one_floors_and_saturates() {
        assert_eq!(Quantity::at_least_one(i64::MIN), Quantity::ONE);
        assert_eq!(Quantity::at_least_one(1).get(), 1);
        assert_eq!(Quantity::at_least_one(i64::MAX).get(), Quantity::MAX);
    }

    #[test]
    fn test_new_rejects_zero_and_overflow() {
        assert!(Quantity::new(0).is_none());
        assert!(Quantity::new(Quantity::MAX + 1).is_none());
        assert_eq!(Quantity::new(12).unwrap().get(), 12);
    }

    #[test]
    fn test_try_from_i32() {
        assert_eq!(Quantity::try_from(5_i32).unwrap().get(), 5);
        assert_eq!(
            Quantity::try_from(0_i32),
            Err(QuantityError::NotPositive(0))
        );
    }

    #[test]
    fn test_checked_add() {
        let three = Quantity::new(3).unwrap();
        assert_eq!(three.checked_add(three).unwrap().get(), 6);

        let max = Quantity::new(Quantity::MAX).unwrap();
        assert!(max.checked_add(Quantity::ONE).is_none());
    }

    #[test]
    fn test_fits_within() {
        let five = Quantity::new(5).unwrap();
        assert!(five.fits_within(5));
        assert!(!five.fits_within(4));
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert!(serde_json::from_str::<Quantity>("-2").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("2").unwrap().get(), 2);
    }
}
