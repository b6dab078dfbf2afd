//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Quantity;

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Apply a percentage discount.
    ///
    /// The percentage is clamped to `0..=100` and the result is rounded to
    /// cents.
    #[must_use]
    pub fn discounted(self, percent: Decimal) -> Self {
        let hundred = Decimal::ONE_HUNDRED;
        let percent = percent.clamp(Decimal::ZERO, hundred);
        let amount = (self.amount * (hundred - percent) / hundred).round_dp(2);
        Self::new(amount, self.currency_code)
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self::new(
            self.amount * Decimal::from(quantity.get()),
            self.currency_code,
        )
    }

    /// Add two prices of the same currency.
    ///
    /// Returns `None` when the currencies differ.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        (self.currency_code == other.currency_code)
            .then(|| Self::new(self.amount + other.amount, self.currency_code))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    INR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::INR => "₹",
        }
    }
}
