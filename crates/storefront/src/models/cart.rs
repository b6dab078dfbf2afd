//! Cart domain types.
//!
//! A cart is the ordered list of a user's [`CartLine`]s. There is at most one
//! line per product and every line holds at least one unit.

use rust_decimal::Decimal;
use serde::Serialize;

use loam_core::{CurrencyCode, Price, ProductId, Quantity};

/// One product in a user's cart, as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Display fields of a product, resolved for a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub handle: String,
    pub name: String,
    pub price: Price,
    pub discount: Decimal,
    /// Current stock. Lines are shown even when this is below the quantity.
    pub stock: u32,
    pub image: Option<String>,
}

impl CartProduct {
    /// Unit price after discount.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        self.price.discounted(self.discount)
    }
}

/// A cart line with its product resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCartLine {
    pub product: CartProduct,
    pub quantity: Quantity,
}

impl ResolvedCartLine {
    /// Discounted unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.unit_price().times(self.quantity)
    }

    /// Whether current stock no longer covers this line.
    #[must_use]
    pub const fn exceeds_stock(&self) -> bool {
        !self.quantity.fits_within(self.product.stock)
    }
}

/// Totals for a resolved cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Sum of line totals, or `None` when lines are priced in different
    /// currencies.
    pub subtotal: Option<Price>,
    /// Total units across all lines.
    pub item_count: u64,
}

impl CartSummary {
    /// Summarize resolved lines.
    #[must_use]
    pub fn of(lines: &[ResolvedCartLine]) -> Self {
        let currency = lines
            .first()
            .map_or_else(CurrencyCode::default, |line| line.product.price.currency_code);
        let subtotal = lines
            .iter()
            .try_fold(Price::zero(currency), |acc, line| {
                acc.checked_add(line.line_total())
            });
        let item_count = lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum();
        Self {
            subtotal,
            item_count,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, cents: i64, discount: i64, quantity: u32, stock: u32) -> ResolvedCartLine {
        ResolvedCartLine {
            product: CartProduct {
                id: ProductId::new(id),
                handle: format!("product-{id}"),
                name: format!("Product {id}"),
                price: Price::new(Decimal::new(cents, 2), CurrencyCode::USD),
                discount: Decimal::new(discount, 0),
                stock,
                image: None,
            },
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    #[test]
    fn test_line_total_applies_discount() {
        // 20.00 at 10% off, 3 units
        let line = line(1, 2000, 10, 3, 10);
        assert_eq!(line.line_total().amount, Decimal::new(5400, 2));
    }

    #[test]
    fn test_summary_totals() {
        let lines = [line(1, 1000, 0, 2, 5), line(2, 550, 0, 1, 5)];
        let summary = CartSummary::of(&lines);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal.unwrap().amount, Decimal::new(2550, 2));
    }

    #[test]
    fn test_empty_summary() {
        let summary = CartSummary::of(&[]);
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.subtotal, Some(Price::zero(CurrencyCode::USD)));
    }

    #[test]
    fn test_exceeds_stock_after_stock_drop() {
        assert!(line(1, 100, 0, 4, 3).exceeds_stock());
        assert!(!line(1, 100, 0, 3, 3).exceeds_stock());
    }
}
