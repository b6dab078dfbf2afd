//! Catalog product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use loam_core::{CurrencyCode, Price, ProductId};

/// Currency every catalog price is stored in.
pub const SHOP_CURRENCY: CurrencyCode = CurrencyCode::USD;

/// Largest stock count the `INTEGER` column holds.
pub const MAX_STOCK: u32 = i32::MAX.unsigned_abs();

/// A product in the catalog.
///
/// `stock` is the authoritative count of purchasable units. Cart operations
/// read it but never change it.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    /// URL-facing identifier, e.g. `worm-castings-4kg`.
    pub handle: String,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: String,
    /// Unit price before discount.
    pub price: Price,
    /// Percentage off, `0..=100`.
    pub discount: Decimal,
    pub stock: u32,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validate a requested stock count.
///
/// # Errors
///
/// Returns a message when the value is negative or too large.
pub fn validate_stock(stock: i64) -> Result<u32, String> {
    if stock < 0 {
        return Err(format!("stock cannot be negative (got {stock})"));
    }
    u32::try_from(stock)
        .ok()
        .filter(|s| *s <= MAX_STOCK)
        .ok_or_else(|| format!("stock must be at most {MAX_STOCK}"))
}
