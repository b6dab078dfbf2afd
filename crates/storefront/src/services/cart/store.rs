//! Persistence seam for the cart.
//!
//! The two write primitives that can grow a line are conditional: the store
//! applies them only when the result stays within the product's stock, and
//! evaluates that bound in the same atomic step as the write. Callers get a
//! [`LineWrite`] describing what happened instead of an error, so a lost race
//! can be re-planned.

use std::future::Future;

use loam_core::{ProductId, Quantity, UserId};

use crate::db::RepositoryError;
use crate::models::{CartProduct, ResolvedCartLine};

/// Outcome of a conditional cart-line write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineWrite {
    /// The write happened; the line now holds this quantity.
    Applied(Quantity),
    /// The result would exceed stock. `in_cart` is the line's quantity when
    /// one exists.
    ExceedsStock {
        in_cart: Option<Quantity>,
        stock: u32,
    },
    /// A line exists that the write did not expect: an insert found one, or
    /// the line changed underneath an increment. Re-read it and re-plan.
    LineExists,
    /// Update refused: there is no line for this product.
    LineMissing,
    /// The product does not exist.
    ProductMissing,
}

/// Storage for products (read-only here) and cart lines.
///
/// Every method is individually atomic. No method spans more than one
/// statement's worth of consistency.
pub trait CartStore: Send + Sync {
    /// Load a product's display fields and current stock.
    fn find_product(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Option<CartProduct>, RepositoryError>> + Send;

    /// Quantity of the user's line for a product, if any.
    fn find_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Option<Quantity>, RepositoryError>> + Send;

    /// Insert a line when none exists and `stock >= quantity`.
    fn insert_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<LineWrite, RepositoryError>> + Send;

    /// Add `by` to an existing line when `quantity + by <= stock`.
    fn increment_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        by: Quantity,
    ) -> impl Future<Output = Result<LineWrite, RepositoryError>> + Send;

    /// Overwrite an existing line's quantity. No stock bound.
    fn set_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<LineWrite, RepositoryError>> + Send;

    /// Delete the user's line for a product. Absent lines are not an error.
    fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete all of the user's lines.
    fn clear_lines(&self, user_id: UserId)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// The user's lines in insertion order, products resolved.
    fn lines(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<ResolvedCartLine>, RepositoryError>> + Send;
}
