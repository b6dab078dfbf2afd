//! Wishlist repository.
//!
//! A wishlist is a set: adding a saved product or removing an absent one
//! succeeds without changing anything.

use sqlx::PgPool;

use loam_core::{ProductId, UserId};

use super::RepositoryError;
use super::products::{PRODUCT_COLUMNS, ProductRow};
use crate::models::Product;

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Saved products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM (
                SELECT p.*, w.created_at AS saved_at
                FROM storefront.wishlist_item w
                JOIN storefront.product p ON p.id = w.product_id
                WHERE w.user_id = $1
            ) AS saved
            ORDER BY saved_at, id
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Save a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.wishlist_item (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.wishlist_item WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
