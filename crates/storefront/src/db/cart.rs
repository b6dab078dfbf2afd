//! Postgres-backed cart store.
//!
//! Lines live in `storefront.cart_line`, unique on `(user_id, product_id)`.
//! The stock bound is part of each growing write's `WHERE` clause, so two
//! requests racing on the same line are serialized by the row lock and the
//! loser re-evaluates the bound against the winner's quantity.

use rust_decimal::Decimal;
use sqlx::PgPool;

use loam_core::{Price, ProductId, Quantity, UserId};

use super::{RepositoryError, non_negative};
use crate::models::{CartProduct, ResolvedCartLine, SHOP_CURRENCY};
use crate::services::cart::{CartStore, LineWrite};

#[derive(sqlx::FromRow)]
struct CartProductRow {
    id: i32,
    handle: String,
    name: String,
    price: Decimal,
    discount: Decimal,
    stock: i32,
    image: Option<String>,
}

impl TryFrom<CartProductRow> for CartProduct {
    type Error = RepositoryError;

    fn try_from(row: CartProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            handle: row.handle,
            name: row.name,
            price: Price::new(row.price, SHOP_CURRENCY),
            discount: row.discount,
            stock: non_negative(row.stock, "stock")?,
            image: row.image,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    #[sqlx(flatten)]
    product: CartProductRow,
    quantity: i32,
}

/// Current line quantity and stock, read after a refused write.
#[derive(sqlx::FromRow)]
struct Probe {
    in_cart: Option<i32>,
    stock: i32,
}

fn to_quantity(value: i32) -> Result<Quantity, RepositoryError> {
    Quantity::try_from(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("cart line quantity: {e}")))
}

/// [`CartStore`] over a `PgPool`.
#[derive(Debug, Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a store on a pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn probe(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<(Option<Quantity>, u32)>, RepositoryError> {
        let probe = sqlx::query_as::<_, Probe>(
            r"
            SELECT c.quantity AS in_cart, p.stock
            FROM storefront.product p
            LEFT JOIN storefront.cart_line c
                ON c.product_id = p.id AND c.user_id = $1
            WHERE p.id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        probe
            .map(|p| {
                let in_cart = p.in_cart.map(to_quantity).transpose()?;
                Ok((in_cart, non_negative(p.stock, "stock")?))
            })
            .transpose()
    }
}

impl CartStore for PgCartStore {
    async fn find_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<CartProduct>, RepositoryError> {
        let row = sqlx::query_as::<_, CartProductRow>(
            r"
            SELECT id, handle, name, price, discount, stock, images[1] AS image
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartProduct::try_from).transpose()
    }

    async fn find_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Quantity>, RepositoryError> {
        let row: Option<i32> = sqlx::query_scalar(
            r"
            SELECT quantity FROM storefront.cart_line
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(to_quantity).transpose()
    }

    async fn insert_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<LineWrite, RepositoryError> {
        let inserted: Option<i32> = sqlx::query_scalar(
            r"
            INSERT INTO storefront.cart_line (user_id, product_id, quantity)
            SELECT $1, p.id, $3
            FROM storefront.product p
            WHERE p.id = $2 AND p.stock >= $3
            ON CONFLICT (user_id, product_id) DO NOTHING
            RETURNING quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(applied) = inserted {
            return Ok(LineWrite::Applied(to_quantity(applied)?));
        }

        Ok(match self.probe(user_id, product_id).await? {
            None => LineWrite::ProductMissing,
            Some((Some(_), _)) => LineWrite::LineExists,
            Some((None, stock)) if !quantity.fits_within(stock) => LineWrite::ExceedsStock {
                in_cart: None,
                stock,
            },
            // Line existed at insert time and was removed since.
            Some((None, _)) => LineWrite::LineMissing,
        })
    }

    async fn increment_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        by: Quantity,
    ) -> Result<LineWrite, RepositoryError> {
        let updated: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE storefront.cart_line c
            SET quantity = c.quantity + $3, updated_at = NOW()
            FROM storefront.product p
            WHERE c.user_id = $1
              AND c.product_id = $2
              AND p.id = c.product_id
              AND c.quantity::BIGINT + $3::BIGINT <= p.stock
            RETURNING c.quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(by.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(applied) = updated {
            return Ok(LineWrite::Applied(to_quantity(applied)?));
        }

        Ok(match self.probe(user_id, product_id).await? {
            None => LineWrite::ProductMissing,
            Some((None, _)) => LineWrite::LineMissing,
            Some((Some(in_cart), stock)) => {
                let fits = in_cart.checked_add(by).is_some_and(|t| t.fits_within(stock));
                if fits {
                    // Changed between the update and the probe.
                    LineWrite::LineExists
                } else {
                    LineWrite::ExceedsStock {
                        in_cart: Some(in_cart),
                        stock,
                    }
                }
            }
        })
    }

    async fn set_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<LineWrite, RepositoryError> {
        let updated: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE storefront.cart_line
            SET quantity = $3, updated_at = NOW()
            WHERE user_id = $1 AND product_id = $2
            RETURNING quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(applied) => Ok(LineWrite::Applied(to_quantity(applied)?)),
            None => Ok(LineWrite::LineMissing),
        }
    }

    async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.cart_line WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_lines(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.cart_line WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn lines(&self, user_id: UserId) -> Result<Vec<ResolvedCartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT p.id, p.handle, p.name, p.price, p.discount, p.stock,
                   p.images[1] AS image, c.quantity
            FROM storefront.cart_line c
            JOIN storefront.product p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.id
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ResolvedCartLine {
                    product: CartProduct::try_from(row.product)?,
                    quantity: to_quantity(row.quantity)?,
                })
            })
            .collect()
    }
}
