//! Product repository: catalog reads and admin writes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use loam_core::{Price, ProductId};

use super::{RepositoryError, non_negative};
use crate::models::{MAX_STOCK, Product, SHOP_CURRENCY};

pub(super) const PRODUCT_COLUMNS: &str = "id, handle, sku, name, description, category, \
                                          price, discount, stock, images, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(super) struct ProductRow {
    id: i32,
    handle: String,
    sku: String,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    discount: Decimal,
    stock: i32,
    images: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            handle: row.handle,
            sku: row.sku,
            name: row.name,
            description: row.description,
            category: row.category,
            price: Price::new(row.price, SHOP_CURRENCY),
            discount: row.discount,
            stock: non_negative(row.stock, "stock")?,
            images: row.images,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields for a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub handle: String,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewProduct {
    /// Check field constraints the database would otherwise reject.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_handle(&self.handle)?;
        if self.sku.trim().is_empty() {
            return Err("sku cannot be empty".to_owned());
        }
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_owned());
        }
        validate_price(self.price)?;
        validate_discount(self.discount)?;
        if self.stock > MAX_STOCK {
            return Err(format!("stock must be at most {MAX_STOCK}"));
        }
        Ok(())
    }
}

/// Partial update of a product. Absent fields are left unchanged.
///
/// Stock is changed through [`ProductRepository::set_stock`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub handle: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub images: Option<Vec<String>>,
}

impl ProductUpdate {
    /// Check the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(handle) = &self.handle {
            validate_handle(handle)?;
        }
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err("name cannot be empty".to_owned());
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(discount) = self.discount {
            validate_discount(discount)?;
        }
        Ok(())
    }
}

fn validate_handle(handle: &str) -> Result<(), String> {
    let valid = !handle.is_empty()
        && handle
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(format!(
            "handle must be lowercase letters, digits and dashes (got {handle:?})"
        ))
    }
}

fn validate_price(price: Decimal) -> Result<(), String> {
    if price.is_sign_negative() {
        return Err("price cannot be negative".to_owned());
    }
    Ok(())
}

fn validate_discount(discount: Decimal) -> Result<(), String> {
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        return Err("discount must be between 0 and 100".to_owned());
    }
    Ok(())
}

fn stock_param(stock: u32) -> i32 {
    i32::try_from(stock).unwrap_or(i32::MAX)
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_handle(&self, handle: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE handle = $1"
        ))
        .bind(handle)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the handle or SKU is taken.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.product
                (handle, sku, name, description, category, price, discount, stock, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&product.handle)
        .bind(product.sku.trim())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.discount)
        .bind(stock_param(product.stock))
        .bind(&product.images)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "handle or sku already exists"))?;

        Product::try_from(row)
    }

    /// Create a product, or overwrite the one with the same SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the handle belongs to another SKU.
    pub async fn upsert_by_sku(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.product
                (handle, sku, name, description, category, price, discount, stock, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (sku) DO UPDATE SET
                handle = EXCLUDED.handle,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                price = EXCLUDED.price,
                discount = EXCLUDED.discount,
                stock = EXCLUDED.stock,
                images = EXCLUDED.images,
                updated_at = NOW()
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&product.handle)
        .bind(product.sku.trim())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.discount)
        .bind(stock_param(product.stock))
        .bind(&product.images)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "handle already exists"))?;

        Product::try_from(row)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new handle is taken.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE storefront.product SET
                handle = COALESCE($2, handle),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                price = COALESCE($6, price),
                discount = COALESCE($7, discount),
                images = COALESCE($8, images),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.handle.as_deref())
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.category.as_deref())
        .bind(update.price)
        .bind(update.discount)
        .bind(update.images.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "handle already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    /// Set the stock count.
    ///
    /// Cart lines above the new count are left as they are; the bound is
    /// enforced when a cart is next added to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_stock(&self, id: ProductId, stock: u32) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE storefront.product
            SET stock = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(stock_param(stock))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    /// Set the stock count of the product with this SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this SKU.
    pub async fn set_stock_by_sku(&self, sku: &str, stock: u32) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE storefront.product
            SET stock = $2, updated_at = NOW()
            WHERE sku = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(sku)
        .bind(stock_param(stock))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    /// Delete a product. Cart and wishlist lines referencing it are removed.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            handle: "kelp-meal-2kg".to_owned(),
            sku: "KELP-2".to_owned(),
            name: "Kelp Meal 2kg".to_owned(),
            description: String::new(),
            category: "amendments".to_owned(),
            price: Decimal::new(1850, 2),
            discount: Decimal::ZERO,
            stock: 40,
            images: Vec::new(),
        }
    }

    #[test]
    fn test_new_product_valid() {
        assert!(new_product().validate().is_ok());
    }

    #[test]
    fn test_new_product_rejects_bad_handle() {
        let mut product = new_product();
        product.handle = "Kelp Meal".to_owned();
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_new_product_rejects_discount_out_of_range() {
        let mut product = new_product();
        product.discount = Decimal::new(101, 0);
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_new_product_rejects_negative_price() {
        let mut product = new_product();
        product.price = Decimal::new(-1, 0);
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_update_validates_present_fields_only() {
        assert!(ProductUpdate::default().validate().is_ok());

        let update = ProductUpdate {
            name: Some("  ".to_owned()),
            ..ProductUpdate::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_new_product_from_yaml_defaults() {
        let product: NewProduct = serde_json::from_str(
            r#"{"handle": "blood-meal", "sku": "BM-1", "name": "Blood Meal", "price": "12.00"}"#,
        )
        .unwrap();
        assert_eq!(product.stock, 0);
        assert!(product.images.is_empty());
        assert_eq!(product.discount, Decimal::ZERO);
    }
}
