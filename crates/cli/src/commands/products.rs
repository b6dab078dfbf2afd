//! Catalog commands.
//!
//! # Catalog file
//!
//! ```yaml
//! products:
//!   - handle: kelp-meal-5lb
//!     sku: KELP-5LB
//!     name: Kelp Meal 5 lb
//!     category: amendments
//!     price: "18.50"
//!     stock: 40
//!     images:
//!       - https://cdn.example.com/kelp-meal.jpg
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use loam_storefront::db::{NewProduct, ProductRepository};
use loam_storefront::models::validate_stock;

use super::{CliError, connect};

#[derive(Debug, Deserialize)]
struct Catalog {
    products: Vec<NewProduct>,
}

/// Parse and validate a catalog document.
fn parse_catalog(content: &str) -> Result<Vec<NewProduct>, CliError> {
    let catalog: Catalog = serde_yaml::from_str(content)?;

    let mut skus = HashSet::new();
    for product in &catalog.products {
        product
            .validate()
            .map_err(|e| CliError::Invalid(format!("{}: {e}", product.sku)))?;
        if !skus.insert(product.sku.trim()) {
            return Err(CliError::Invalid(format!(
                "duplicate sku in file: {}",
                product.sku
            )));
        }
    }

    Ok(catalog.products)
}

/// Create or update every product in a catalog file.
///
/// The whole file is validated before anything is written.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or a write fails.
pub async fn import(path: &Path) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let products = parse_catalog(&content)?;
    tracing::info!(count = products.len(), "Parsed catalog");

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);
    for product in &products {
        let saved = repo.upsert_by_sku(product).await?;
        tracing::info!(id = %saved.id, sku = %saved.sku, stock = saved.stock, "Saved product");
    }

    tracing::info!(count = products.len(), "Catalog import complete");
    Ok(())
}

/// Set a product's stock by SKU.
///
/// # Errors
///
/// Returns `CliError::Invalid` for a negative count, or an error if no
/// product has this SKU.
pub async fn set_stock(sku: &str, stock: i64) -> Result<(), CliError> {
    let stock = validate_stock(stock).map_err(CliError::Invalid)?;

    let pool = connect().await?;
    let product = ProductRepository::new(&pool)
        .set_stock_by_sku(sku, stock)
        .await?;

    tracing::info!(id = %product.id, sku, stock, "Stock updated");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
products:
  - handle: kelp-meal-5lb
    sku: KELP-5LB
    name: Kelp Meal 5 lb
    price: "18.50"
    stock: 40
  - handle: bone-meal-3lb
    sku: BONE-3LB
    name: Bone Meal 3 lb
    category: amendments
    price: "12.00"
    discount: "10"
"#;

    #[test]
    fn test_parse_catalog() {
        let products = parse_catalog(CATALOG).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].stock, 40);
        assert_eq!(products[1].stock, 0);
        assert_eq!(products[1].category, "amendments");
    }

    #[test]
    fn test_parse_catalog_rejects_duplicate_sku() {
        let doubled = format!("{CATALOG}{}", CATALOG.replace("products:\n", ""));
        assert!(matches!(
            parse_catalog(&doubled),
            Err(CliError::Invalid(msg)) if msg.contains("duplicate sku")
        ));
    }

    #[test]
    fn test_parse_catalog_rejects_bad_handle() {
        let bad = CATALOG.replace("kelp-meal-5lb", "Kelp Meal");
        assert!(matches!(parse_catalog(&bad), Err(CliError::Invalid(_))));
    }

    #[test]
    fn test_parse_catalog_rejects_negative_stock() {
        let bad = CATALOG.replace("stock: 40", "stock: -1");
        assert!(matches!(parse_catalog(&bad), Err(CliError::Yaml(_))));
    }
}
