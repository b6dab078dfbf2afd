//! Integration tests for Loam.
//!
//! The cart service runs here against the in-memory `CartStore`, which
//! gives each write primitive the same atomicity as the SQL statements.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p loam-integration-tests
//! cargo test -p loam-integration-tests -- --ignored  # with a database
//! ```
//!
//! # Test Files
//!
//! - `cart_reconciliation` - Stock bounds and quantity rules
//! - `cart_concurrency` - Racing adds against a fixed stock
//! - `cart_page_cache` - Cache invalidation on mutation
//! - `cart_store_postgres` - `PgCartStore` writes (ignored; needs `PostgreSQL`)
//! - `accounts_postgres` - Account re-reads (ignored; needs `PostgreSQL`)

use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use loam_core::{CurrencyCode, Email, Price, ProductId, Role, UserId};
use loam_storefront::models::{CartProduct, CurrentUser, ResolvedCartLine};
use loam_storefront::services::cart::{CartPageCache, CartService, InMemoryCartStore};

/// A cart service wired to an in-memory store.
pub struct TestShop {
    pub cart: CartService<InMemoryCartStore>,
    pub store: InMemoryCartStore,
}

impl TestShop {
    /// Shop with one product per `(id, stock)` pair.
    ///
    /// # Panics
    ///
    /// Panics if the store rejects a product.
    #[must_use]
    pub fn with_products(products: &[(i32, u32)]) -> Self {
        let store = InMemoryCartStore::new();
        for &(id, stock) in products {
            store
                .insert_product(product(id, stock))
                .expect("in-memory store accepts products");
        }
        let cart = CartService::new(store.clone(), CartPageCache::new(Duration::from_secs(300)));
        Self { cart, store }
    }
}

/// A signed-in customer.
///
/// # Panics
///
/// Panics if the generated email is invalid.
#[must_use]
pub fn customer(id: i32) -> CurrentUser {
    let email = Email::parse(&format!("grower{id}@loam.example")).expect("valid test email");
    CurrentUser {
        id: UserId::new(id),
        email,
        role: Role::Customer,
    }
}

/// A fertilizer product with the given stock.
#[must_use]
pub fn product(id: i32, stock: u32) -> CartProduct {
    CartProduct {
        id: ProductId::new(id),
        handle: format!("compost-blend-{id}"),
        name: format!("Compost Blend No. {id}"),
        price: Price::new(Decimal::new(2450, 2), CurrencyCode::USD),
        discount: Decimal::ZERO,
        stock,
        image: None,
    }
}

/// `(product id, quantity)` pairs in cart order.
#[must_use]
pub fn quantities(lines: &[ResolvedCartLine]) -> Vec<(i32, u32)> {
    lines
        .iter()
        .map(|line| (line.product.id.as_i32(), line.quantity.get()))
        .collect()
}

/// Connect to the test database and apply migrations.
///
/// Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Panics
///
/// Panics if neither variable is set, the database is unreachable, or a
/// migration fails.
pub async fn database() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL or DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(40)
        .connect(&url)
        .await
        .expect("Failed to connect to PostgreSQL");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
