//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `user` - Site accounts (email, role)
//! - `user_password` - Argon2id hashes for credential logins
//! - `product` - Catalog and the authoritative `stock` count
//! - `cart_line` - One row per (user, product) with a positive quantity
//! - `wishlist_item` - Saved products per user
//!
//! Sessions live in `tower_sessions.session`, managed by the session store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p loam-cli -- migrate
//! ```

pub mod cart;
pub mod products;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart::PgCartStore;
pub use products::{NewProduct, ProductRepository, ProductUpdate};
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Map a unique-violation into `Conflict`, passing other errors through.
    pub(crate) fn from_unique(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a database `INTEGER` stock or quantity into `u32`.
pub(crate) fn non_negative(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}
