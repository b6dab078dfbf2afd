//! CLI subcommands.

pub mod migrate;
pub mod products;
pub mod users;

use sqlx::PgPool;
use thiserror::Error;

use loam_storefront::config::{ConfigError, StorefrontConfig};
use loam_storefront::db::{self, RepositoryError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Input file is not valid YAML for the expected shape.
    #[error("Invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Input failed validation.
    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Connect to the storefront database.
async fn connect() -> Result<PgPool, CliError> {
    let database_url = StorefrontConfig::database_url_from_env()?;
    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&database_url).await?)
}
