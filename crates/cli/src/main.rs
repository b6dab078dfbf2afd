//! Loam CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! loam-cli migrate
//!
//! # Create or update products from a YAML catalog (matched by SKU)
//! loam-cli products import catalog.yaml
//!
//! # Set a product's stock
//! loam-cli products stock KELP-5LB 40
//!
//! # Grant the admin role
//! loam-cli users promote owner@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "loam-cli")]
#[command(author, version, about = "Loam storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage the product catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage user accounts
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Create or update products from a YAML file, matched by SKU
    Import {
        /// Path to the catalog file
        file: PathBuf,
    },
    /// Set the stock count of a product
    Stock {
        /// Product SKU
        sku: String,
        /// New stock count
        #[arg(allow_negative_numbers = true)]
        stock: i64,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Give a user the admin role
    Promote {
        /// User email address
        email: String,
    },
    /// Return a user to the customer role
    Demote {
        /// User email address
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Products { action } => match action {
            ProductAction::Import { file } => {
                commands::products::import(&file).await?;
            }
            ProductAction::Stock { sku, stock } => {
                commands::products::set_stock(&sku, stock).await?;
            }
        },
        Commands::Users { action } => match action {
            UserAction::Promote { email } => {
                commands::users::set_role(&email, loam_core::Role::Admin).await?;
            }
            UserAction::Demote { email } => {
                commands::users::set_role(&email, loam_core::Role::Customer).await?;
            }
        },
    }
    Ok(())
}
