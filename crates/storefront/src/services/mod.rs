//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password registration and login
//! - `cart` - Cart reconciliation against product stock

pub mod auth;
pub mod cart;
