//! Loam Core - Shared types library.
//!
//! This crate provides common types used across all Loam components:
//! - `storefront` - Public-facing shop, cart and catalog API
//! - `cli` - Command-line tools for migrations and catalog management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. With the `postgres` feature the ID and email newtypes
//! gain `sqlx` encode/decode support.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, emails, and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
