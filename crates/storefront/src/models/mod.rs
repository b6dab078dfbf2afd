//! Domain models for storefront.
//!
//! These types represent validated domain objects separate from database row
//! types. Repositories convert rows into them and reject rows that violate
//! their invariants.

pub mod cart;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartLine, CartProduct, CartSummary, ResolvedCartLine};
pub use product::{MAX_STOCK, Product, SHOP_CURRENCY, validate_stock};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
