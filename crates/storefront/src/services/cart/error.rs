//! Cart error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors returned by cart operations.
///
/// Messages are shown to the shopper as-is, except `OperationFailed`, which
/// is reported as an internal error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No signed-in user.
    #[error("please sign in to use your cart")]
    Unauthorized,

    /// The product does not exist (or was deleted).
    #[error("product not found")]
    ProductNotFound,

    /// A new line asks for more units than are in stock.
    #[error("only {available} in stock (requested {requested})")]
    InsufficientStock {
        /// Units requested.
        requested: u32,
        /// Units in stock.
        available: u32,
    },

    /// Adding to an existing line would go past the stock count.
    #[error(
        "you already have {in_cart} in your cart; adding {requested} more would exceed the {available} in stock"
    )]
    QuantityExceedsStock {
        /// Units already in the cart.
        in_cart: u32,
        /// Units requested on top.
        requested: u32,
        /// Units in stock.
        available: u32,
    },

    /// Persistence failed.
    #[error("cart operation failed: {0}")]
    OperationFailed(String),
}

impl CartError {
    /// Whether the failure is a stock-bound violation.
    #[must_use]
    pub const fn is_stock_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientStock { .. } | Self::QuantityExceedsStock { .. }
        )
    }
}

impl From<RepositoryError> for CartError {
    fn from(err: RepositoryError) -> Self {
        Self::OperationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_become_operation_failed() {
        let err = CartError::from(RepositoryError::Unavailable("pool closed".to_owned()));
        assert_eq!(
            err,
            CartError::OperationFailed("store unavailable: pool closed".to_owned())
        );
    }

    #[test]
    fn test_stock_error_messages() {
        let err = CartError::QuantityExceedsStock {
            in_cart: 3,
            requested: 3,
            available: 5,
        };
        assert!(err.is_stock_error());
        assert_eq!(
            err.to_string(),
            "you already have 3 in your cart; adding 3 more would exceed the 5 in stock"
        );
        assert!(!CartError::ProductNotFound.is_stock_error());
    }
}
