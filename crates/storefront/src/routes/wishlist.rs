//! Wishlist route handlers. All require a signed-in user.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use loam_core::ProductId;

use crate::db::{RepositoryError, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Product;
use crate::state::AppState;

/// Add to wishlist request body.
#[derive(Debug, Deserialize)]
pub struct AddToWishlistRequest {
    pub product_id: ProductId,
}

/// `GET /api/wishlist`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Product>>> {
    let products = WishlistRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(products))
}

/// `POST /api/wishlist`
///
/// Saving a product twice keeps one entry.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddToWishlistRequest>,
) -> Result<Json<Vec<Product>>> {
    let wishlist = WishlistRepository::new(state.pool());
    wishlist
        .add(user.id, body.product_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound(format!("product {}", body.product_id))
            }
            other => other.into(),
        })?;
    Ok(Json(wishlist.list(user.id).await?))
}

/// `DELETE /api/wishlist/{product_id}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<Product>>> {
    let wishlist = WishlistRepository::new(state.pool());
    wishlist.remove(user.id, product_id).await?;
    Ok(Json(wishlist.list(user.id).await?))
}
