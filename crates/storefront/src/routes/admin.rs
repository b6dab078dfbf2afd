//! Admin route handlers for the catalog and accounts.
//!
//! Every handler requires [`RequireAdmin`]. Changes to a product's display
//! fields or stock drop all cached cart pages, since any cart may show it.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use loam_core::{ProductId, UserId};

use crate::db::{NewProduct, ProductRepository, ProductUpdate, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Product, validate_stock};
use crate::state::AppState;

/// Set stock request body.
#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub stock: i64,
}

/// `POST /api/admin/products`
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, sku = %body.sku))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<NewProduct>,
) -> Result<Response> {
    body.validate().map_err(AppError::BadRequest)?;

    let product = ProductRepository::new(state.pool()).create(&body).await?;
    tracing::info!(product_id = %product.id, "Created product");
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

/// `PUT /api/admin/products/{id}`
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    body.validate().map_err(AppError::BadRequest)?;

    let product = ProductRepository::new(state.pool())
        .update(id, &body)
        .await?;
    state.cart().pages().invalidate_all();
    Ok(Json(product))
}

/// `DELETE /api/admin/products/{id}`
///
/// Cart and wishlist lines for the product go with it.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    if !ProductRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    state.cart().pages().invalidate_all();
    tracing::info!(product_id = %id, "Deleted product");
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/admin/products/{id}/stock`
///
/// Existing cart lines above the new count are kept; later adds are
/// bounded by it.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<SetStockRequest>,
) -> Result<Json<Product>> {
    let stock = validate_stock(body.stock).map_err(AppError::BadRequest)?;

    let product = ProductRepository::new(state.pool())
        .set_stock(id, stock)
        .await?;
    state.cart().pages().invalidate_all();
    tracing::info!(product_id = %id, stock, "Set stock");
    Ok(Json(product))
}

/// `DELETE /api/admin/users/{id}`
///
/// Admins cannot delete their own account here.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "cannot delete your own account".to_string(),
        ));
    }
    if !UserRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound(format!("user {id}")));
    }
    state.cart().pages().invalidate(id).await;
    tracing::info!(user_id = %id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}
