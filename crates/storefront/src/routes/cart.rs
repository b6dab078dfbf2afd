//! Cart route handlers.
//!
//! The HTML page and count badge read the cart; the `/api/cart` handlers
//! call straight into [`CartService`](crate::services::cart::CartService),
//! which checks the session principal itself.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use loam_core::ProductId;

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{CartSummary, ResolvedCartLine};
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub handle: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image: Option<String>,
    /// Stock has dropped below the quantity in the cart.
    pub over_stock: bool,
}

impl From<&ResolvedCartLine> for CartItemView {
    fn from(line: &ResolvedCartLine) -> Self {
        Self {
            handle: line.product.handle.clone(),
            name: line.product.name.clone(),
            quantity: line.quantity.get(),
            price: line.product.unit_price().to_string(),
            line_price: line.line_total().to_string(),
            image: line.product.image.clone(),
            over_stock: line.exceeds_stock(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u64,
}

impl From<&[ResolvedCartLine]> for CartView {
    fn from(lines: &[ResolvedCartLine]) -> Self {
        let summary = CartSummary::of(lines);
        Self {
            items: lines.iter().map(CartItemView::from).collect(),
            subtotal: summary
                .subtotal
                .map_or_else(String::new, |price| price.to_string()),
            item_count: summary.item_count,
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub signed_in: bool,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u64,
}

/// Cart with totals, as returned by every `/api/cart` handler.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub lines: Vec<ResolvedCartLine>,
    pub summary: CartSummary,
}

impl From<Vec<ResolvedCartLine>> for CartResponse {
    fn from(lines: Vec<ResolvedCartLine>) -> Self {
        let summary = CartSummary::of(&lines);
        Self { lines, summary }
    }
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    /// Defaults to one. Values below one are raised to one.
    pub quantity: Option<i64>,
}

/// Update cart item request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    /// Zero or negative removes the line.
    pub quantity: i64,
}

// =============================================================================
// Pages
// =============================================================================

/// Display cart page.
///
/// Rendered pages are cached per user until the next cart mutation.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    let Some(user) = user else {
        return Ok(CartShowTemplate {
            cart: CartView::from(&[][..]),
            signed_in: false,
        }
        .into_response());
    };

    let pages = state.cart().pages();
    if let Some(page) = pages.get(user.id).await {
        return Ok(Html(page.to_string()).into_response());
    }

    let ticket = pages.ticket(user.id);
    let lines = state.cart().get_cart(Some(&user)).await?;
    let page: Arc<str> = CartShowTemplate {
        cart: CartView::from(lines.as_slice()),
        signed_in: true,
    }
    .render()
    .map_err(|e| AppError::Internal(format!("cart template: {e}")))?
    .into();

    pages.insert(ticket, Arc::clone(&page)).await;
    Ok(Html(page.to_string()).into_response())
}

/// Cart count badge fragment.
///
/// Anonymous visitors get a zero badge.
#[instrument(skip_all)]
pub async fn count(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<CartCountTemplate> {
    let count = match user {
        Some(user) => {
            let lines = state.cart().get_cart(Some(&user)).await?;
            CartSummary::of(&lines).item_count
        }
        None => 0,
    };
    Ok(CartCountTemplate { count })
}

// =============================================================================
// JSON API
// =============================================================================

/// `GET /api/cart`
#[instrument(skip_all)]
pub async fn get(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartResponse>> {
    let lines = state.cart().get_cart(user.as_ref()).await?;
    Ok(Json(lines.into()))
}

/// `POST /api/cart/items`
#[instrument(skip(state, user))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<CartResponse>> {
    let lines = state
        .cart()
        .add_to_cart(user.as_ref(), body.product_id, body.quantity)
        .await?;
    Ok(Json(lines.into()))
}

/// `PATCH /api/cart/items/{product_id}`
#[instrument(skip(state, user))]
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
    Json(body): Json<UpdateCartItemRequest>,
) -> Result<Json<CartResponse>> {
    let lines = state
        .cart()
        .update_cart_item(user.as_ref(), product_id, body.quantity)
        .await?;
    Ok(Json(lines.into()))
}

/// `DELETE /api/cart/items/{product_id}`
#[instrument(skip(state, user))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartResponse>> {
    let lines = state
        .cart()
        .remove_from_cart(user.as_ref(), product_id)
        .await?;
    Ok(Json(lines.into()))
}

/// `DELETE /api/cart`
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartResponse>> {
    let lines = state.cart().clear_cart(user.as_ref()).await?;
    Ok(Json(lines.into()))
}
