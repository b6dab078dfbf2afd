//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//! GET  /health/ready           - Database readiness
//!
//! # Cart pages
//! GET  /cart                   - Cart page (cached per user)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Cart API
//! GET    /api/cart                      - Current cart
//! DELETE /api/cart                      - Clear cart
//! POST   /api/cart/items                - Add to cart
//! PATCH  /api/cart/items/{product_id}   - Set quantity (0 removes)
//! DELETE /api/cart/items/{product_id}   - Remove line
//!
//! # Catalog
//! GET  /api/products           - Product listing (?limit, ?offset)
//! GET  /api/products/{handle}  - Product detail
//!
//! # Wishlist (requires auth)
//! GET    /api/wishlist                  - Saved products
//! POST   /api/wishlist                  - Save a product
//! DELETE /api/wishlist/{product_id}     - Unsave a product
//!
//! # Auth
//! POST /api/auth/register      - Create account and sign in
//! POST /api/auth/login         - Sign in
//! POST /api/auth/logout        - Sign out
//! GET  /api/auth/me            - Current user
//!
//! # Admin (requires admin role)
//! POST   /api/admin/products            - Create product
//! PUT    /api/admin/products/{id}       - Update product
//! DELETE /api/admin/products/{id}       - Delete product
//! PUT    /api/admin/products/{id}/stock - Set stock
//! DELETE /api/admin/users/{id}          - Delete user
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the cart page routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
}

/// Create the cart API routes router.
pub fn cart_api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::get).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            patch(cart::update).delete(cart::remove),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{handle}", get(products::show))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::index).post(wishlist::add))
        .route("/{product_id}", delete(wishlist::remove))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(admin::create_product))
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/products/{id}/stock", put(admin::set_stock))
        .route("/users/{id}", delete(admin::delete_user))
}

/// Create the `/api` router, rate limited per client IP.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_api_routes())
        .nest("/products", product_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/auth", auth_routes().layer(auth_rate_limiter()))
        .nest("/admin", admin_routes())
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/cart", cart_routes())
        .nest("/api", api_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;

    fn test_state() -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/loam_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            cart_cache_ttl: Duration::from_secs(300),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        // Never connects: every request below is answered before a query.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/loam_test")
            .unwrap();
        AppState::new(config, pool)
    }

    async fn send(method: Method, uri: &str, body: Option<&str>) -> StatusCode {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-real-ip", "203.0.113.7");
        if body.is_some() {
            request = request.header("content-type", "application/json");
        }
        let request = request
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        routes()
            .with_state(test_state())
            .oneshot(request)
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(send(Method::GET, "/health", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_api_requires_user() {
        assert_eq!(
            send(Method::GET, "/api/cart", None).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            send(
                Method::POST,
                "/api/cart/items",
                Some(r#"{"product_id": 1, "quantity": 2}"#)
            )
            .await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            send(Method::PATCH, "/api/cart/items/1", Some(r#"{"quantity": 0}"#)).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            send(Method::DELETE, "/api/cart", None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_wishlist_and_admin_require_user() {
        assert_eq!(
            send(Method::GET, "/api/wishlist", None).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            send(
                Method::PUT,
                "/api/admin/products/1/stock",
                Some(r#"{"stock": 5}"#)
            )
            .await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            send(Method::GET, "/api/auth/me", None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_anonymous_cart_page_and_badge() {
        assert_eq!(send(Method::GET, "/cart", None).await, StatusCode::OK);
        assert_eq!(send(Method::GET, "/cart/count", None).await, StatusCode::OK);
    }
}
