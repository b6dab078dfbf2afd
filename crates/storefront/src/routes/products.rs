//! Product catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 24;
const MAX_PAGE_SIZE: i64 = 100;

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationQuery {
    /// Clamp to a valid `(limit, offset)` pair.
    fn bounds(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// `GET /api/products`, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<Product>>> {
    let (limit, offset) = query.bounds();
    let products = ProductRepository::new(state.pool())
        .list(limit, offset)
        .await?;
    Ok(Json(products))
}

/// `GET /api/products/{handle}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get_by_handle(&handle)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {handle}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(PaginationQuery::default().bounds(), (DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn test_pagination_clamps() {
        let query = PaginationQuery {
            limit: Some(10_000),
            offset: Some(-3),
        };
        assert_eq!(query.bounds(), (MAX_PAGE_SIZE, 0));

        let query = PaginationQuery {
            limit: Some(0),
            offset: Some(48),
        };
        assert_eq!(query.bounds(), (1, 48));
    }
}
