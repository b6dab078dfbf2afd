//! Cart reconciliation service.
//!
//! Keeps each user's cart lines within the bounds set by current product
//! stock and keeps at most one line per product.
//!
//! # Write path
//!
//! `add_to_cart` checks the request against the stock it read so it can
//! report a precise error, then issues a conditional write that the store
//! re-checks atomically. If the write loses a race with another request
//! (the line appeared or disappeared in between), the service re-plans with
//! the other primitive, up to [`MAX_WRITE_ATTEMPTS`] times. Re-planned writes
//! are bounded by the store alone.

mod cache;
mod error;
#[cfg(any(test, feature = "memory-store"))]
mod memory;
mod store;

pub use cache::{CartPageCache, RenderTicket};
pub use error::CartError;
#[cfg(any(test, feature = "memory-store"))]
pub use memory::InMemoryCartStore;
pub use store::{CartStore, LineWrite};

use tracing::instrument;

use loam_core::{ProductId, Quantity, UserId};

use crate::models::{CurrentUser, ResolvedCartLine};

/// Write attempts before a contended `add_to_cart` gives up.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Cart operations for the signed-in user.
///
/// Every operation takes the session principal and fails with
/// [`CartError::Unauthorized`] before touching the store when it is absent.
#[derive(Debug, Clone)]
pub struct CartService<S> {
    store: S,
    pages: CartPageCache,
}

impl<S: CartStore> CartService<S> {
    /// Create a cart service.
    #[must_use]
    pub const fn new(store: S, pages: CartPageCache) -> Self {
        Self { store, pages }
    }

    /// The rendered-page cache this service invalidates.
    #[must_use]
    pub const fn pages(&self) -> &CartPageCache {
        &self.pages
    }

    /// The user's cart with products resolved.
    ///
    /// No stock validation: lines for products now out of stock are still
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthorized` without a user, or
    /// `CartError::OperationFailed` if the store fails.
    #[instrument(skip_all, fields(user_id = tracing::field::Empty))]
    pub async fn get_cart(
        &self,
        user: Option<&CurrentUser>,
    ) -> Result<Vec<ResolvedCartLine>, CartError> {
        let result: Result<_, CartError> = async {
            let user_id = principal(user)?;
            Ok(self.store.lines(user_id).await?)
        }
        .await;
        log_failure("get_cart", result)
    }

    /// Add units of a product to the cart.
    ///
    /// `quantity` defaults to 1 and is raised to at least 1. A new line is
    /// inserted, or an existing line is incremented in place.
    ///
    /// # Errors
    ///
    /// - `CartError::Unauthorized` without a user
    /// - `CartError::ProductNotFound` if the product does not exist
    /// - `CartError::InsufficientStock` if stock is below the requested quantity
    /// - `CartError::QuantityExceedsStock` if the line plus the request exceeds stock
    /// - `CartError::OperationFailed` if the store fails or the line keeps
    ///   changing underneath the write
    #[instrument(skip(self, user), fields(user_id = tracing::field::Empty))]
    pub async fn add_to_cart(
        &self,
        user: Option<&CurrentUser>,
        product_id: ProductId,
        quantity: Option<i64>,
    ) -> Result<Vec<ResolvedCartLine>, CartError> {
        let result: Result<_, CartError> = async {
            let user_id = principal(user)?;
            let quantity = Quantity::at_least_one(quantity.unwrap_or(1));
            self.reconcile_add(user_id, product_id, quantity).await?;
            self.after_mutation(user_id).await
        }
        .await;
        log_failure("add_to_cart", result)
    }

    /// Set a line's quantity.
    ///
    /// Zero or negative removes the line. Stock is not re-checked on this
    /// path. Updating a product with no line changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthorized` without a user, or
    /// `CartError::OperationFailed` if the store fails.
    #[instrument(skip(self, user), fields(user_id = tracing::field::Empty))]
    pub async fn update_cart_item(
        &self,
        user: Option<&CurrentUser>,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Vec<ResolvedCartLine>, CartError> {
        if quantity <= 0 {
            return self.remove_from_cart(user, product_id).await;
        }

        let result: Result<_, CartError> = async {
            let user_id = principal(user)?;
            let outcome = self
                .store
                .set_line(user_id, product_id, Quantity::at_least_one(quantity))
                .await?;
            if outcome == LineWrite::LineMissing {
                tracing::debug!(%product_id, "No cart line to update");
            }
            self.after_mutation(user_id).await
        }
        .await;
        log_failure("update_cart_item", result)
    }

    /// Remove a product's line. Removing an absent line is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthorized` without a user, or
    /// `CartError::OperationFailed` if the store fails.
    #[instrument(skip(self, user), fields(user_id = tracing::field::Empty))]
    pub async fn remove_from_cart(
        &self,
        user: Option<&CurrentUser>,
        product_id: ProductId,
    ) -> Result<Vec<ResolvedCartLine>, CartError> {
        let result: Result<_, CartError> = async {
            let user_id = principal(user)?;
            self.store.remove_line(user_id, product_id).await?;
            self.after_mutation(user_id).await
        }
        .await;
        log_failure("remove_from_cart", result)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthorized` without a user, or
    /// `CartError::OperationFailed` if the store fails.
    #[instrument(skip_all, fields(user_id = tracing::field::Empty))]
    pub async fn clear_cart(
        &self,
        user: Option<&CurrentUser>,
    ) -> Result<Vec<ResolvedCartLine>, CartError> {
        let result: Result<_, CartError> = async {
            let user_id = principal(user)?;
            self.store.clear_lines(user_id).await?;
            self.pages.invalidate(user_id).await;
            Ok(Vec::new())
        }
        .await;
        log_failure("clear_cart", result)
    }

    async fn reconcile_add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, CartError> {
        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        if !quantity.fits_within(product.stock) {
            return Err(CartError::InsufficientStock {
                requested: quantity.get(),
                available: product.stock,
            });
        }

        let mut existing = self.store.find_line(user_id, product_id).await?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let outcome = match existing {
                None => self.store.insert_line(user_id, product_id, quantity).await?,
                Some(in_cart) => {
                    // `product.stock` is only current on the first attempt.
                    let combined = u64::from(in_cart.get()) + u64::from(quantity.get());
                    if attempt == 1 && combined > u64::from(product.stock) {
                        return Err(CartError::QuantityExceedsStock {
                            in_cart: in_cart.get(),
                            requested: quantity.get(),
                            available: product.stock,
                        });
                    }
                    self.store
                        .increment_line(user_id, product_id, quantity)
                        .await?
                }
            };

            match outcome {
                LineWrite::Applied(total) => return Ok(total),
                LineWrite::ExceedsStock {
                    in_cart: None,
                    stock,
                } => {
                    return Err(CartError::InsufficientStock {
                        requested: quantity.get(),
                        available: stock,
                    });
                }
                LineWrite::ExceedsStock {
                    in_cart: Some(in_cart),
                    stock,
                } => {
                    return Err(CartError::QuantityExceedsStock {
                        in_cart: in_cart.get(),
                        requested: quantity.get(),
                        available: stock,
                    });
                }
                LineWrite::ProductMissing => return Err(CartError::ProductNotFound),
                LineWrite::LineExists => {
                    tracing::debug!(attempt, "Cart line appeared concurrently, re-reading");
                    existing = self.store.find_line(user_id, product_id).await?;
                }
                LineWrite::LineMissing => {
                    tracing::debug!(attempt, "Cart line removed concurrently, inserting");
                    existing = None;
                }
            }
        }

        Err(CartError::OperationFailed(
            "cart changed while updating, please try again".to_owned(),
        ))
    }

    async fn after_mutation(&self, user_id: UserId) -> Result<Vec<ResolvedCartLine>, CartError> {
        self.pages.invalidate(user_id).await;
        Ok(self.store.lines(user_id).await?)
    }
}

/// Resolve the caller, recording it on the current span.
fn principal(user: Option<&CurrentUser>) -> Result<UserId, CartError> {
    let user = user.ok_or(CartError::Unauthorized)?;
    tracing::Span::current().record("user_id", user.id.as_i32());
    Ok(user.id)
}

fn log_failure<T>(operation: &str, result: Result<T, CartError>) -> Result<T, CartError> {
    if let Err(ref err) = result {
        tracing::warn!(operation, error = %err, "Cart operation failed");
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use loam_core::{CurrencyCode, Email, Price, Role};

    use super::*;
    use crate::db::RepositoryError;
    use crate::models::CartProduct;

    fn user(id: i32) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse(&format!("grower{id}@loam.example")).unwrap(),
            role: Role::Customer,
        }
    }

    fn product(id: i32, stock: u32) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            handle: format!("sku-{id}"),
            name: format!("Bone Meal {id}"),
            price: Price::new(Decimal::new(1299, 2), CurrencyCode::USD),
            discount: Decimal::ZERO,
            stock,
            image: None,
        }
    }

    fn service_with(stock: u32) -> (CartService<InMemoryCartStore>, InMemoryCartStore) {
        let store = InMemoryCartStore::new();
        store.insert_product(product(1, stock)).unwrap();
        let service = CartService::new(store.clone(), CartPageCache::new(Duration::from_secs(60)));
        (service, store)
    }

    fn quantities(lines: &[ResolvedCartLine]) -> Vec<(i32, u32)> {
        lines
            .iter()
            .map(|l| (l.product.id.as_i32(), l.quantity.get()))
            .collect()
    }

    #[tokio::test]
    async fn test_add_then_exceed_stock() {
        let (service, _) = service_with(5);
        let alice = user(1);

        let cart = service
            .add_to_cart(Some(&alice), ProductId::new(1), Some(3))
            .await
            .unwrap();
        assert_eq!(quantities(&cart), vec![(1, 3)]);

        let err = service
            .add_to_cart(Some(&alice), ProductId::new(1), Some(3))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CartError::QuantityExceedsStock {
                in_cart: 3,
                requested: 3,
                available: 5
            }
        );

        let cart = service.get_cart(Some(&alice)).await.unwrap();
        assert_eq!(quantities(&cart), vec![(1, 3)]);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_cart_unchanged() {
        let (service, _) = service_with(2);
        let alice = user(1);

        let err = service
            .add_to_cart(Some(&alice), ProductId::new(1), Some(3))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CartError::InsufficientStock {
                requested: 3,
                available: 2
            }
        );
        assert!(service.get_cart(Some(&alice)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_product() {
        let (service, _) = service_with(5);
        let err = service
            .add_to_cart(Some(&user(1)), ProductId::new(99), None)
            .await
            .unwrap_err();
        assert_eq!(err, CartError::ProductNotFound);
    }

    #[tokio::test]
    async fn test_non_positive_add_counts_as_one() {
        let (service, _) = service_with(5);
        let alice = user(1);

        service
            .add_to_cart(Some(&alice), ProductId::new(1), Some(0))
            .await
            .unwrap();
        let cart = service
            .add_to_cart(Some(&alice), ProductId::new(1), Some(-5))
            .await
            .unwrap();
        assert_eq!(quantities(&cart), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_update_skips_stock_check() {
        let (service, _) = service_with(5);
        let alice = user(1);

        service
            .add_to_cart(Some(&alice), ProductId::new(1), Some(2))
            .await
            .unwrap();
        let cart = service
            .update_cart_item(Some(&alice), ProductId::new(1), 10)
            .await
            .unwrap();
        assert_eq!(quantities(&cart), vec![(1, 10)]);
    }

    #[tokio::test]
    async fn test_update_to_zero_removes() {
        let (service, _) = service_with(5);
        let alice = user(1);

        for quantity in [0, -1] {
            service
                .add_to_cart(Some(&alice), ProductId::new(1), Some(1))
                .await
                .unwrap();
            let cart = service
                .update_cart_item(Some(&alice), ProductId::new(1), quantity)
                .await
                .unwrap();
            assert!(cart.is_empty());
        }
    }

    #[tokio::test]
    async fn test_update_without_line_is_noop() {
        let (service, _) = service_with(5);
        let cart = service
            .update_cart_item(Some(&user(1)), ProductId::new(1), 4)
            .await
            .unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_before_store_access() {
        let (service, store) = service_with(5);
        let before = store.calls();

        assert_eq!(
            service.get_cart(None).await.unwrap_err(),
            CartError::Unauthorized
        );
        assert_eq!(
            service
                .add_to_cart(None, ProductId::new(1), None)
                .await
                .unwrap_err(),
            CartError::Unauthorized
        );
        assert_eq!(
            service
                .update_cart_item(None, ProductId::new(1), 0)
                .await
                .unwrap_err(),
            CartError::Unauthorized
        );
        assert_eq!(
            service.clear_cart(None).await.unwrap_err(),
            CartError::Unauthorized
        );
        assert_eq!(store.calls(), before);
    }

    #[tokio::test]
    async fn test_mutations_invalidate_page_cache() {
        let (service, _) = service_with(5);
        let alice = user(1);
        let pages = service.pages().clone();

        pages.insert(pages.ticket(alice.id), "cached".into()).await;
        service.get_cart(Some(&alice)).await.unwrap();
        assert!(pages.get(alice.id).await.is_some());

        service
            .add_to_cart(Some(&alice), ProductId::new(1), None)
            .await
            .unwrap();
        assert!(pages.get(alice.id).await.is_none());

        pages.insert(pages.ticket(alice.id), "cached".into()).await;
        service.clear_cart(Some(&alice)).await.unwrap();
        assert!(pages.get(alice.id).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_add_keeps_cached_page() {
        let (service, _) = service_with(1);
        let alice = user(1);
        let pages = service.pages().clone();

        pages.insert(pages.ticket(alice.id), "cached".into()).await;
        service
            .add_to_cart(Some(&alice), ProductId::new(1), Some(2))
            .await
            .unwrap_err();
        assert!(pages.get(alice.id).await.is_some());
    }

    /// Store that inserts a competing line right before the first insert,
    /// as if another request had won the race.
    struct RacingStore {
        inner: InMemoryCartStore,
        competing: Quantity,
        /// Stock the race leaves behind, if it changes.
        restock: Option<u32>,
        raced: std::sync::atomic::AtomicBool,
    }

    impl CartStore for RacingStore {
        async fn find_product(
            &self,
            product_id: ProductId,
        ) -> Result<Option<CartProduct>, RepositoryError> {
            self.inner.find_product(product_id).await
        }

        async fn find_line(
            &self,
            user_id: UserId,
            product_id: ProductId,
        ) -> Result<Option<Quantity>, RepositoryError> {
            self.inner.find_line(user_id, product_id).await
        }

        async fn insert_line(
            &self,
            user_id: UserId,
            product_id: ProductId,
            quantity: Quantity,
        ) -> Result<LineWrite, RepositoryError> {
            if !self.raced.swap(true, std::sync::atomic::Ordering::SeqCst) {
                self.inner
                    .insert_line(user_id, product_id, self.competing)
                    .await?;
                if let Some(stock) = self.restock {
                    self.inner.set_stock(product_id, stock)?;
                }
            }
            self.inner.insert_line(user_id, product_id, quantity).await
        }

        async fn increment_line(
            &self,
            user_id: UserId,
            product_id: ProductId,
            by: Quantity,
        ) -> Result<LineWrite, RepositoryError> {
            self.inner.increment_line(user_id, product_id, by).await
        }

        async fn set_line(
            &self,
            user_id: UserId,
            product_id: ProductId,
            quantity: Quantity,
        ) -> Result<LineWrite, RepositoryError> {
            self.inner.set_line(user_id, product_id, quantity).await
        }

        async fn remove_line(
            &self,
            user_id: UserId,
            product_id: ProductId,
        ) -> Result<(), RepositoryError> {
            self.inner.remove_line(user_id, product_id).await
        }

        async fn clear_lines(&self, user_id: UserId) -> Result<(), RepositoryError> {
            self.inner.clear_lines(user_id).await
        }

        async fn lines(&self, user_id: UserId) -> Result<Vec<ResolvedCartLine>, RepositoryError> {
            self.inner.lines(user_id).await
        }
    }

    fn racing_service(
        stock: u32,
        competing: u32,
        restock: Option<u32>,
    ) -> CartService<RacingStore> {
        let inner = InMemoryCartStore::new();
        inner.insert_product(product(1, stock)).unwrap();
        let store = RacingStore {
            inner,
            competing: Quantity::new(competing).unwrap(),
            restock,
            raced: std::sync::atomic::AtomicBool::new(false),
        };
        CartService::new(store, CartPageCache::new(Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_lost_insert_race_falls_back_to_increment() {
        let service = racing_service(5, 2, None);
        let cart = service
            .add_to_cart(Some(&user(1)), ProductId::new(1), Some(3))
            .await
            .unwrap();
        assert_eq!(quantities(&cart), vec![(1, 5)]);
    }

    #[tokio::test]
    async fn test_lost_insert_race_respects_stock() {
        let service = racing_service(5, 4, None);
        let err = service
            .add_to_cart(Some(&user(1)), ProductId::new(1), Some(3))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CartError::QuantityExceedsStock {
                in_cart: 4,
                requested: 3,
                available: 5
            }
        );
        let cart = service.get_cart(Some(&user(1))).await.unwrap();
        assert_eq!(quantities(&cart), vec![(1, 4)]);
    }

    #[tokio::test]
    async fn test_lost_insert_race_uses_current_stock() {
        // Stock rises from 5 to 10 while the competing line goes in.
        let service = racing_service(5, 4, Some(10));
        let cart = service
            .add_to_cart(Some(&user(1)), ProductId::new(1), Some(3))
            .await
            .unwrap();
        assert_eq!(quantities(&cart), vec![(1, 7)]);
    }

    #[tokio::test]
    async fn test_lost_insert_race_reports_current_stock() {
        // Stock moves from 5 to 6; the store refuses 4 + 3 against the new count.
        let service = racing_service(5, 4, Some(6));
        let err = service
            .add_to_cart(Some(&user(1)), ProductId::new(1), Some(3))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CartError::QuantityExceedsStock {
                in_cart: 4,
                requested: 3,
                available: 6
            }
        );
    }
}
