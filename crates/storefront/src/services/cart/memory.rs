//! In-memory [`CartStore`] for tests.
//!
//! One mutex guards all state, so each primitive is atomic with respect to
//! the others, matching the per-statement atomicity of the Postgres store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use loam_core::{ProductId, Quantity, UserId};

use super::store::{CartStore, LineWrite};
use crate::db::RepositoryError;
use crate::models::{CartLine, CartProduct, ResolvedCartLine};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, CartProduct>,
    carts: HashMap<UserId, Vec<CartLine>>,
}

impl State {
    fn line_mut(&mut self, user_id: UserId, product_id: ProductId) -> Option<&mut CartLine> {
        self.carts
            .get_mut(&user_id)?
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

/// Cart store backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<Mutex<State>>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryCartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if the state lock is poisoned.
    pub fn insert_product(&self, product: CartProduct) -> Result<(), RepositoryError> {
        self.lock()?.products.insert(product.id, product);
        Ok(())
    }

    /// Change a product's stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub fn set_stock(&self, product_id: ProductId, stock: u32) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(RepositoryError::NotFound)?;
        product.stock = stock;
        Ok(())
    }

    /// Delete a product and every cart line that references it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if the state lock is poisoned.
    pub fn remove_product(&self, product_id: ProductId) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state.products.remove(&product_id);
        for lines in state.carts.values_mut() {
            lines.retain(|line| line.product_id != product_id);
        }
        Ok(())
    }

    /// Number of [`CartStore`] calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("cart state lock poisoned".to_owned()))
    }

    fn record(&self) -> Result<MutexGuard<'_, State>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lock()
    }
}

impl CartStore for InMemoryCartStore {
    async fn find_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<CartProduct>, RepositoryError> {
        Ok(self.record()?.products.get(&product_id).cloned())
    }

    async fn find_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Quantity>, RepositoryError> {
        let mut state = self.record()?;
        Ok(state.line_mut(user_id, product_id).map(|line| line.quantity))
    }

    async fn insert_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<LineWrite, RepositoryError> {
        let mut state = self.record()?;
        let Some(stock) = state.products.get(&product_id).map(|p| p.stock) else {
            return Ok(LineWrite::ProductMissing);
        };
        if !quantity.fits_within(stock) {
            return Ok(LineWrite::ExceedsStock {
                in_cart: None,
                stock,
            });
        }
        if state.line_mut(user_id, product_id).is_some() {
            return Ok(LineWrite::LineExists);
        }
        state.carts.entry(user_id).or_default().push(CartLine {
            product_id,
            quantity,
        });
        Ok(LineWrite::Applied(quantity))
    }

    async fn increment_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        by: Quantity,
    ) -> Result<LineWrite, RepositoryError> {
        let mut state = self.record()?;
        let Some(stock) = state.products.get(&product_id).map(|p| p.stock) else {
            return Ok(LineWrite::ProductMissing);
        };
        let Some(line) = state.line_mut(user_id, product_id) else {
            return Ok(LineWrite::LineMissing);
        };
        match line.quantity.checked_add(by) {
            Some(total) if total.fits_within(stock) => {
                line.quantity = total;
                Ok(LineWrite::Applied(total))
            }
            _ => Ok(LineWrite::ExceedsStock {
                in_cart: Some(line.quantity),
                stock,
            }),
        }
    }

    async fn set_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<LineWrite, RepositoryError> {
        let mut state = self.record()?;
        Ok(match state.line_mut(user_id, product_id) {
            Some(line) => {
                line.quantity = quantity;
                LineWrite::Applied(quantity)
            }
            None => LineWrite::LineMissing,
        })
    }

    async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.record()?;
        if let Some(lines) = state.carts.get_mut(&user_id) {
            lines.retain(|line| line.product_id != product_id);
        }
        Ok(())
    }

    async fn clear_lines(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.record()?.carts.remove(&user_id);
        Ok(())
    }

    async fn lines(&self, user_id: UserId) -> Result<Vec<ResolvedCartLine>, RepositoryError> {
        let state = self.record()?;
        let Some(lines) = state.carts.get(&user_id) else {
            return Ok(Vec::new());
        };
        Ok(lines
            .iter()
            .filter_map(|line| {
                state
                    .products
                    .get(&line.product_id)
                    .map(|product| ResolvedCartLine {
                        product: product.clone(),
                        quantity: line.quantity,
                    })
            })
            .collect())
    }
}
