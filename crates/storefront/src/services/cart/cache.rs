//! Rendered cart page cache.
//!
//! `GET /cart` renders through this cache. Every successful cart mutation
//! evicts the caller's entry so the next view re-renders.
//!
//! A render reads the cart before it can insert, so a mutation may land in
//! between. Renders therefore start from a [`RenderTicket`], and a page whose
//! ticket predates a later invalidation is never left in the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::future::Cache;

use loam_core::UserId;

/// Upper bound on cached pages.
const MAX_PAGES: u64 = 10_000;

/// Taken before reading the cart for a render.
#[derive(Debug, Clone, Copy)]
pub struct RenderTicket {
    user_id: UserId,
    generation: u64,
    issued: Instant,
}

/// Per-user cache of rendered cart HTML.
#[derive(Clone)]
pub struct CartPageCache {
    pages: Cache<UserId, Arc<str>>,
    /// Generation of each user's latest invalidation.
    invalidated: Cache<UserId, u64>,
    generation: Arc<AtomicU64>,
    cleared: Arc<AtomicU64>,
    ttl: Duration,
}

impl CartPageCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            pages: Cache::builder()
                .max_capacity(MAX_PAGES)
                .time_to_live(ttl)
                .build(),
            // Must outlive every render started before the entry; renders
            // older than `ttl` are discarded on insert.
            invalidated: Cache::builder().time_to_live(ttl).build(),
            generation: Arc::new(AtomicU64::new(0)),
            cleared: Arc::new(AtomicU64::new(0)),
            ttl,
        }
    }

    /// Cached page for a user.
    pub async fn get(&self, user_id: UserId) -> Option<Arc<str>> {
        self.pages.get(&user_id).await
    }

    /// Start a render for a user. Take this before reading the cart.
    #[must_use]
    pub fn ticket(&self, user_id: UserId) -> RenderTicket {
        RenderTicket {
            user_id,
            generation: self.generation.load(Ordering::SeqCst),
            issued: Instant::now(),
        }
    }

    /// Store a page rendered under `ticket`.
    ///
    /// Returns `false` if the user's cart was invalidated after the ticket
    /// was taken, in which case nothing stays cached.
    pub async fn insert(&self, ticket: RenderTicket, page: Arc<str>) -> bool {
        let user_id = ticket.user_id;
        self.pages.insert(user_id, page).await;

        // Checked after the insert: an invalidation racing with it either
        // shows up here or evicts the page itself afterwards.
        let stale = self.invalidated_since(&ticket).await || ticket.issued.elapsed() >= self.ttl;
        if stale {
            self.pages.invalidate(&user_id).await;
            tracing::debug!(%user_id, "Discarded cart page rendered before invalidation");
        }
        !stale
    }

    /// Drop a user's cached page.
    pub async fn invalidate(&self, user_id: UserId) {
        let generation = self.next_generation();
        self.invalidated
            .entry(user_id)
            .and_upsert_with(|previous| {
                let latest = previous.map_or(generation, |e| (*e.value()).max(generation));
                std::future::ready(latest)
            })
            .await;
        self.pages.invalidate(&user_id).await;
        tracing::debug!(%user_id, "Invalidated cart page");
    }

    /// Drop every cached page, e.g. after a product's display fields change.
    pub fn invalidate_all(&self) {
        let generation = self.next_generation();
        self.cleared.fetch_max(generation, Ordering::SeqCst);
        self.pages.invalidate_all();
        tracing::debug!("Invalidated all cart pages");
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn invalidated_since(&self, ticket: &RenderTicket) -> bool {
        if self.cleared.load(Ordering::SeqCst) > ticket.generation {
            return true;
        }
        self.invalidated
            .get(&ticket.user_id)
            .await
            .is_some_and(|generation| generation > ticket.generation)
    }
}

impl std::fmt::Debug for CartPageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartPageCache")
            .field("entries", &self.pages.entry_count())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}
