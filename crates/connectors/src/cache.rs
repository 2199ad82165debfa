//! Product listing cache.
//!
//! Pages are cached per request shape. Entries are served while younger than
//! the base TTL; while load shedding is suspected, entries up to twice the
//! TTL old are served instead of going to the network.

use std::time::Duration;

use fluxori_core::{MarketplaceProduct, PaginatedResponse, PaginationOptions};
use moka::future::Cache;
use tokio::time::Instant;
use tracing::debug;

type ProductPage = PaginatedResponse<MarketplaceProduct>;

/// Longest an entry is kept, whatever the configured TTL.
const MAX_ENTRY_LIFETIME: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Clone)]
struct CachedPage {
    page: ProductPage,
    stored_at: Instant,
}

/// Cache of `get_products` pages for one connector.
#[derive(Clone)]
pub struct ProductCache {
    ttl: Duration,
    pages: Cache<PaginationOptions, CachedPage>,
}

impl ProductCache {
    /// Create a cache with the given base TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let pages = Cache::builder()
            .max_capacity(500)
            .time_to_live(
                ttl.saturating_mul(2)
                    .clamp(Duration::from_secs(1), MAX_ENTRY_LIFETIME),
            )
            .build();
        Self { ttl, pages }
    }

    /// Cached page, if fresh enough for the current conditions.
    pub async fn get(&self, options: &PaginationOptions, load_shedding: bool) -> Option<ProductPage> {
        if self.ttl.is_zero() {
            return None;
        }
        let entry = self.pages.get(options).await?;
        let age = entry.stored_at.elapsed();
        let max_age = if load_shedding {
            self.ttl.saturating_mul(2)
        } else {
            self.ttl
        };

        if age <= max_age {
            debug!(page = options.page, age_secs = age.as_secs(), load_shedding, "Cache hit for products");
            Some(entry.page)
        } else {
            None
        }
    }

    pub async fn insert(&self, options: PaginationOptions, page: ProductPage) {
        if self.ttl.is_zero() {
            return;
        }
        self.pages
            .insert(
                options,
                CachedPage {
                    page,
                    stored_at: Instant::now(),
                },
            )
            .await;
    }

    /// Drop every cached page.
    pub async fn invalidate_all(&self) {
        self.pages.invalidate_all();
        self.pages.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for ProductCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.pages.entry_count())
            .finish()
    }
}
