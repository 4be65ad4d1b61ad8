//! In-memory image tier.
//!
//! An LRU cache of decoded images bounded both by entry count and by the
//! total decoded byte cost. Operations are synchronous and never suspend.
//!
//! # Eviction
//!
//! After every `put` the tier holds at most `max_entries` images whose costs
//! sum to at most `max_cost`. Which entry leaves first is an implementation
//! detail (currently least-recently-used) and callers must not rely on it.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use tracing::trace;

use super::codec::CachedImage;
use super::key::CacheKey;
use super::MemoryCache;

/// Default maximum number of cached images.
pub const DEFAULT_MEMORY_ENTRY_LIMIT: usize = 100;

/// Default maximum total cost: 10 MiB of decoded pixels.
pub const DEFAULT_MEMORY_COST_LIMIT: usize = 10 * 1024 * 1024;

struct Inner {
    entries: LruCache<CacheKey, CachedImage>,
    cost: usize,
}

/// Bounded LRU tier for decoded images.
///
/// # Thread Safety
///
/// The tier is `Send + Sync` and is meant to be shared behind the
/// orchestrator; a single mutex guards the LRU list and the cost counter.
///
/// # Example
///
/// ```
/// use image::DynamicImage;
/// use recipe_image_cache::cache::{derive_key, CachedImage, ImageMemoryCache, MemoryCache};
///
/// let cache = ImageMemoryCache::new();
/// let key = derive_key("https://example.com/a.jpg");
///
/// cache.put(key.clone(), CachedImage::new(DynamicImage::new_rgb8(4, 4)));
/// assert!(cache.get(&key).is_some());
/// ```
pub struct ImageMemoryCache {
    inner: Mutex<Inner>,
    max_entries: usize,
    max_cost: usize,
}

impl ImageMemoryCache {
    /// Create a tier with the default limits (100 entries, 10 MiB).
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MEMORY_ENTRY_LIMIT, DEFAULT_MEMORY_COST_LIMIT)
    }

    /// Create a tier with explicit limits.
    ///
    /// An entry limit of zero is raised to one.
    pub fn with_limits(max_entries: usize, max_cost: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                cost: 0,
            }),
            max_entries: capacity.get(),
            max_cost,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check for an entry without updating recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains(key)
    }

    /// Remove one entry, returning it if present.
    pub fn remove(&self, key: &CacheKey) -> Option<CachedImage> {
        let mut inner = self.lock();
        let image = inner.entries.pop(key)?;
        inner.cost = inner.cost.saturating_sub(image.cost());
        Some(image)
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the tier holds no images.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Current total cost in bytes.
    pub fn cost(&self) -> usize {
        self.lock().cost
    }

    /// Maximum number of entries.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Maximum total cost in bytes.
    pub fn max_cost(&self) -> usize {
        self.max_cost
    }
}

impl Default for ImageMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache for ImageMemoryCache {
    fn put(&self, key: CacheKey, image: CachedImage) {
        let image_cost = image.cost();
        let mut inner = self.lock();

        if let Some(old) = inner.entries.pop(&key) {
            inner.cost = inner.cost.saturating_sub(old.cost());
        }

        // Never admit an image that can not fit on its own.
        if image_cost > self.max_cost {
            trace!(key = %key, cost = image_cost, "Image exceeds memory cost limit, not cached");
            return;
        }

        // `push` evicts the LRU entry when the count limit is reached.
        if let Some((_, evicted)) = inner.entries.push(key, image) {
            inner.cost = inner.cost.saturating_sub(evicted.cost());
        }
        inner.cost += image_cost;

        while inner.cost > self.max_cost {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.cost = inner.cost.saturating_sub(evicted.cost()),
                None => break,
            }
        }
    }

    fn get(&self, key: &CacheKey) -> Option<CachedImage> {
        self.lock().entries.get(key).cloned()
    }

    fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.cost = 0;
    }
}
