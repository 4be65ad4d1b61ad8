//! Cache orchestrator.
//!
//! [`ImageCache`] is the single entry point for image lookups:
//!
//! ```text
//! load_image(url)
//!   1. key = derive_key(url)
//!   2. memory hit          → return
//!   3. disk hit            → fill memory, return
//!   4. fetch + decode      → fill memory and disk, return
//!   any failure            → None (logged)
//! ```
//!
//! # Single-flight
//!
//! With single-flight enabled (the default), concurrent loads for the same
//! key share one trip to disk and network. The first caller becomes the
//! leader; followers wait on a watch channel for its result. If the leader is
//! cancelled before finishing, a follower takes over.
//!
//! With single-flight disabled, concurrent misses fetch independently and the
//! last `put` into the memory tier wins.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};

use super::codec::CachedImage;
use super::key::{derive_key, CacheKey};
use super::{DiskCache, MemoryCache};
use crate::error::CacheError;
use crate::fetch::Fetcher;

/// `None` while the leader is still loading.
type FlightResult = Option<Option<CachedImage>>;

type InFlight = Mutex<HashMap<CacheKey, watch::Receiver<FlightResult>>>;

enum Flight {
    Leader(watch::Sender<FlightResult>),
    Follower(watch::Receiver<FlightResult>),
}

/// Releases a key's in-flight slot when the leader finishes or is dropped.
struct FlightGuard<'a> {
    in_flight: &'a InFlight,
    key: &'a CacheKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.key);
    }
}

/// Two-tier image cache in front of a [`Fetcher`].
///
/// Construct one per application and share it (for example behind an `Arc`)
/// with everything that loads images.
///
/// # Type Parameters
///
/// * `M` - memory tier
/// * `D` - disk tier
/// * `F` - network fetcher
///
/// # Example
///
/// ```no_run
/// use recipe_image_cache::cache::{ImageCache, ImageDiskCache, ImageMemoryCache};
/// use recipe_image_cache::fetch::HttpFetcher;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = ImageCache::new(
///     ImageMemoryCache::new(),
///     ImageDiskCache::new("/tmp/recipe-images"),
///     HttpFetcher::new()?,
/// );
///
/// if let Some(image) = cache.load_image("https://example.com/photo.jpg").await {
///     println!("{:?}", image.dimensions());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ImageCache<M, D, F> {
    memory: M,
    disk: D,
    fetcher: F,
    single_flight: bool,
    in_flight: InFlight,
}

impl<M: MemoryCache, D: DiskCache, F: Fetcher> ImageCache<M, D, F> {
    /// Create a cache over the given tiers with single-flight enabled.
    pub fn new(memory: M, disk: D, fetcher: F) -> Self {
        Self {
            memory,
            disk,
            fetcher,
            single_flight: true,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Enable or disable coalescing of concurrent loads for the same URL.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Load an image by URL from memory, disk or the network.
    ///
    /// Never fails: fetch, decode and storage errors are logged and reported
    /// as `None`. A failed disk write does not affect the returned image.
    pub async fn load_image(&self, url: &str) -> Option<CachedImage> {
        let key = derive_key(url);

        if let Some(image) = self.memory.get(&key) {
            debug!(key = %key, "Memory cache hit");
            return Some(image);
        }

        if self.single_flight {
            self.load_coalesced(url, key).await
        } else {
            self.load_uncached(url, &key).await
        }
    }

    async fn load_coalesced(&self, url: &str, key: CacheKey) -> Option<CachedImage> {
        loop {
            let flight = {
                let mut in_flight = self.lock_in_flight();
                let existing = in_flight.get(&key).cloned();
                match existing {
                    Some(rx) => Flight::Follower(rx),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        in_flight.insert(key.clone(), rx);
                        Flight::Leader(tx)
                    }
                }
            };

            match flight {
                Flight::Leader(tx) => {
                    let _guard = FlightGuard {
                        in_flight: &self.in_flight,
                        key: &key,
                    };

                    // A previous leader may have finished since our miss.
                    let image = match self.memory.get(&key) {
                        Some(image) => Some(image),
                        None => self.load_uncached(url, &key).await,
                    };
                    tx.send_replace(Some(image.clone()));
                    return image;
                }
                Flight::Follower(mut rx) => {
                    debug!(key = %key, "Waiting on in-flight load");
                    let result = rx
                        .wait_for(Option::is_some)
                        .await
                        .map(|result| (*result).clone().flatten());
                    match result {
                        Ok(image) => return image,
                        // Leader dropped without a result; take over.
                        Err(_) => continue,
                    }
                }
            }
        }
    }

    /// Disk, then network. Fills the tiers above whichever one answers.
    async fn load_uncached(&self, url: &str, key: &CacheKey) -> Option<CachedImage> {
        if let Some(image) = self.disk.retrieve(key).await {
            debug!(key = %key, "Disk cache hit");
            self.memory.put(key.clone(), image.clone());
            return Some(image);
        }

        debug!(key = %key, url = url, "Cache miss, fetching");

        let data = match self.fetcher.fetch_bytes(url).await {
            Ok(data) => data,
            Err(e) => {
                warn!(url = url, error = %e, "Failed to fetch image");
                return None;
            }
        };

        let image = match CachedImage::decode(&data) {
            Ok(image) => image,
            Err(e) => {
                warn!(url = url, error = %e, "Fetched data is not a decodable image");
                return None;
            }
        };

        self.put_both(key, &image).await;
        Some(image)
    }

    async fn put_both(&self, key: &CacheKey, image: &CachedImage) {
        self.memory.put(key.clone(), image.clone());
        if let Err(e) = self.disk.store(key, image).await {
            warn!(key = %key, error = %e, "Failed to store image on disk");
        }
    }

    /// Explicitly cache an image under the key derived from `url`.
    pub async fn cache_image(&self, url: &str, image: &CachedImage) {
        self.put_both(&derive_key(url), image).await;
    }

    /// Look up an image in memory, then on disk, without touching the network.
    pub async fn cached_image(&self, url: &str) -> Option<CachedImage> {
        let key = derive_key(url);
        if let Some(image) = self.memory.get(&key) {
            return Some(image);
        }
        let image = self.disk.retrieve(&key).await?;
        self.memory.put(key, image.clone());
        Some(image)
    }

    /// Empty both tiers.
    pub async fn clear_cache(&self) -> Result<(), CacheError> {
        self.memory.clear();
        self.disk.clear().await
    }

    /// Bytes currently used by the disk tier.
    pub async fn disk_usage(&self) -> u64 {
        self.disk.total_size().await
    }

    /// Whether concurrent loads are coalesced.
    pub fn single_flight(&self) -> bool {
        self.single_flight
    }

    /// The memory tier.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// The disk tier.
    pub fn disk(&self) -> &D {
        &self.disk
    }

    /// The fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, watch::Receiver<FlightResult>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
