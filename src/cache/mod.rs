//! Two-tier image cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Recipe Pipeline              │
//! └────────────────────┬────────────────────┘
//!                      │ load_image(url)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               ImageCache                │
//! │  ┌────────────┐ ┌──────────┐ ┌────────┐ │
//! │  │ Memory     │ │ Disk     │ │Fetcher │ │
//! │  │ (decoded,  │→│ (JPEG    │→│ (HTTP) │ │
//! │  │  LRU)      │ │  files)  │ │        │ │
//! │  └────────────┘ └──────────┘ └────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A lookup derives a [`CacheKey`] from the URL, then tries memory, disk and
//! the network in that order. Whatever tier answers, the tiers above it are
//! filled on the way back.
//!
//! # Components
//!
//! - [`derive_key`]: URL to filesystem-safe key
//! - [`ImageMemoryCache`]: count- and cost-bounded LRU of decoded images
//! - [`ImageDiskCache`]: JPEG files under a byte quota, least-recently-accessed eviction
//! - [`ImageCache`]: the orchestrator, optionally coalescing concurrent loads
//!
//! Both tiers sit behind traits ([`MemoryCache`], [`DiskCache`]) so tests can
//! substitute their own implementations.

mod codec;
mod disk;
mod key;
mod memory;
mod service;

use async_trait::async_trait;

use crate::error::CacheError;

pub use codec::{
    clamp_quality, encode_jpeg, jpeg_quality_from_fraction, CachedImage, DEFAULT_ENCODE_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use disk::{EvictionResult, ImageDiskCache, DEFAULT_DISK_QUOTA};
pub use key::{derive_key, CacheKey, FORBIDDEN_KEY_CHARS, KEY_SUBSTITUTE};
pub use memory::{ImageMemoryCache, DEFAULT_MEMORY_COST_LIMIT, DEFAULT_MEMORY_ENTRY_LIMIT};
pub use service::ImageCache;

/// Volatile key→image store.
///
/// Operations are synchronous. After `put` returns the implementation must be
/// within its own limits; which entries it dropped to get there is opaque.
pub trait MemoryCache: Send + Sync {
    /// Insert or replace an image.
    fn put(&self, key: CacheKey, image: CachedImage);

    /// Look up an image. `None` is a miss, not an error.
    fn get(&self, key: &CacheKey) -> Option<CachedImage>;

    /// Drop every entry.
    fn clear(&self);
}

/// Durable key→image store under a byte quota.
#[async_trait]
pub trait DiskCache: Send + Sync {
    /// Encode and write an image, then enforce the quota.
    ///
    /// Fails with [`CacheError::Encode`] (leaving no file) if the image can not
    /// be encoded.
    async fn store(&self, key: &CacheKey, image: &CachedImage) -> Result<(), CacheError>;

    /// Read and decode an image, counting as an access for eviction.
    ///
    /// Missing or unreadable entries are `None`.
    async fn retrieve(&self, key: &CacheKey) -> Option<CachedImage>;

    /// Total bytes currently stored.
    async fn total_size(&self) -> u64;

    /// Evict least-recently-accessed entries until under the quota.
    async fn enforce_quota(&self) -> Result<EvictionResult, CacheError>;

    /// Delete one entry. Returns whether it existed.
    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Delete every entry.
    async fn clear(&self) -> Result<(), CacheError>;
}
