//! # Recipe Image Cache
//!
//! A two-tier image cache for a recipe browsing client.
//!
//! Recipe photos are loaded by URL. Each load checks a bounded in-memory
//! cache of decoded images, then a quota-limited directory of JPEG files,
//! and only then goes to the network. Whatever tier answers fills the tiers
//! above it.
//!
//! ## Features
//!
//! - **Deterministic keys**: every URL maps to a filesystem-safe key
//! - **Memory tier**: LRU bounded by entry count and decoded byte cost
//! - **Disk tier**: atomic JPEG writes, byte quota, least-recently-accessed eviction
//! - **Single-flight**: concurrent loads of one URL share a single fetch
//! - **Recipe feed**: decode the catalog and warm the cache for every photo
//!
//! ## Architecture
//!
//! - [`cache`] - Key derivation, memory and disk tiers, and the orchestrator
//! - [`fetch`] - The [`Fetcher`] trait and its HTTP implementation
//! - [`recipe`] - Feed model and the loading pipeline
//! - [`config`] - Cache settings and the CLI
//! - [`error`] - Error types for each layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recipe_image_cache::{HttpFetcher, ImageCache, ImageDiskCache, ImageMemoryCache, RecipePipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = ImageCache::new(
//!         ImageMemoryCache::new(),
//!         ImageDiskCache::new("/tmp/recipe-images"),
//!         HttpFetcher::new()?,
//!     );
//!
//!     let pipeline = RecipePipeline::new(Arc::new(cache));
//!     let load = pipeline.load_recipes().await?;
//!     println!("{} recipes, {} photos cached", load.recipes.len(), load.images_cached);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod recipe;

// Re-export commonly used types
pub use cache::{
    derive_key, CacheKey, CachedImage, DiskCache, EvictionResult, ImageCache, ImageDiskCache,
    ImageMemoryCache, MemoryCache,
};
pub use config::{CacheArgs, CacheConfig, Cli, Command, LoadArgs};
pub use error::{CacheError, FetchError, RecipeError};
pub use fetch::{Fetcher, HttpFetcher};
pub use recipe::{Recipe, RecipeLoad, RecipePipeline};
