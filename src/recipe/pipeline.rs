//! Recipe feed loading and image warm-up.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::model::{parse_recipes, Recipe};
use crate::cache::{DiskCache, ImageCache, MemoryCache};
use crate::error::RecipeError;
use crate::fetch::Fetcher;

/// Production recipe feed.
pub const DEFAULT_FEED_URL: &str = "https://d3jbb8n5wk0qxi.cloudfront.net/recipes.json";

/// Feed variant with malformed entries, for manual testing.
pub const MALFORMED_FEED_URL: &str =
    "https://d3jbb8n5wk0qxi.cloudfront.net/recipes-malformed.json";

/// Feed variant with no recipes, for manual testing.
pub const EMPTY_FEED_URL: &str = "https://d3jbb8n5wk0qxi.cloudfront.net/recipes-empty.json";

/// Outcome of [`RecipePipeline::load_recipes`].
#[derive(Debug, Clone)]
pub struct RecipeLoad {
    /// Recipes in feed order
    pub recipes: Vec<Recipe>,

    /// Photos that ended up in the cache
    pub images_cached: usize,

    /// Photos that could not be loaded
    pub images_failed: usize,
}

/// Fetches the recipe feed and warms the image cache for every photo.
///
/// The pipeline reuses the cache's fetcher for the feed itself.
pub struct RecipePipeline<M, D, F> {
    cache: Arc<ImageCache<M, D, F>>,
    feed_url: String,
}

impl<M, D, F> RecipePipeline<M, D, F>
where
    M: MemoryCache + 'static,
    D: DiskCache + 'static,
    F: Fetcher + 'static,
{
    /// Create a pipeline reading [`DEFAULT_FEED_URL`].
    pub fn new(cache: Arc<ImageCache<M, D, F>>) -> Self {
        Self {
            cache,
            feed_url: DEFAULT_FEED_URL.to_string(),
        }
    }

    /// Read the feed from another URL.
    pub fn with_feed_url(mut self, feed_url: impl Into<String>) -> Self {
        self.feed_url = feed_url.into();
        self
    }

    /// The feed URL.
    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// The shared image cache.
    pub fn cache(&self) -> &Arc<ImageCache<M, D, F>> {
        &self.cache
    }

    /// Fetch and decode the feed.
    pub async fn fetch_recipes(&self) -> Result<Vec<Recipe>, RecipeError> {
        let data = self.cache.fetcher().fetch_bytes(&self.feed_url).await?;
        let recipes = parse_recipes(&data)?;
        debug!(feed_url = %self.feed_url, count = recipes.len(), "Recipe feed decoded");
        Ok(recipes)
    }

    /// Fetch the feed, then load every recipe photo through the cache.
    ///
    /// Image failures are counted, not returned as errors.
    pub async fn load_recipes(&self) -> Result<RecipeLoad, RecipeError> {
        let recipes = self.fetch_recipes().await?;
        let (images_cached, images_failed) = self.warm_images(&recipes).await;

        info!(
            recipes = recipes.len(),
            images_cached = images_cached,
            images_failed = images_failed,
            "Recipes loaded"
        );

        Ok(RecipeLoad {
            recipes,
            images_cached,
            images_failed,
        })
    }

    /// Load both photos of every recipe concurrently.
    ///
    /// Returns `(cached, failed)` counts.
    pub async fn warm_images(&self, recipes: &[Recipe]) -> (usize, usize) {
        let mut tasks = JoinSet::new();
        for url in recipes.iter().flat_map(Recipe::photo_urls) {
            let cache = Arc::clone(&self.cache);
            let url = url.to_string();
            tasks.spawn(async move { cache.load_image(&url).await.is_some() });
        }

        let mut cached = 0;
        let mut failed = 0;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(true) => cached += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    warn!(error = %e, "Image load task failed");
                    failed += 1;
                }
            }
        }
        (cached, failed)
    }
}
