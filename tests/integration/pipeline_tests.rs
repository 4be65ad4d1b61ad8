//! Recipe pipeline integration tests.
//!
//! A mock server hosts the feed and every photo; the pipeline runs against the
//! real HTTP fetcher and disk tier.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recipe_image_cache::error::{FetchError, RecipeError};
use recipe_image_cache::{derive_key, HttpFetcher, RecipePipeline};

use super::test_utils::{cache_with, mount_feed, recipe_json};

#[tokio::test]
async fn test_load_recipes_caches_every_photo() {
    let server = MockServer::start().await;
    let feed_url = mount_feed(&server, &["r1", "r2", "r3"]).await;

    let (cache, _temp) = cache_with(HttpFetcher::new().unwrap());
    let pipeline = RecipePipeline::new(Arc::new(cache)).with_feed_url(feed_url);

    let load = pipeline.load_recipes().await.unwrap();

    assert_eq!(load.recipes.len(), 3);
    assert_eq!(load.recipes[0].name, "Recipe r1");
    assert_eq!(load.images_cached, 6);
    assert_eq!(load.images_failed, 0);

    let cache = pipeline.cache();
    for recipe in &load.recipes {
        for url in recipe.photo_urls() {
            assert!(cache.disk().entry_path(&derive_key(url)).exists());
        }
    }
}

#[tokio::test]
async fn test_second_load_serves_photos_from_cache() {
    let server = MockServer::start().await;
    let feed_url = mount_feed(&server, &["r1", "r2"]).await;

    let (cache, _temp) = cache_with(HttpFetcher::new().unwrap());
    let pipeline = RecipePipeline::new(Arc::new(cache)).with_feed_url(feed_url);

    pipeline.load_recipes().await.unwrap();
    let photo_requests = |requests: &[wiremock::Request]| {
        requests
            .iter()
            .filter(|r| r.url.path().starts_with("/photos/"))
            .count()
    };
    let after_first = photo_requests(&server.received_requests().await.unwrap());

    let load = pipeline.load_recipes().await.unwrap();
    let after_second = photo_requests(&server.received_requests().await.unwrap());

    assert_eq!(load.images_cached, 4);
    assert_eq!(after_first, 4);
    assert_eq!(after_second, 4);
}

#[tokio::test]
async fn test_missing_photo_counts_as_failed() {
    let server = MockServer::start().await;
    let base = server.uri();
    let feed = format!(
        r#"{{"recipes": [{}]}}"#,
        recipe_json(&base, "lonely", "No Photos")
    );
    Mock::given(method("GET"))
        .and(path("/recipes.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&server)
        .await;

    let (cache, _temp) = cache_with(HttpFetcher::new().unwrap());
    let pipeline =
        RecipePipeline::new(Arc::new(cache)).with_feed_url(format!("{}/recipes.json", base));

    let load = pipeline.load_recipes().await.unwrap();
    assert_eq!(load.recipes.len(), 1);
    assert_eq!(load.images_cached, 0);
    assert_eq!(load.images_failed, 2);
}

#[tokio::test]
async fn test_empty_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recipes-empty.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"recipes": []}"#))
        .mount(&server)
        .await;

    let (cache, _temp) = cache_with(HttpFetcher::new().unwrap());
    let pipeline = RecipePipeline::new(Arc::new(cache))
        .with_feed_url(format!("{}/recipes-empty.json", server.uri()));

    let load = pipeline.load_recipes().await.unwrap();
    assert!(load.recipes.is_empty());
    assert_eq!(load.images_cached + load.images_failed, 0);
}

#[tokio::test]
async fn test_malformed_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recipes-malformed.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"recipes": [{"uuid": "x", "cuisine": 7}]}"#),
        )
        .mount(&server)
        .await;

    let (cache, _temp) = cache_with(HttpFetcher::new().unwrap());
    let pipeline = RecipePipeline::new(Arc::new(cache))
        .with_feed_url(format!("{}/recipes-malformed.json", server.uri()));

    let err = pipeline.load_recipes().await.unwrap_err();
    assert!(matches!(err, RecipeError::Decoding(_)));
    assert_eq!(
        err.user_message(),
        "Failed to decode the response. Please try again later."
    );
}

#[tokio::test]
async fn test_feed_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (cache, _temp) = cache_with(HttpFetcher::new().unwrap());
    let pipeline = RecipePipeline::new(Arc::new(cache))
        .with_feed_url(format!("{}/recipes.json", server.uri()));

    let err = pipeline.load_recipes().await.unwrap_err();
    assert_eq!(
        err,
        RecipeError::Fetch(FetchError::InvalidResponse { status: 500 })
    );
}
