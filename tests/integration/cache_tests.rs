//! Cache behavior integration tests.
//!
//! Tests verify:
//! - A full miss fetches once and fills both tiers
//! - The disk tier survives a fresh cache over the same directory
//! - The quota holds across a sequence of stores
//! - Concurrent loads of one URL share a single fetch

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recipe_image_cache::{
    derive_key, CachedImage, DiskCache, HttpFetcher, ImageCache, ImageDiskCache,
    ImageMemoryCache, MemoryCache,
};

use super::test_utils::{cache_with, is_valid_jpeg, jpeg_bytes, png_bytes, CountingFetcher};

// =============================================================================
// Tier Fill
// =============================================================================

#[tokio::test]
async fn test_miss_fetches_once_then_hits_memory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg_bytes(32, 24, 1).to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let (cache, _temp) = cache_with(HttpFetcher::new().unwrap());
    let url = format!("{}/photo.jpg", server.uri());

    let first = cache.load_image(&url).await.expect("first load");
    let second = cache.load_image(&url).await.expect("second load");

    assert_eq!(first.dimensions(), (32, 24));
    assert!(first.ptr_eq(&second));

    let key = derive_key(&url);
    assert!(cache.memory().contains(&key));
    assert!(cache.disk().entry_path(&key).exists());
}

#[tokio::test]
async fn test_png_source_is_stored_as_jpeg() {
    let url = "https://img.test/photo.png";
    let fetcher = CountingFetcher::new().with_body(url, png_bytes(20, 10, 3));
    let (cache, _temp) = cache_with(fetcher);

    let image = cache.load_image(url).await.unwrap();
    assert_eq!(image.dimensions(), (20, 10));

    let stored = std::fs::read(cache.disk().entry_path(&derive_key(url))).unwrap();
    assert!(is_valid_jpeg(&stored));
}

#[tokio::test]
async fn test_disk_survives_new_cache_instance() {
    let temp = TempDir::new().unwrap();
    let url = "https://img.test/a/large.jpg";

    let first_fetcher = CountingFetcher::new().with_body(url, jpeg_bytes(16, 16, 1));
    let first = ImageCache::new(
        ImageMemoryCache::new(),
        ImageDiskCache::new(temp.path()),
        first_fetcher.clone(),
    );
    first.load_image(url).await.unwrap();
    assert_eq!(first_fetcher.calls(), 1);
    drop(first);

    // Same directory, empty memory, a fetcher that knows nothing.
    let second_fetcher = CountingFetcher::new();
    let second = ImageCache::new(
        ImageMemoryCache::new(),
        ImageDiskCache::new(temp.path()),
        second_fetcher.clone(),
    );

    let image = second.load_image(url).await.expect("served from disk");
    assert_eq!(image.dimensions(), (16, 16));
    assert_eq!(second_fetcher.calls(), 0);
    assert!(second.memory().contains(&derive_key(url)));
}

#[tokio::test]
async fn test_failed_fetch_leaves_no_trace() {
    let fetcher = CountingFetcher::new();
    let (cache, _temp) = cache_with(fetcher);
    let url = "https://img.test/missing.jpg";

    assert!(cache.load_image(url).await.is_none());

    let key = derive_key(url);
    assert!(cache.memory().get(&key).is_none());
    assert!(cache.disk().retrieve(&key).await.is_none());
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let url = "https://img.test/a.jpg";
    let fetcher = CountingFetcher::new().with_body(url, jpeg_bytes(8, 8, 1));
    let (cache, _temp) = cache_with(fetcher.clone());

    cache.load_image(url).await.unwrap();
    cache.clear_cache().await.unwrap();
    assert_eq!(cache.disk_usage().await, 0);

    cache.load_image(url).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

// =============================================================================
// Quota
// =============================================================================

#[tokio::test]
async fn test_quota_holds_across_many_loads() {
    let temp = TempDir::new().unwrap();
    let mut fetcher = CountingFetcher::new();
    let urls: Vec<String> = (0..12)
        .map(|i| format!("https://img.test/photos/{}.jpg", i))
        .collect();
    for (i, url) in urls.iter().enumerate() {
        fetcher = fetcher.with_body(url, jpeg_bytes(48, 48, i as u32));
    }

    // Room for a few images, not all of them.
    let sample = CachedImage::decode(&jpeg_bytes(48, 48, 0)).unwrap();
    let probe = ImageDiskCache::new(temp.path().join("probe"));
    probe.store(&derive_key("probe"), &sample).await.unwrap();
    let one_file = probe.total_size().await;
    let quota = one_file * 3 + one_file / 2;

    let cache = ImageCache::new(
        ImageMemoryCache::new(),
        ImageDiskCache::with_options(temp.path().join("cache"), quota, 0.75),
        fetcher,
    );

    for url in &urls {
        assert!(cache.load_image(url).await.is_some());
        assert!(cache.disk_usage().await <= quota);
    }

    // The most recent load is always kept.
    let last = derive_key(urls.last().unwrap());
    assert!(cache.disk().entry_path(&last).exists());
}

#[tokio::test]
async fn test_memory_limits_hold_across_loads() {
    let mut fetcher = CountingFetcher::new();
    let urls: Vec<String> = (0..10)
        .map(|i| format!("https://img.test/{}.jpg", i))
        .collect();
    for (i, url) in urls.iter().enumerate() {
        fetcher = fetcher.with_body(url, jpeg_bytes(10, 10, i as u32));
    }

    let temp = TempDir::new().unwrap();
    // 10x10 RGB = 300 bytes decoded.
    let cache = ImageCache::new(
        ImageMemoryCache::with_limits(4, 900),
        ImageDiskCache::new(temp.path()),
        fetcher,
    );

    for url in &urls {
        cache.load_image(url).await.unwrap();
        assert!(cache.memory().len() <= 4);
        assert!(cache.memory().cost() <= 900);
    }
    assert_eq!(cache.memory().len(), 3);
}

// =============================================================================
// Single-Flight
// =============================================================================

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch() {
    let url = "https://img.test/shared.jpg";
    let fetcher = CountingFetcher::new()
        .with_body(url, jpeg_bytes(16, 16, 1))
        .with_delay(Duration::from_millis(100));
    let (cache, _temp) = cache_with(fetcher.clone());
    let cache = Arc::new(cache);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.load_image(url).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_loads_over_http_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(jpeg_bytes(16, 16, 2).to_vec())
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (cache, _temp) = cache_with(HttpFetcher::new().unwrap());
    let cache = Arc::new(cache);
    let url = format!("{}/slow.jpg", server.uri());

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..5 {
        let cache = Arc::clone(&cache);
        let url = url.clone();
        tasks.spawn(async move { cache.load_image(&url).await.is_some() });
    }
    while let Some(loaded) = tasks.join_next().await {
        assert!(loaded.unwrap());
    }
}

#[tokio::test]
async fn test_without_single_flight_each_load_fetches() {
    let url = "https://img.test/shared.jpg";
    let fetcher = CountingFetcher::new()
        .with_body(url, jpeg_bytes(16, 16, 1))
        .with_delay(Duration::from_millis(100));
    let (cache, _temp) = cache_with(fetcher.clone());
    let cache = Arc::new(cache.with_single_flight(false));

    let a = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.load_image(url).await })
    };
    let b = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.load_image(url).await })
    };

    assert!(a.await.unwrap().is_some());
    assert!(b.await.unwrap().is_some());
    assert_eq!(fetcher.calls(), 2);
}
