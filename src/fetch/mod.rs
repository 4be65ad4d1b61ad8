//! Network retrieval of raw bytes.
//!
//! The [`Fetcher`] trait is the seam between the cache (and recipe pipeline)
//! and the network, so both can run against in-memory doubles in tests.

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

pub use http::{HttpFetcher, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT};

/// Trait for fetching the body behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full body of `url`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` is not a valid http(s) URL
    /// - [`FetchError::Network`] on transport failures
    /// - [`FetchError::InvalidResponse`] on non-2xx statuses
    /// - [`FetchError::Unknown`] if the response carried no data
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
        (**self).fetch_bytes(url).await
    }
}
