//! Cache key derivation.
//!
//! Image URLs are turned into keys that double as file names in the disk
//! tier, so every character that is a path separator or reserved on common
//! filesystems is replaced by [`KEY_SUBSTITUTE`].

use std::fmt;
use std::sync::Arc;

/// Characters that may not appear in a cache key.
pub const FORBIDDEN_KEY_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '.'];

/// Replacement for every forbidden character.
pub const KEY_SUBSTITUTE: char = '#';

/// Filesystem-safe identifier derived from a source URL.
///
/// Cloning is cheap; the string is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// The key as a string slice (also the file name on disk).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the cache key for a URL.
///
/// Pure and infallible. Distinct URLs that differ only in forbidden
/// characters map to the same key.
///
/// # Example
///
/// ```
/// use recipe_image_cache::cache::derive_key;
///
/// let key = derive_key("https://example.com/photos/small.jpg");
/// assert_eq!(key.as_str(), "https###example#com#photos#small#jpg");
/// ```
pub fn derive_key(url: &str) -> CacheKey {
    let key: String = url
        .chars()
        .map(|c| {
            if FORBIDDEN_KEY_CHARS.contains(&c) {
                KEY_SUBSTITUTE
            } else {
                c
            }
        })
        .collect();
    CacheKey(key.into())
}
