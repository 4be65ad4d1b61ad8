//! On-disk image tier.
//!
//! Images are stored as JPEG files in a single flat directory, one file per
//! [`CacheKey`]. There is no manifest: the directory listing is the index.
//!
//! # Quota
//!
//! Every `store` ends with a synchronous quota check. When the directory
//! holds more than `quota` bytes, files are deleted oldest-access-first until
//! the total is back under the quota or nothing is left.
//!
//! # Access Times
//!
//! Recency is the file's access time. Many systems mount with `noatime` or
//! `relatime`, so the tier sets the access time itself on every store and
//! retrieve instead of relying on the kernel.
//!
//! # Concurrency
//!
//! Filesystem work runs on the blocking pool. There is no locking: writers of
//! the same key race and the last rename wins.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use filetime::FileTime;
use tracing::{debug, info, warn};

use super::codec::{encode_jpeg, jpeg_quality_from_fraction, CachedImage, DEFAULT_ENCODE_QUALITY};
use super::key::CacheKey;
use super::DiskCache;
use crate::error::CacheError;

/// Default disk quota: 100 MiB.
pub const DEFAULT_DISK_QUOTA: u64 = 100 * 1024 * 1024;

/// Result of a quota enforcement run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionResult {
    /// Number of files deleted
    pub files_deleted: usize,
    /// Total bytes freed
    pub bytes_freed: u64,
    /// Directory size before eviction
    pub size_before: u64,
    /// Directory size after eviction
    pub size_after: u64,
}

/// One file in the cache directory.
#[derive(Debug)]
struct DiskEntry {
    path: PathBuf,
    size: u64,
    /// `None` when the platform can not report an access time.
    accessed: Option<SystemTime>,
}

/// JPEG-on-disk tier with a byte quota.
///
/// Cloning is cheap and clones share the same directory.
///
/// # Example
///
/// ```no_run
/// use recipe_image_cache::cache::{derive_key, DiskCache, ImageDiskCache};
///
/// # async fn demo() {
/// let disk = ImageDiskCache::with_options("/tmp/recipe-images", 50 * 1024 * 1024, 0.8);
/// let key = derive_key("https://example.com/a.jpg");
///
/// if disk.retrieve(&key).await.is_none() {
///     println!("cache miss");
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ImageDiskCache {
    dir: PathBuf,
    quota: u64,
    quality: u8,
}

impl ImageDiskCache {
    /// Create a tier in `dir` with the default quota (100 MiB) and quality (0.75).
    ///
    /// The directory is created lazily on the first store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_options(dir, DEFAULT_DISK_QUOTA, DEFAULT_ENCODE_QUALITY)
    }

    /// Create a tier with an explicit quota in bytes and a fractional encode quality.
    pub fn with_options(dir: impl Into<PathBuf>, quota: u64, quality: f32) -> Self {
        Self {
            dir: dir.into(),
            quota,
            quality: jpeg_quality_from_fraction(quality),
        }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The quota in bytes.
    pub fn quota(&self) -> u64 {
        self.quota
    }

    /// JPEG quality (1-100) used for stored images.
    pub fn jpeg_quality(&self) -> u8 {
        self.quality
    }

    /// Path of the file backing `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    fn store_blocking(&self, key: &CacheKey, image: &CachedImage) -> Result<(), CacheError> {
        // Encode first so a failure leaves nothing behind.
        let data = encode_jpeg(image, self.quality)?;

        fs::create_dir_all(&self.dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;

        let path = self.entry_path(key);
        tmp.persist(&path)
            .map_err(|e| CacheError::Io(e.error.to_string()))?;
        touch(&path);

        debug!(key = %key, bytes = data.len(), "Stored image on disk");

        let result = evict_to_quota(&self.dir, self.quota)?;
        if result.files_deleted > 0 {
            log_eviction_result(&result);
        }
        Ok(())
    }

    fn retrieve_blocking(&self, key: &CacheKey) -> Option<CachedImage> {
        let path = self.entry_path(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(key = %key, error = %e, "Failed to read disk cache entry");
                return None;
            }
        };

        match CachedImage::decode(&data) {
            Ok(image) => {
                touch(&path);
                Some(image)
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Disk cache entry is not a decodable image");
                None
            }
        }
    }

    fn remove_blocking(&self, key: &CacheKey) -> Result<bool, CacheError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn clear_blocking(&self) -> Result<(), CacheError> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.dir)?;
        info!(dir = %self.dir.display(), "Disk cache cleared");
        Ok(())
    }
}

#[async_trait]
impl DiskCache for ImageDiskCache {
    async fn store(&self, key: &CacheKey, image: &CachedImage) -> Result<(), CacheError> {
        let this = self.clone();
        let key = key.clone();
        let image = image.clone();
        run_blocking(move || this.store_blocking(&key, &image)).await
    }

    async fn retrieve(&self, key: &CacheKey) -> Option<CachedImage> {
        let this = self.clone();
        let key = key.clone();
        run_blocking(move || Ok(this.retrieve_blocking(&key)))
            .await
            .ok()
            .flatten()
    }

    async fn total_size(&self) -> u64 {
        let dir = self.dir.clone();
        run_blocking(move || Ok(directory_size(&dir)))
            .await
            .unwrap_or(0)
    }

    async fn enforce_quota(&self) -> Result<EvictionResult, CacheError> {
        let dir = self.dir.clone();
        let quota = self.quota;
        let result = run_blocking(move || evict_to_quota(&dir, quota)).await?;
        if result.files_deleted > 0 {
            log_eviction_result(&result);
        }
        Ok(result)
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let this = self.clone();
        let key = key.clone();
        run_blocking(move || this.remove_blocking(&key)).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let this = self.clone();
        run_blocking(move || this.clear_blocking()).await
    }
}

// =============================================================================
// Blocking Helpers
// =============================================================================

/// Run filesystem work on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T, CacheError>
where
    F: FnOnce() -> Result<T, CacheError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CacheError::Io(format!("blocking task failed: {}", e)))?
}

/// Mark a file as accessed now.
fn touch(path: &Path) {
    if let Err(e) = filetime::set_file_atime(path, FileTime::now()) {
        debug!(path = %path.display(), error = %e, "Failed to update access time");
    }
}

/// Sum the sizes of all regular files in `dir`.
///
/// Best effort: a missing directory is empty and files that vanish during
/// the scan count as zero.
fn directory_size(dir: &Path) -> u64 {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                debug!(dir = %dir.display(), error = %e, "Failed to list cache directory");
            }
            return 0;
        }
    };

    entries
        .flatten()
        .filter_map(|entry| entry.metadata().ok())
        .filter(|metadata| metadata.is_file())
        .map(|metadata| metadata.len())
        .sum()
}

/// Collect all files in `dir` with their size and access time.
fn collect_entries(dir: &Path) -> Result<Vec<DiskEntry>, CacheError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        files.push(DiskEntry {
            path: entry.path(),
            size: metadata.len(),
            accessed: metadata.accessed().ok(),
        });
    }
    Ok(files)
}

/// Delete least-recently-accessed files until `dir` fits in `quota`.
fn evict_to_quota(dir: &Path, quota: u64) -> Result<EvictionResult, CacheError> {
    let size_before = directory_size(dir);
    if size_before <= quota {
        return Ok(EvictionResult {
            size_before,
            size_after: size_before,
            ..Default::default()
        });
    }

    let mut files = collect_entries(dir)?;

    // Oldest first; a missing access time sorts before every real one.
    files.sort_by(|a, b| {
        a.accessed
            .cmp(&b.accessed)
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut remaining = size_before;
    let mut files_deleted = 0usize;
    let mut bytes_freed = 0u64;

    for file in files {
        if remaining <= quota {
            break;
        }

        match fs::remove_file(&file.path) {
            Ok(()) => {
                remaining = remaining.saturating_sub(file.size);
                bytes_freed += file.size;
                files_deleted += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Removed concurrently; its bytes are gone either way.
                remaining = remaining.saturating_sub(file.size);
            }
            Err(e) => {
                warn!(
                    path = %file.path.display(),
                    error = %e,
                    "Failed to delete cache file during eviction"
                );
            }
        }
    }

    if remaining > quota {
        warn!(
            remaining_bytes = remaining,
            quota_bytes = quota,
            "Eviction could not bring disk cache under quota"
        );
    }

    Ok(EvictionResult {
        files_deleted,
        bytes_freed,
        size_before,
        size_after: remaining,
    })
}

fn log_eviction_result(result: &EvictionResult) {
    info!(
        files_deleted = result.files_deleted,
        bytes_freed = result.bytes_freed,
        size_before = result.size_before,
        size_after = result.size_after,
        "Disk cache eviction complete"
    );
}
