//! Configuration management for the recipe image cache.
//!
//! Settings come from three places, highest priority first:
//! - Command-line arguments via clap
//! - Environment variables with the `RECIPE_` prefix
//! - Defaults matching the library constants
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use recipe_image_cache::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! if let Command::Stats(args) = cli.command {
//!     let config = args.into_config();
//!     println!("Cache dir: {}", config.cache_dir.display());
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RECIPE_CACHE_DIR` - Disk cache directory (default: platform cache dir)
//! - `RECIPE_MEMORY_ENTRIES` - Max decoded images in memory (default: 100)
//! - `RECIPE_MEMORY_BYTES` - Max decoded bytes in memory (default: 10 MiB)
//! - `RECIPE_DISK_QUOTA` - Disk quota in bytes (default: 100 MiB)
//! - `RECIPE_JPEG_QUALITY` - Encode quality as a fraction (default: 0.75)
//! - `RECIPE_NO_SINGLE_FLIGHT` - Disable coalescing of concurrent loads
//! - `RECIPE_TIMEOUT` - Request timeout in seconds (default: 30)
//! - `RECIPE_FEED_URL` - Recipe feed URL for `load`

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cache::{
    DEFAULT_DISK_QUOTA, DEFAULT_ENCODE_QUALITY, DEFAULT_MEMORY_COST_LIMIT,
    DEFAULT_MEMORY_ENTRY_LIMIT,
};
use crate::fetch::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::recipe::DEFAULT_FEED_URL;

// =============================================================================
// Default Values
// =============================================================================

/// Directory name under the platform cache directory.
pub const CACHE_DIR_NAME: &str = "recipe-image-cache";

/// Default disk cache directory.
///
/// Uses the platform cache directory, falling back to the system temp
/// directory when the platform has none.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}

// =============================================================================
// Cache Configuration
// =============================================================================

/// Settings for building an [`ImageCache`](crate::cache::ImageCache).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Disk tier directory
    pub cache_dir: PathBuf,

    /// Max decoded images held in memory
    pub memory_entry_limit: usize,

    /// Max decoded bytes held in memory
    pub memory_cost_limit: usize,

    /// Disk quota in bytes
    pub disk_quota: u64,

    /// JPEG quality as a fraction in (0, 1]
    pub encode_quality: f32,

    /// Coalesce concurrent loads of the same URL
    pub single_flight: bool,

    /// Network request timeout
    pub request_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            memory_entry_limit: DEFAULT_MEMORY_ENTRY_LIMIT,
            memory_cost_limit: DEFAULT_MEMORY_COST_LIMIT,
            disk_quota: DEFAULT_DISK_QUOTA,
            encode_quality: DEFAULT_ENCODE_QUALITY,
            single_flight: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl CacheConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.memory_entry_limit == 0 {
            return Err("memory_entry_limit must be greater than 0".to_string());
        }
        if self.memory_cost_limit == 0 {
            return Err("memory_cost_limit must be greater than 0".to_string());
        }
        if self.disk_quota == 0 {
            return Err("disk_quota must be greater than 0".to_string());
        }

        // NaN fails both comparisons
        if !(self.encode_quality > 0.0 && self.encode_quality <= 1.0) {
            return Err("encode_quality must be in (0, 1]".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(
                "Cache directory is empty. Set --cache-dir or RECIPE_CACHE_DIR".to_string(),
            );
        }

        Ok(())
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Recipe Cache - warm and inspect the recipe photo cache.
///
/// Loads the recipe feed, pulls every photo through a memory and disk cache,
/// and reports on the disk cache.
#[derive(Parser, Debug, Clone)]
#[command(name = "recipe-cache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch the recipe feed and cache every photo
    Load(LoadArgs),

    /// Show disk cache location, usage and quota
    Stats(CacheArgs),

    /// Delete every cached image on disk
    Clear(CacheArgs),
}

impl Command {
    /// Cache settings shared by every command.
    pub fn cache_args(&self) -> &CacheArgs {
        match self {
            Command::Load(args) => &args.cache,
            Command::Stats(args) | Command::Clear(args) => args,
        }
    }
}

/// Arguments for the `load` command.
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Recipe feed URL.
    #[arg(long, default_value = DEFAULT_FEED_URL, env = "RECIPE_FEED_URL")]
    pub feed_url: String,

    #[command(flatten)]
    pub cache: CacheArgs,
}

/// Cache settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    // =========================================================================
    // Storage
    // =========================================================================
    /// Disk cache directory.
    ///
    /// Defaults to `recipe-image-cache` under the platform cache directory.
    #[arg(long, env = "RECIPE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Maximum number of decoded images kept in memory.
    #[arg(long, default_value_t = DEFAULT_MEMORY_ENTRY_LIMIT, env = "RECIPE_MEMORY_ENTRIES")]
    pub memory_entries: usize,

    /// Maximum decoded bytes kept in memory.
    #[arg(long, default_value_t = DEFAULT_MEMORY_COST_LIMIT, env = "RECIPE_MEMORY_BYTES")]
    pub memory_bytes: usize,

    /// Disk quota in bytes.
    #[arg(long, default_value_t = DEFAULT_DISK_QUOTA, env = "RECIPE_DISK_QUOTA")]
    pub disk_quota: u64,

    /// JPEG quality for stored images, as a fraction in (0, 1].
    #[arg(long, default_value_t = DEFAULT_ENCODE_QUALITY, env = "RECIPE_JPEG_QUALITY")]
    pub jpeg_quality: f32,

    // =========================================================================
    // Loading
    // =========================================================================
    /// Fetch concurrently requested URLs independently instead of sharing one load.
    #[arg(long, default_value_t = false, env = "RECIPE_NO_SINGLE_FLIGHT")]
    pub no_single_flight: bool,

    /// Network request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "RECIPE_TIMEOUT")]
    pub timeout: u64,

    // =========================================================================
    // Logging
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CacheArgs {
    /// Build a [`CacheConfig`] from the parsed arguments.
    pub fn into_config(self) -> CacheConfig {
        CacheConfig {
            cache_dir: self.cache_dir.unwrap_or_else(default_cache_dir),
            memory_entry_limit: self.memory_entries,
            memory_cost_limit: self.memory_bytes,
            disk_quota: self.disk_quota,
            encode_quality: self.jpeg_quality,
            single_flight: !self.no_single_flight,
            request_timeout_secs: self.timeout,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
