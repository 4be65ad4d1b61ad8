//! Recipe Cache - warm and inspect the recipe photo cache.
//!
//! This binary wires the HTTP fetcher and both cache tiers together and runs
//! one command against them.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipe_image_cache::{
    config::{CacheArgs, CacheConfig, Cli, Command, LoadArgs},
    DiskCache, HttpFetcher, ImageCache, ImageDiskCache, ImageMemoryCache, RecipePipeline,
};

type DefaultImageCache = ImageCache<ImageMemoryCache, ImageDiskCache, HttpFetcher>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.command.cache_args().verbose);

    match cli.command {
        Command::Load(args) => run_load(args).await,
        Command::Stats(args) => run_stats(args).await,
        Command::Clear(args) => run_clear(args).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "recipe_image_cache=debug,recipe_cache=debug"
    } else {
        "recipe_image_cache=info,recipe_cache=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Validate the arguments and build the configuration.
fn load_config(args: CacheArgs) -> Option<CacheConfig> {
    let config = args.into_config();
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return None;
    }
    Some(config)
}

fn build_disk(config: &CacheConfig) -> ImageDiskCache {
    ImageDiskCache::with_options(&config.cache_dir, config.disk_quota, config.encode_quality)
}

fn build_cache(config: &CacheConfig) -> Result<DefaultImageCache, String> {
    let fetcher = HttpFetcher::with_timeout(Duration::from_secs(config.request_timeout_secs))
        .map_err(|e| e.to_string())?;

    let memory =
        ImageMemoryCache::with_limits(config.memory_entry_limit, config.memory_cost_limit);

    Ok(ImageCache::new(memory, build_disk(config), fetcher)
        .with_single_flight(config.single_flight))
}

// =============================================================================
// Load Command
// =============================================================================

async fn run_load(args: LoadArgs) -> ExitCode {
    let Some(config) = load_config(args.cache) else {
        return ExitCode::FAILURE;
    };

    info!("Configuration:");
    info!("  Feed: {}", args.feed_url);
    info!("  Cache dir: {}", config.cache_dir.display());
    info!(
        "  Memory: {} images, {} bytes",
        config.memory_entry_limit, config.memory_cost_limit
    );
    info!("  Disk quota: {} bytes", config.disk_quota);
    info!(
        "  Single-flight: {}",
        if config.single_flight { "on" } else { "off" }
    );

    let cache = match build_cache(&config) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = RecipePipeline::new(Arc::clone(&cache)).with_feed_url(args.feed_url);

    let load = match pipeline.load_recipes().await {
        Ok(load) => load,
        Err(e) => {
            error!(error = %e, "Failed to load recipes");
            eprintln!("Error: {}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    if load.recipes.is_empty() {
        println!("No recipes available.");
    } else {
        for recipe in &load.recipes {
            println!("{:<40} {}", recipe.name, recipe.cuisine);
        }
    }

    println!();
    println!("Recipes:        {}", load.recipes.len());
    println!("Photos cached:  {}", load.images_cached);
    println!("Photos failed:  {}", load.images_failed);
    println!(
        "Disk usage:     {} / {} bytes",
        cache.disk_usage().await,
        config.disk_quota
    );

    ExitCode::SUCCESS
}

// =============================================================================
// Stats Command
// =============================================================================

async fn run_stats(args: CacheArgs) -> ExitCode {
    let Some(config) = load_config(args) else {
        return ExitCode::FAILURE;
    };

    let disk = build_disk(&config);
    let usage = disk.total_size().await;
    let percent = usage as f64 / config.disk_quota as f64 * 100.0;

    println!("Recipe Image Cache");
    println!("══════════════════");
    println!("Directory:  {}", disk.dir().display());
    println!("Usage:      {} bytes ({:.1}% of quota)", usage, percent);
    println!("Quota:      {} bytes", disk.quota());
    println!("Quality:    {}", disk.jpeg_quality());

    ExitCode::SUCCESS
}

// =============================================================================
// Clear Command
// =============================================================================

async fn run_clear(args: CacheArgs) -> ExitCode {
    let Some(config) = load_config(args) else {
        return ExitCode::FAILURE;
    };

    let disk = build_disk(&config);
    let before = disk.total_size().await;

    if let Err(e) = disk.clear().await {
        error!(error = %e, "Failed to clear cache");
        return ExitCode::FAILURE;
    }

    println!(
        "Cleared {} bytes from {}",
        before,
        disk.dir().display()
    );

    ExitCode::SUCCESS
}
