use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tavola::{
    CacheStore, CuisineFilter, GeoPoint, InMemoryCacheStore, JsonFileCacheStore, QueryConfig,
    RestaurantFinder, init_logging,
};
use tavola_data::FrameRestaurantSource;
use tracing::Level;

const CACHE_FILE_NAME: &str = "result_cache.json";

/// Find the three restaurants closest to a position.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Only consider this cuisine (case-insensitive; close misspellings are corrected)
    #[arg(short, long)]
    cuisine: Option<String>,

    /// Restaurant table (.csv or .parquet)
    #[arg(short, long)]
    data: PathBuf,

    /// Result cache file
    #[arg(long, env = "TAVOLA_CACHE")]
    cache: Option<PathBuf>,

    /// Keep the result cache in memory for this run only (overrides --cache)
    #[arg(long)]
    no_cache: bool,

    /// Minimum log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

fn default_cache_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "tavola").map_or_else(
        || PathBuf::from(CACHE_FILE_NAME),
        |dirs| dirs.cache_dir().join(CACHE_FILE_NAME),
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    let config = QueryConfig::default();
    let position = config.bounds.validate(GeoPoint::new(cli.lat, cli.lon))?;

    let source = FrameRestaurantSource::new(&cli.data)
        .with_context(|| format!("Cannot open restaurant table {}", cli.data.display()))?;
    let cache_store: Box<dyn CacheStore> = if cli.no_cache {
        Box::new(InMemoryCacheStore::new())
    } else {
        Box::new(JsonFileCacheStore::new(
            cli.cache.unwrap_or_else(default_cache_path),
        ))
    };

    let finder = RestaurantFinder::with_config(source, cache_store, config);
    let outcome = finder
        .find_nearest(position, cli.cuisine.as_deref())
        .context("Search failed")?;

    match (&outcome.filter, cli.cuisine.as_deref()) {
        (CuisineFilter::Suggested { requested, suggestion }, _) => {
            println!("Cuisine '{requested}' not found, showing '{suggestion}' instead.\n");
        }
        (CuisineFilter::NoFilter, Some(requested)) if !requested.trim().is_empty() => {
            println!("Cuisine '{requested}' not found, searching all cuisines.\n");
        }
        _ => {}
    }

    println!("Nearest restaurants to {position} ({}):\n", outcome.filter);
    print!("{outcome}");
    Ok(())
}
