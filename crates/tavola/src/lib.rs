//! Tavola - Nearest Restaurant Lookup
//!
//! Tavola answers one question: which restaurants are closest to a position,
//! optionally restricted to a cuisine. Fresh answers come from a single
//! streaming pass over the restaurant table that keeps only the best few
//! candidates; repeated questions about (almost) the same spot are answered
//! from a small geo-tolerant result cache.
//!
//! # Quick Start
//!
//! ```rust
//! use tavola::{GeoPoint, InMemoryCacheStore, RestaurantFinder};
//! use tavola_data::{SampleDataConfig, InMemoryRestaurantSource, sample_restaurants};
//!
//! let source = InMemoryRestaurantSource::new(sample_restaurants(&SampleDataConfig::minimal()));
//! let finder = RestaurantFinder::new(source, InMemoryCacheStore::new());
//!
//! let outcome = finder.find_nearest(GeoPoint::new(40.7300, -74.0010), Some("italian"))?;
//! for entry in &outcome.results {
//!     println!("{} ({:.2} km)", entry.name, entry.distance_km);
//! }
//! # Ok::<(), tavola::error::TavolaError>(())
//! ```
//!
//! # Behaviour worth knowing
//!
//! - At most three results are returned, closest first.
//! - A cuisine that matches nothing exactly is replaced by the closest known
//!   cuisine, or dropped entirely when nothing is close.
//! - The cache answers any query within ±0.001° of a cached one (per axis,
//!   same cuisine). When it holds 20 rows the next write empties it.
//! - Cache trouble never fails a query; document store trouble always does.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub mod cache;
mod config;
mod cuisine;
pub mod error;
mod geo;
mod search;
mod select;

pub use cache::{
    CacheStore, InMemoryCacheStore, JsonFileCacheStore, ResultCache, ResultEntry, StoreOutcome,
};
pub use config::{CoordinateBounds, QueryConfig, QueryConfigBuilder};
pub use cuisine::{CuisineFilter, CuisineResolver, similarity};
pub use geo::{EARTH_RADIUS_KM, GeoPoint, haversine_km};
pub use search::{QueryOutcome, RestaurantFinder, ResultSource, SearchError};
pub use select::{NearestK, ScoredCandidate, select_top_k};
pub use tavola_data as data;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for Tavola.
///
/// `RUST_LOG` wins over `level` when set. Safe to call more than once; only
/// the first call installs a subscriber.
///
/// ```rust
/// use tavola::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), tavola::error::TavolaError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::TavolaError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("polars=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
