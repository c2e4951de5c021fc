//! Nearest-restaurant queries.
//!
//! [`RestaurantFinder`] ties the pieces together: it resolves the requested
//! cuisine, serves from the result cache when it can, and otherwise streams
//! the document store through a bounded top-k selection before writing the
//! fresh result back to the cache.

use std::{
    fmt,
    time::{Duration, Instant},
};

use once_cell::sync::OnceCell;
use tavola_data::{GeoPoint, RestaurantRecord, RestaurantSource};
use tracing::{debug, info, instrument, warn};

pub use error::SearchError;

use crate::{
    cache::{CacheStore, ResultCache, ResultEntry, cuisine_key},
    config::QueryConfig,
    cuisine::{CuisineFilter, CuisineResolver},
    error::Result,
    geo::haversine_km,
    select::{NearestK, ScoredCandidate},
};

mod error {
    use tavola_data::DataError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum SearchError {
        /// The document store could not be read, so no fresh result exists.
        #[error("Document store error: {0}")]
        DocumentStore(#[from] DataError),
    }
}

/// Where a result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Cache,
    Fresh,
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Fresh => write!(f, "document store"),
        }
    }
}

/// The answer to one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Closest first.
    pub results: Vec<ResultEntry>,
    pub source: ResultSource,
    /// Restaurants with a usable position that were ranked. `None` when the
    /// result came from the cache, since no scan took place.
    pub candidates_considered: Option<usize>,
    pub elapsed: Duration,
    /// The cuisine filter the query actually ran with.
    pub filter: CuisineFilter,
}

impl QueryOutcome {
    pub fn is_cached(&self) -> bool {
        self.source == ResultSource::Cache
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.results.is_empty() {
            writeln!(f, "No restaurants found.")?;
        }
        for (rank, entry) in self.results.iter().enumerate() {
            writeln!(f, "{}. {}", rank + 1, entry.name)?;
            writeln!(f, "   Distance: {:.2} km", entry.distance_km)?;
            writeln!(f, "   Cuisine: {}", entry.cuisine)?;
        }
        writeln!(f)?;
        writeln!(f, "Search time: {:.4} seconds", self.elapsed.as_secs_f64())?;
        writeln!(f, "Source: {}", self.source)?;
        if let Some(considered) = self.candidates_considered {
            writeln!(f, "Restaurants considered: {considered}")?;
        }
        Ok(())
    }
}

/// Finds the restaurants closest to a position.
///
/// Both stores are injected, so the finder can run against the polars-backed
/// table and the JSON cache file as easily as against in-memory fakes.
///
/// ```rust
/// use tavola::{GeoPoint, InMemoryCacheStore, RestaurantFinder, ResultSource};
/// use tavola_data::{InMemoryRestaurantSource, RestaurantDocument};
///
/// let source: InMemoryRestaurantSource = [
///     RestaurantDocument::new(1, "Joe's Pizza", "Pizza", GeoPoint::new(40.7306, -74.0021)),
///     RestaurantDocument::new(2, "Katz's", "Deli", GeoPoint::new(40.7223, -73.9874)),
/// ]
/// .into_iter()
/// .collect();
/// let finder = RestaurantFinder::new(source, InMemoryCacheStore::new());
///
/// let outcome = finder.find_nearest(GeoPoint::new(40.7300, -74.0000), Some("pizza"))?;
/// assert_eq!(outcome.results[0].name, "Joe's Pizza");
/// assert_eq!(outcome.source, ResultSource::Fresh);
/// # Ok::<(), tavola::error::TavolaError>(())
/// ```
pub struct RestaurantFinder<S, C> {
    source: S,
    cache: ResultCache<C>,
    resolver: CuisineResolver,
    config: QueryConfig,
    known_cuisines: OnceCell<Vec<String>>,
}

impl<S: RestaurantSource, C: CacheStore> RestaurantFinder<S, C> {
    pub fn new(source: S, cache_store: C) -> Self {
        Self::with_config(source, cache_store, QueryConfig::default())
    }

    pub fn with_config(source: S, cache_store: C, config: QueryConfig) -> Self {
        let cache = ResultCache::with_policy(
            cache_store,
            config.cache_tolerance,
            config.cache_capacity,
            config.limit,
        );
        Self {
            source,
            cache,
            resolver: config.cuisine_resolver(),
            config,
            known_cuisines: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &ResultCache<C> {
        &self.cache
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Distinct cuisines in the document store, read once per finder.
    pub fn known_cuisines(&self) -> Result<&[String]> {
        let cuisines = self
            .known_cuisines
            .get_or_try_init(|| self.source.cuisines().map_err(SearchError::DocumentStore))?;
        Ok(cuisines.as_slice())
    }

    /// Decide which cuisine filter a request runs with.
    ///
    /// A blank request never touches the document store.
    pub fn resolve_cuisine(&self, cuisine: Option<&str>) -> Result<CuisineFilter> {
        if cuisine.is_none_or(|c| c.trim().is_empty()) {
            return Ok(CuisineFilter::NoFilter);
        }
        Ok(self.resolver.resolve(cuisine, self.known_cuisines()?))
    }

    /// Up to `max_suggestions` known cuisines resembling `cuisine`.
    pub fn cuisine_suggestions(&self, cuisine: &str) -> Result<Vec<String>> {
        Ok(self.resolver.suggestions(cuisine, self.known_cuisines()?))
    }

    /// The closest restaurants to `position`, optionally of one cuisine.
    ///
    /// Cache failures never fail the query. A document store failure fails
    /// it only when the answer is not already cached, as
    /// [`SearchError::DocumentStore`], so "nothing matched" (an empty result)
    /// and "could not search" stay distinguishable.
    #[instrument(name = "Find nearest restaurants", level = "info", skip(self))]
    pub fn find_nearest(&self, position: GeoPoint, cuisine: Option<&str>) -> Result<QueryOutcome> {
        let t_start = Instant::now();
        let filter = match self.resolve_cuisine(cuisine) {
            Ok(filter) => filter,
            Err(e) => {
                // Without the cuisine list the request can still be answered
                // from the cache under its literal (normalized) key.
                let Some(key) = cuisine_key(cuisine) else {
                    return Err(e);
                };
                warn!(error = %e, cuisine = %key, "Cuisine list unavailable, trying cache only");
                return match self.cache.lookup(position, Some(&key)) {
                    Some(results) => {
                        Ok(cached_outcome(results, CuisineFilter::Exact(key), t_start))
                    }
                    None => Err(e),
                };
            }
        };
        if let CuisineFilter::Suggested {
            requested,
            suggestion,
        } = &filter
        {
            info!(%requested, %suggestion, "Cuisine not found, using closest match");
        } else if !filter.is_filtered() && cuisine.is_some_and(|c| !c.trim().is_empty()) {
            info!(?cuisine, "Cuisine not found, searching without filter");
        }

        if let Some(results) = self.cache.lookup(position, filter.key()) {
            return Ok(cached_outcome(results, filter, t_start));
        }

        let (results, considered) = self.scan_nearest(position, filter.key())?;

        if let Err(e) = self.cache.store(position, filter.key(), &results) {
            warn!(error = %e, "Failed to cache result, returning it uncached");
        }

        let elapsed = t_start.elapsed();
        info!(
            elapsed_seconds = ?elapsed,
            results = results.len(),
            considered,
            "Fresh search complete"
        );
        Ok(QueryOutcome {
            results,
            source: ResultSource::Fresh,
            candidates_considered: Some(considered),
            elapsed,
            filter,
        })
    }

    /// One pass over the matching documents, keeping the `limit` closest.
    #[instrument(name = "Scan document store", level = "debug", skip(self))]
    fn scan_nearest(
        &self,
        position: GeoPoint,
        cuisine_key: Option<&str>,
    ) -> Result<(Vec<ResultEntry>, usize)> {
        let scan = self
            .source
            .scan(cuisine_key)
            .map_err(SearchError::DocumentStore)?;

        let mut nearest = NearestK::new(self.config.limit);
        let mut skipped = 0_usize;
        for document in scan {
            let document = document.map_err(SearchError::DocumentStore)?;
            let Some(record) = document.into_record() else {
                skipped += 1;
                continue;
            };
            let distance = haversine_km(position, record.position);
            nearest.push(ScoredCandidate::new(distance, record));
        }
        if skipped > 0 {
            debug!(skipped, "Skipped restaurants without a usable position");
        }

        let considered = nearest.seen();
        let results = nearest
            .into_sorted_vec()
            .into_iter()
            .map(|scored| into_entry(scored.distance, scored.item))
            .collect();
        Ok((results, considered))
    }
}

fn cached_outcome(
    results: Vec<ResultEntry>,
    filter: CuisineFilter,
    t_start: Instant,
) -> QueryOutcome {
    let elapsed = t_start.elapsed();
    info!(elapsed_seconds = ?elapsed, results = results.len(), "Served from cache");
    QueryOutcome {
        results,
        source: ResultSource::Cache,
        candidates_considered: None,
        elapsed,
        filter,
    }
}

fn into_entry(distance_km: f64, record: RestaurantRecord) -> ResultEntry {
    ResultEntry::new(record.name, record.cuisine, distance_km)
}
