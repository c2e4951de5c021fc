//! Geo-tolerant result cache.
//!
//! Result sets are cached per (position, cuisine) and served to any later
//! query that lands inside a small box around a stored position with the same
//! cuisine. The cache is bounded: once it holds `capacity` rows, the next
//! store wipes the whole table before inserting. Every failure to reach the
//! backing store is treated as "no cache" rather than as a query failure.

use std::sync::Arc;

use parking_lot::Mutex;
use tavola_data::GeoPoint;
use tracing::{debug, info, instrument, warn};

pub use error::CacheError;
pub use file::JsonFileCacheStore;
pub use memory::InMemoryCacheStore;
pub use types::{CacheQuery, CacheRow, NewCacheRow, ResultEntry, StoreOutcome, cuisine_key};

mod file;
mod memory;
mod types;

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CacheError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Cache store unavailable: {0}")]
        Unavailable(String),
    }
    pub type Result<T> = std::result::Result<T, CacheError>;
}
use error::Result;

/// Half-width in degrees of the box a cached position covers on each axis.
pub const DEFAULT_TOLERANCE: f64 = 0.001;
/// Rows held before the next store flushes the table.
pub const DEFAULT_CAPACITY: usize = 20;
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// The table backing the result cache.
///
/// Implementations only need to honour each call on its own; the capacity
/// policy and its atomicity live in [`ResultCache`].
pub trait CacheStore: Send + Sync {
    /// The most recent row matching `query`, if any.
    fn find_latest(&self, query: &CacheQuery) -> Result<Option<CacheRow>>;

    fn count(&self) -> Result<usize>;

    /// Delete every row, returning how many were removed.
    fn clear(&self) -> Result<usize>;

    fn insert(&self, row: NewCacheRow) -> Result<CacheRow>;
}

impl<T: CacheStore + ?Sized> CacheStore for Box<T> {
    fn find_latest(&self, query: &CacheQuery) -> Result<Option<CacheRow>> {
        (**self).find_latest(query)
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }

    fn clear(&self) -> Result<usize> {
        (**self).clear()
    }

    fn insert(&self, row: NewCacheRow) -> Result<CacheRow> {
        (**self).insert(row)
    }
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn find_latest(&self, query: &CacheQuery) -> Result<Option<CacheRow>> {
        (**self).find_latest(query)
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }

    fn clear(&self) -> Result<usize> {
        (**self).clear()
    }

    fn insert(&self, row: NewCacheRow) -> Result<CacheRow> {
        (**self).insert(row)
    }
}

/// Lookup and write-through over a [`CacheStore`] with full-flush eviction.
pub struct ResultCache<C> {
    store: C,
    tolerance: f64,
    capacity: usize,
    max_results: usize,
    write_lock: Mutex<()>,
}

impl<C: CacheStore> ResultCache<C> {
    pub fn new(store: C) -> Self {
        Self::with_policy(store, DEFAULT_TOLERANCE, DEFAULT_CAPACITY, DEFAULT_MAX_RESULTS)
    }

    pub fn with_policy(store: C, tolerance: f64, capacity: usize, max_results: usize) -> Self {
        Self {
            store,
            tolerance,
            capacity,
            max_results,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store_handle(&self) -> &C {
        &self.store
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached results for a query, or `None` on a miss.
    ///
    /// A store error counts as a miss. A row with no results is never a hit.
    #[instrument(name = "Cache lookup", level = "debug", skip(self))]
    pub fn lookup(&self, position: GeoPoint, cuisine: Option<&str>) -> Option<Vec<ResultEntry>> {
        let query = CacheQuery {
            position,
            cuisine: cuisine_key(cuisine),
            tolerance: self.tolerance,
        };
        match self.store.find_latest(&query) {
            Ok(Some(row)) if !row.results.is_empty() => {
                info!(row_id = row.id, "Cache hit");
                Some(row.results)
            }
            Ok(_) => {
                debug!("Cache miss");
                None
            }
            Err(e) => {
                warn!(error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Insert a freshly computed result set.
    ///
    /// When the table already holds `capacity` rows it is emptied first. The
    /// count, the flush and the insert happen under one lock so concurrent
    /// stores through this cache never overshoot the bound. An empty result
    /// set is never written, since no lookup could return it.
    #[instrument(name = "Cache store", level = "debug", skip(self, results), fields(results = results.len()))]
    pub fn store(
        &self,
        position: GeoPoint,
        cuisine: Option<&str>,
        results: &[ResultEntry],
    ) -> Result<StoreOutcome> {
        if results.is_empty() {
            debug!("Nothing to cache for an empty result");
            return Ok(StoreOutcome::Skipped);
        }
        let row = NewCacheRow {
            position,
            cuisine: cuisine_key(cuisine),
            results: results.iter().take(self.max_results).cloned().collect(),
        };

        let _guard = self.write_lock.lock();
        let evicted = if self.store.count()? >= self.capacity {
            let evicted = self.store.clear()?;
            info!(evicted, capacity = self.capacity, "Cache full, flushed all rows");
            Some(evicted)
        } else {
            None
        };
        let inserted = self.store.insert(row)?;
        debug!(row_id = inserted.id, "Cached result set");

        Ok(match evicted {
            Some(evicted) => StoreOutcome::FlushedAndInserted {
                id: inserted.id,
                evicted,
            },
            None => StoreOutcome::Inserted { id: inserted.id },
        })
    }
}
