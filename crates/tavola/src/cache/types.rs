use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tavola_data::{GeoPoint, normalize_cuisine};

/// One ranked restaurant as returned to the caller and kept in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub name: String,
    pub cuisine: String,
    pub distance_km: f64,
}

impl ResultEntry {
    pub fn new(name: impl Into<String>, cuisine: impl Into<String>, distance_km: f64) -> Self {
        Self {
            name: name.into(),
            cuisine: cuisine.into(),
            distance_km,
        }
    }
}

/// Cache key form of a cuisine: case-folded, with `None` meaning "no filter".
pub fn cuisine_key(cuisine: Option<&str>) -> Option<String> {
    cuisine.and_then(normalize_cuisine)
}

/// A cached result set. Rows are written once and only ever removed in bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRow {
    pub id: u64,
    pub position: GeoPoint,
    pub cuisine: Option<String>,
    pub results: Vec<ResultEntry>,
    pub created_at: DateTime<Utc>,
}

impl CacheRow {
    /// Recency order: newest `created_at` wins, then the higher id.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        (self.created_at, self.id) > (other.created_at, other.id)
    }
}

/// A row about to be inserted; the store assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCacheRow {
    pub position: GeoPoint,
    pub cuisine: Option<String>,
    pub results: Vec<ResultEntry>,
}

/// A lookup: any row inside the tolerance box around `position` with the same
/// cuisine key matches.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheQuery {
    pub position: GeoPoint,
    pub cuisine: Option<String>,
    pub tolerance: f64,
}

impl CacheQuery {
    /// Axis-aligned box test, inclusive on both edges, plus cuisine equality
    /// (two "no filter" keys are equal).
    pub fn matches(&self, row: &CacheRow) -> bool {
        let lat_min = self.position.latitude - self.tolerance;
        let lat_max = self.position.latitude + self.tolerance;
        let lon_min = self.position.longitude - self.tolerance;
        let lon_max = self.position.longitude + self.tolerance;

        (lat_min..=lat_max).contains(&row.position.latitude)
            && (lon_min..=lon_max).contains(&row.position.longitude)
            && self.cuisine == row.cuisine
    }
}

/// What a successful store did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Inserted { id: u64 },
    FlushedAndInserted { id: u64, evicted: usize },
    /// Nothing was written (empty result set).
    Skipped,
}

impl StoreOutcome {
    /// Id of the inserted row, if one was inserted.
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Inserted { id } | Self::FlushedAndInserted { id, .. } => Some(*id),
            Self::Skipped => None,
        }
    }

    pub fn flushed(&self) -> bool {
        matches!(self, Self::FlushedAndInserted { .. })
    }
}
