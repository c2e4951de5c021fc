use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tavola_data::GeoPoint;
use tracing::{debug, instrument};

use super::{
    CacheStore,
    error::Result,
    types::{CacheQuery, CacheRow, NewCacheRow},
};

/// Stored coordinates keep six decimal places.
const COORDINATE_SCALE: f64 = 1_000_000.0;

#[derive(Debug, Serialize, Deserialize)]
struct CacheTable {
    next_id: u64,
    rows: Vec<CacheRow>,
}

impl Default for CacheTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: Vec::new(),
        }
    }
}

/// Cache table persisted as a single JSON document.
///
/// Every call reads the file, and every write replaces it through a temporary
/// file and a rename, so a crash mid-write leaves the previous table intact.
/// A missing file reads as an empty table.
#[derive(Debug)]
pub struct JsonFileCacheStore {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl JsonFileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<CacheTable> {
        match File::open(&self.path) {
            Ok(file) => Ok(serde_json::from_reader(BufReader::new(file))?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(CacheTable::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_table(&self, table: &CacheTable) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, table)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!(rows = table.rows.len(), path = ?self.path, "Cache table written");
        Ok(())
    }
}

fn round_coordinate(value: f64) -> f64 {
    (value * COORDINATE_SCALE).round() / COORDINATE_SCALE
}

impl CacheStore for JsonFileCacheStore {
    #[instrument(name = "Read cache file", level = "trace", skip_all)]
    fn find_latest(&self, query: &CacheQuery) -> Result<Option<CacheRow>> {
        let _guard = self.io_lock.lock();
        let table = self.read_table()?;
        Ok(table
            .rows
            .into_iter()
            .filter(|row| query.matches(row))
            .reduce(|best, row| if row.is_newer_than(&best) { row } else { best }))
    }

    fn count(&self) -> Result<usize> {
        let _guard = self.io_lock.lock();
        Ok(self.read_table()?.rows.len())
    }

    fn clear(&self) -> Result<usize> {
        let _guard = self.io_lock.lock();
        let mut table = self.read_table()?;
        let removed = table.rows.len();
        table.rows.clear();
        self.write_table(&table)?;
        Ok(removed)
    }

    fn insert(&self, row: NewCacheRow) -> Result<CacheRow> {
        let _guard = self.io_lock.lock();
        let mut table = self.read_table()?;
        let row = CacheRow {
            id: table.next_id,
            position: GeoPoint::new(
                round_coordinate(row.position.latitude),
                round_coordinate(row.position.longitude),
            ),
            cuisine: row.cuisine,
            results: row.results,
            created_at: Utc::now(),
        };
        table.next_id += 1;
        table.rows.push(row.clone());
        self.write_table(&table)?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, ResultCache, ResultEntry};

    fn results() -> Vec<ResultEntry> {
        vec![
            ResultEntry::new("Carbone", "italian", 0.21),
            ResultEntry::new("Via Carota", "italian", 0.48),
        ]
    }

    #[test]
    fn test_missing_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCacheStore::new(dir.path().join("nested").join("cache.json"));
        assert_eq!(store.count().unwrap(), 0);
        let query = CacheQuery {
            position: GeoPoint::new(40.7, -73.9),
            cuisine: None,
            tolerance: 0.001,
        };
        assert_eq!(store.find_latest(&query).unwrap(), None);
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let p = GeoPoint::new(40.728_012_345, -74.000_2);

        let cache = ResultCache::new(JsonFileCacheStore::new(&path));
        cache.store(p, Some("Italian"), &results()).unwrap();
        drop(cache);

        let reopened = ResultCache::new(JsonFileCacheStore::new(&path));
        assert_eq!(reopened.lookup(p, Some("italian")), Some(results()));
    }

    #[test]
    fn test_full_precision_distances_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let p = GeoPoint::new(40.7, -73.9);
        let haversine = crate::geo::haversine_km(
            GeoPoint::new(40.7589, -73.9851),
            GeoPoint::new(40.7484, -73.9857),
        );
        let precise = vec![
            ResultEntry::new("Restaurant #38", "Thai", 13.844_365_573_512_693),
            ResultEntry::new("Restaurant #12", "Pizza", 0.1 + 0.2),
            ResultEntry::new("Restaurant #7", "Chinese", haversine),
        ];

        ResultCache::new(JsonFileCacheStore::new(&path))
            .store(p, None, &precise)
            .unwrap();
        let reopened = ResultCache::new(JsonFileCacheStore::new(&path));
        let cached = reopened.lookup(p, None).unwrap();
        for (stored, read) in precise.iter().zip(&cached) {
            assert_eq!(stored.distance_km.to_bits(), read.distance_km.to_bits());
        }
        assert_eq!(cached, precise);
    }

    #[test]
    fn test_coordinates_are_rounded() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCacheStore::new(dir.path().join("cache.json"));
        let row = store
            .insert(NewCacheRow {
                position: GeoPoint::new(40.123_456_789, -73.987_654_321),
                cuisine: None,
                results: results(),
            })
            .unwrap();
        assert_eq!(row.position, GeoPoint::new(40.123_457, -73.987_654));
    }

    #[test]
    fn test_flush_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = ResultCache::with_policy(JsonFileCacheStore::new(&path), 0.001, 3, 3);
        for i in 0..4 {
            cache
                .store(GeoPoint::new(40.0 + f64::from(i), -73.9), None, &results())
                .unwrap();
        }
        assert_eq!(JsonFileCacheStore::new(&path).count().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonFileCacheStore::new(&path);
        assert!(matches!(store.count(), Err(CacheError::Serde(_))));

        let cache = ResultCache::new(store);
        assert!(cache.lookup(GeoPoint::new(40.7, -73.9), None).is_none());
    }
}
