//! Integration tests for Tavola nearest-restaurant queries
//!
//! These run the public API end to end: a polars-backed restaurant table
//! written to a temporary CSV, and a JSON cache file in a temporary directory.

use std::path::Path;

use tavola::{
    CacheStore, CuisineFilter, GeoPoint, JsonFileCacheStore, QueryConfigBuilder, RestaurantFinder,
    ResultSource, SearchError, error::TavolaError,
};
use tavola_data::{
    DataError, FrameRestaurantSource, SampleDataConfig, create_sample_csv, sample_restaurants,
};
use tempfile::{NamedTempFile, TempDir};

const NEAR_CARBONE: GeoPoint = GeoPoint::new(40.7285, -74.0005);

fn setup_test_env() {
    let _ = tavola::init_logging(tracing::Level::WARN);
}

fn sample_table() -> NamedTempFile {
    let docs = sample_restaurants(&SampleDataConfig::default());
    create_sample_csv(&docs).expect("Should write sample CSV")
}

fn finder(
    table: &Path,
    cache_file: &Path,
) -> RestaurantFinder<FrameRestaurantSource, JsonFileCacheStore> {
    let source = FrameRestaurantSource::new(table).expect("CSV should be accepted");
    RestaurantFinder::new(source, JsonFileCacheStore::new(cache_file))
}

#[test]
fn test_full_workflow() {
    setup_test_env();
    let table = sample_table();
    let cache_dir = TempDir::new().unwrap();
    let cache_file = cache_dir.path().join("cache.json");

    // 1. Fresh search against the table
    let finder = finder(table.path(), &cache_file);
    let fresh = finder
        .find_nearest(NEAR_CARBONE, Some("italian"))
        .expect("Search should work");
    assert_eq!(fresh.source, ResultSource::Fresh);
    assert_eq!(fresh.results[0].name, "Carbone");
    assert!(fresh.results.len() <= 3);
    assert!(fresh.results.iter().all(|r| r.cuisine == "Italian"));
    assert!(fresh.candidates_considered.unwrap() >= fresh.results.len());

    // 2. Same question, slightly moved and differently cased
    let cached = finder
        .find_nearest(NEAR_CARBONE.offset(0.0004, -0.0004), Some("ITALIAN"))
        .expect("Cached search should work");
    assert_eq!(cached.source, ResultSource::Cache);
    assert_eq!(cached.results, fresh.results);
    assert_eq!(cached.candidates_considered, None);

    // 3. A new process sees the same cache file
    let reopened = self::finder(table.path(), &cache_file);
    let again = reopened.find_nearest(NEAR_CARBONE, Some("Italian")).unwrap();
    assert_eq!(again.source, ResultSource::Cache);

    // 4. Outside the tolerance box is a fresh search
    let elsewhere = reopened
        .find_nearest(NEAR_CARBONE.offset(0.002, 0.0), Some("italian"))
        .unwrap();
    assert_eq!(elsewhere.source, ResultSource::Fresh);
}

#[test]
fn test_misspelled_cuisine_is_corrected() {
    setup_test_env();
    let table = sample_table();
    let cache_dir = TempDir::new().unwrap();
    let finder = finder(table.path(), &cache_dir.path().join("cache.json"));

    let outcome = finder.find_nearest(NEAR_CARBONE, Some("Itallian")).unwrap();
    assert!(matches!(
        &outcome.filter,
        CuisineFilter::Suggested { suggestion, .. } if suggestion == "italian"
    ));
    assert_eq!(outcome.results[0].name, "Carbone");
}

#[test]
fn test_cache_file_is_flushed_when_full() {
    setup_test_env();
    let table = sample_table();
    let cache_dir = TempDir::new().unwrap();
    let cache_file = cache_dir.path().join("cache.json");
    let finder = finder(table.path(), &cache_file);

    let position = |i: u32| GeoPoint::new(40.70 + f64::from(i) * 0.005, -73.99);
    for i in 0..20 {
        let outcome = finder.find_nearest(position(i), None).unwrap();
        assert_eq!(outcome.source, ResultSource::Fresh);
    }
    assert_eq!(finder.cache().store_handle().count().unwrap(), 20);

    finder.find_nearest(position(20), None).unwrap();
    assert_eq!(JsonFileCacheStore::new(&cache_file).count().unwrap(), 1);

    let outcome = finder.find_nearest(position(0), None).unwrap();
    assert_eq!(outcome.source, ResultSource::Fresh);
}

#[test]
fn test_missing_table_is_a_search_error() {
    setup_test_env();
    let cache_dir = TempDir::new().unwrap();
    let finder = finder(
        &cache_dir.path().join("no_such_table.csv"),
        &cache_dir.path().join("cache.json"),
    );

    let err = finder.find_nearest(NEAR_CARBONE, None).unwrap_err();
    assert!(matches!(
        err,
        TavolaError::Search(SearchError::DocumentStore(DataError::Unavailable(_)))
    ));
}

#[test]
fn test_cached_cuisine_query_survives_missing_table() {
    setup_test_env();
    let table = sample_table();
    let cache_dir = TempDir::new().unwrap();
    let cache_file = cache_dir.path().join("cache.json");

    let fresh = finder(table.path(), &cache_file)
        .find_nearest(NEAR_CARBONE, Some("italian"))
        .unwrap();
    assert_eq!(fresh.source, ResultSource::Fresh);

    // A new process whose table has gone missing only has the cache file.
    let finder = finder(&cache_dir.path().join("no_such_table.csv"), &cache_file);
    let cached = finder.find_nearest(NEAR_CARBONE, Some("Italian")).unwrap();
    assert_eq!(cached.source, ResultSource::Cache);
    assert_eq!(cached.results, fresh.results);

    let err = finder
        .find_nearest(NEAR_CARBONE.offset(0.01, 0.0), Some("Italian"))
        .unwrap_err();
    assert!(matches!(
        err,
        TavolaError::Search(SearchError::DocumentStore(DataError::Unavailable(_)))
    ));
}

#[test]
fn test_unwritable_cache_does_not_fail_queries() {
    setup_test_env();
    let table = sample_table();
    let cache_dir = TempDir::new().unwrap();
    // A directory where the cache file should be makes every read fail.
    let blocked = cache_dir.path().join("cache.json");
    std::fs::create_dir(&blocked).unwrap();

    let finder = finder(table.path(), &blocked);
    let first = finder.find_nearest(NEAR_CARBONE, None).unwrap();
    let second = finder.find_nearest(NEAR_CARBONE, None).unwrap();
    assert_eq!(first.source, ResultSource::Fresh);
    assert_eq!(second.source, ResultSource::Fresh);
    assert_eq!(first.results, second.results);
}

#[test]
fn test_custom_limit() {
    setup_test_env();
    let table = sample_table();
    let cache_dir = TempDir::new().unwrap();
    let config = QueryConfigBuilder::new().limit(5).build().unwrap();
    let finder = RestaurantFinder::with_config(
        FrameRestaurantSource::new(table.path()).unwrap(),
        JsonFileCacheStore::new(cache_dir.path().join("cache.json")),
        config,
    );

    let fresh = finder.find_nearest(NEAR_CARBONE, None).unwrap();
    assert_eq!(fresh.results.len(), 5);
    let cached = finder.find_nearest(NEAR_CARBONE, None).unwrap();
    assert_eq!(cached.results.len(), 5);
}
