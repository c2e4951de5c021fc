use std::sync::atomic::{AtomicBool, Ordering};

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::{
    DataError, Result,
    document::{RestaurantDocument, normalize_cuisine},
};

/// A forward-only stream of documents produced by a scan.
///
/// Dropping the stream releases whatever the source holds for it, whether the
/// scan ran to completion or was abandoned part way through.
pub type RestaurantScan<'a> = Box<dyn Iterator<Item = Result<RestaurantDocument>> + Send + 'a>;

/// Read-only access to the restaurant document store.
pub trait RestaurantSource: Send + Sync {
    /// Distinct cuisine values present in the store, case-folded, sorted, with
    /// blanks removed.
    fn cuisines(&self) -> Result<Vec<String>>;

    /// Stream every document, or only those whose normalized cuisine equals
    /// `cuisine_key` when one is given. The key must already be normalized
    /// (see [`normalize_cuisine`]).
    fn scan(&self, cuisine_key: Option<&str>) -> Result<RestaurantScan<'_>>;
}

/// A document store held entirely in memory.
#[derive(Debug)]
pub struct InMemoryRestaurantSource {
    documents: Vec<RestaurantDocument>,
    available: AtomicBool,
}

impl InMemoryRestaurantSource {
    pub fn new(documents: Vec<RestaurantDocument>) -> Self {
        Self {
            documents,
            available: AtomicBool::new(true),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Simulate the store going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DataError::Unavailable(
                "in-memory restaurant store is offline".to_string(),
            ))
        }
    }
}

impl FromIterator<RestaurantDocument> for InMemoryRestaurantSource {
    fn from_iter<T: IntoIterator<Item = RestaurantDocument>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl RestaurantSource for InMemoryRestaurantSource {
    fn cuisines(&self) -> Result<Vec<String>> {
        self.ensure_available()?;
        Ok(self
            .documents
            .iter()
            .filter_map(|doc| doc.cuisine.as_deref().and_then(normalize_cuisine))
            .sorted()
            .dedup()
            .collect())
    }

    #[instrument(name = "Scan in-memory restaurants", level = "debug", skip(self))]
    fn scan(&self, cuisine_key: Option<&str>) -> Result<RestaurantScan<'_>> {
        self.ensure_available()?;
        debug!(documents = self.documents.len(), "Starting scan");
        let key = cuisine_key.map(str::to_owned);
        Ok(Box::new(
            self.documents
                .iter()
                .filter(move |doc| doc.matches_cuisine(key.as_deref()))
                .cloned()
                .map(Ok),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::GeoPoint;

    fn source() -> InMemoryRestaurantSource {
        [
            RestaurantDocument::new(1, "A", "Italian", GeoPoint::new(40.70, -73.90)),
            RestaurantDocument::new(2, "B", "italian ", GeoPoint::new(40.71, -73.91)),
            RestaurantDocument::new(3, "C", "Chinese", GeoPoint::new(40.72, -73.92)),
            RestaurantDocument {
                restaurant_id: 4,
                name: Some("D".to_string()),
                cuisine: Some("  ".to_string()),
                position: None,
            },
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_cuisines_are_distinct_and_folded() {
        assert_eq!(source().cuisines().unwrap(), vec!["chinese", "italian"]);
    }

    #[test]
    fn test_scan_filters_by_cuisine_key() {
        let source = source();
        let ids: Vec<i64> = source
            .scan(Some("italian"))
            .unwrap()
            .map(|doc| doc.unwrap().restaurant_id)
            .collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(source.scan(None).unwrap().count(), 4);
        assert_eq!(source.scan(Some("thai")).unwrap().count(), 0);
    }

    #[test]
    fn test_unavailable_source_errors() {
        let source = source();
        source.set_available(false);
        assert!(matches!(source.scan(None), Err(DataError::Unavailable(_))));
        assert!(source.cuisines().is_err());

        source.set_available(true);
        assert!(source.scan(None).is_ok());
    }
}
