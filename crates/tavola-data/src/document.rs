use std::fmt;

use serde::{Deserialize, Serialize};

/// A position in decimal degrees.
///
/// Range checks belong to whoever collects the position; nothing in the
/// store or the engine rejects out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Offset both axes by the given number of degrees.
    #[must_use]
    pub fn offset(self, d_lat: f64, d_lon: f64) -> Self {
        Self::new(self.latitude + d_lat, self.longitude + d_lon)
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Case-fold and trim a cuisine name. Blank input yields `None`.
pub fn normalize_cuisine(cuisine: &str) -> Option<String> {
    let trimmed = cuisine.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// A restaurant row as it comes out of the document store.
///
/// Every field except the id may be absent in the underlying data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantDocument {
    pub restaurant_id: i64,
    pub name: Option<String>,
    pub cuisine: Option<String>,
    pub position: Option<GeoPoint>,
}

impl RestaurantDocument {
    pub fn new(
        restaurant_id: i64,
        name: impl Into<String>,
        cuisine: impl Into<String>,
        position: GeoPoint,
    ) -> Self {
        Self {
            restaurant_id,
            name: Some(name.into()),
            cuisine: Some(cuisine.into()),
            position: Some(position),
        }
    }

    /// Whether this document passes a normalized cuisine filter.
    pub fn matches_cuisine(&self, cuisine_key: Option<&str>) -> bool {
        cuisine_key.is_none_or(|key| {
            self.cuisine
                .as_deref()
                .and_then(normalize_cuisine)
                .is_some_and(|c| c == key)
        })
    }

    /// Project to a [`RestaurantRecord`], or `None` when the document has no
    /// usable position.
    pub fn into_record(self) -> Option<RestaurantRecord> {
        let position = self.position.filter(GeoPoint::is_finite)?;
        Some(RestaurantRecord {
            id: self.restaurant_id,
            name: self
                .name
                .unwrap_or_else(|| RestaurantRecord::UNNAMED.to_string()),
            cuisine: self.cuisine.unwrap_or_default(),
            position,
        })
    }
}

/// The subset of a restaurant document the query engine works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub id: i64,
    pub name: String,
    pub cuisine: String,
    pub position: GeoPoint,
}

impl RestaurantRecord {
    pub const UNNAMED: &'static str = "Unnamed";
}
