use std::io::Write;

use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    Result,
    document::{GeoPoint, RestaurantDocument},
    frame::{CUISINE_COLUMN, ID_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN, NAME_COLUMN},
};

/// Configuration for sample restaurant data
#[derive(Debug, Clone)]
pub struct SampleDataConfig {
    /// Number of restaurants to generate
    pub rows: usize,
    /// Append documents with missing or unreadable coordinates
    pub include_malformed: bool,
}

impl Default for SampleDataConfig {
    fn default() -> Self {
        Self {
            rows: 50,
            include_malformed: true,
        }
    }
}

impl SampleDataConfig {
    /// Just the hand-picked Manhattan restaurants
    pub fn minimal() -> Self {
        Self {
            rows: BASE_RESTAURANTS.len(),
            include_malformed: false,
        }
    }

    /// Larger set for integration tests
    pub fn sample() -> Self {
        Self {
            rows: 500,
            include_malformed: true,
        }
    }
}

const BASE_RESTAURANTS: [(&str, &str, f64, f64); 10] = [
    ("Joe's Pizza", "Pizza", 40.730_6, -74.002_1),
    ("Katz's Delicatessen", "Delicatessen", 40.722_2, -73.987_4),
    ("Carbone", "Italian", 40.728_0, -74.000_2),
    ("Nom Wah Tea Parlor", "Chinese", 40.714_4, -73.998_2),
    ("Lombardi's", "Pizza", 40.721_6, -73.995_6),
    ("Via Carota", "Italian", 40.733_3, -74.003_8),
    ("Xi'an Famous Foods", "Chinese", 40.715_5, -73.996_8),
    ("Le Bernardin", "French", 40.761_5, -73.981_8),
    ("Peter Luger", "Steak", 40.709_8, -73.962_4),
    ("Russ & Daughters", "Jewish/Kosher", 40.722_6, -73.988_4),
];

const SYNTHETIC_CUISINES: [&str; 6] = ["Pizza", "Italian", "Chinese", "Mexican", "Thai", "American"];

/// Deterministic sample restaurants around lower Manhattan.
///
/// The first rows are real-looking fixtures; anything beyond those is laid out
/// on a regular grid so distances stay predictable.
pub fn sample_restaurants(config: &SampleDataConfig) -> Vec<RestaurantDocument> {
    let mut documents: Vec<RestaurantDocument> = BASE_RESTAURANTS
        .iter()
        .take(config.rows)
        .zip(1..)
        .map(|(&(name, cuisine, lat, lon), id)| {
            RestaurantDocument::new(id, name, cuisine, GeoPoint::new(lat, lon))
        })
        .collect();

    for i in documents.len()..config.rows {
        let id = i as i64 + 1;
        let row = (i / 25) as f64;
        let column = (i % 25) as f64;
        documents.push(RestaurantDocument::new(
            id,
            format!("Restaurant #{id}"),
            SYNTHETIC_CUISINES[i % SYNTHETIC_CUISINES.len()],
            GeoPoint::new(40.60 + row * 0.004, -74.05 + column * 0.004),
        ));
    }

    if config.include_malformed {
        let next = documents.len() as i64 + 1;
        documents.push(RestaurantDocument {
            restaurant_id: next,
            name: Some("Ghost Kitchen".to_string()),
            cuisine: Some("Pizza".to_string()),
            position: None,
        });
        documents.push(RestaurantDocument {
            restaurant_id: next + 1,
            name: None,
            cuisine: None,
            position: Some(GeoPoint::new(40.7300, -74.0000)),
        });
    }

    documents
}

/// Write documents to a temporary CSV file in the restaurant table layout.
pub fn create_sample_csv(documents: &[RestaurantDocument]) -> Result<NamedTempFile> {
    info!(rows = documents.len(), "Creating sample restaurant CSV");
    let mut file = tempfile::Builder::new()
        .prefix("restaurants")
        .suffix(".csv")
        .tempfile()?;

    writeln!(
        file,
        "{ID_COLUMN},{NAME_COLUMN},{CUISINE_COLUMN},{LATITUDE_COLUMN},{LONGITUDE_COLUMN}"
    )?;
    for doc in documents {
        let (lat, lon) = doc
            .position
            .map(|p| (p.latitude.to_string(), p.longitude.to_string()))
            .unwrap_or_default();
        writeln!(
            file,
            "{},{},{},{},{}",
            doc.restaurant_id,
            quote(doc.name.as_deref()),
            quote(doc.cuisine.as_deref()),
            lat,
            lon
        )?;
    }

    file.flush()?;
    Ok(file)
}

fn quote(field: Option<&str>) -> String {
    field
        .map(|value| format!("\"{}\"", value.replace('"', "\"\"")))
        .unwrap_or_default()
}
