//! Document store access for Tavola.
//!
//! Restaurants live in a denormalized table (one row per restaurant) that the
//! query engine only ever reads. This crate owns the projection the engine
//! needs ([`RestaurantDocument`]), the [`RestaurantSource`] boundary the engine
//! scans through, and two sources: an in-memory one and a polars-backed one
//! reading CSV or Parquet files.

pub mod document;
pub mod frame;
pub mod source;
pub mod test_data;

pub use document::{GeoPoint, RestaurantDocument, RestaurantRecord, normalize_cuisine};
pub use frame::{FrameRestaurantSource, TableFormat};
pub use source::{InMemoryRestaurantSource, RestaurantScan, RestaurantSource};
pub use test_data::{SampleDataConfig, create_sample_csv, sample_restaurants};

mod error {
    use polars::prelude::PolarsError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[error("Required column '{0}' not found in restaurant table")]
        MissingColumn(String),
        #[error("Unsupported restaurant table format: {0}")]
        UnsupportedFormat(String),
        #[error("Document store unavailable: {0}")]
        Unavailable(String),
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use error::{DataError, Result};
