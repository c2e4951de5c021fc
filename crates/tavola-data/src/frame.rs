use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use polars::prelude::*;
use tracing::{debug, info, instrument};

use crate::{
    DataError, Result,
    document::{GeoPoint, RestaurantDocument},
    source::{RestaurantScan, RestaurantSource},
};

pub const ID_COLUMN: &str = "restaurant_id";
pub const NAME_COLUMN: &str = "name";
pub const CUISINE_COLUMN: &str = "cuisine";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";
const CUISINE_KEY_COLUMN: &str = "cuisine_key";

const REQUIRED_COLUMNS: [&str; 5] = [
    ID_COLUMN,
    NAME_COLUMN,
    CUISINE_COLUMN,
    LATITUDE_COLUMN,
    LONGITUDE_COLUMN,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Ok(Self::Csv),
            Some("parquet" | "pq") => Ok(Self::Parquet),
            _ => Err(DataError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// A restaurant table on disk, read with polars.
///
/// The file holds one denormalized row per restaurant with the columns
/// `restaurant_id`, `name`, `cuisine`, `latitude` and `longitude`; any other
/// columns are ignored. The table is loaded into memory on first use and kept
/// there, cuisine filters are applied to the frame before any row reaches the
/// caller, and values that cannot be read as numbers come through as missing.
#[derive(Clone)]
pub struct FrameRestaurantSource {
    path: PathBuf,
    format: TableFormat,
    frame: OnceCell<LazyFrame>,
}

impl FrameRestaurantSource {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = TableFormat::from_path(&path)?;
        Ok(Self::with_format(path, format))
    }

    pub fn with_format(path: impl Into<PathBuf>, format: TableFormat) -> Self {
        Self {
            path: path.into(),
            format,
            frame: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> TableFormat {
        self.format
    }

    fn frame(&self) -> Result<&LazyFrame> {
        self.frame.get_or_try_init(|| self.load())
    }

    #[instrument(name = "Load restaurant table", level = "info", skip(self), fields(path = ?self.path))]
    fn load(&self) -> Result<LazyFrame> {
        if !self.path.exists() {
            return Err(DataError::Unavailable(format!(
                "restaurant table not found at {}",
                self.path.display()
            )));
        }
        let t_load = std::time::Instant::now();

        let raw = match self.format {
            TableFormat::Csv => LazyCsvReader::new(&self.path)
                .with_has_header(true)
                .finish()?,
            TableFormat::Parquet => LazyFrame::scan_parquet(&self.path, Default::default())?,
        }
        .collect()?;

        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|column| raw.column(column).is_err())
        {
            return Err(DataError::MissingColumn((*missing).to_string()));
        }

        let df = raw
            .lazy()
            .select([
                col(ID_COLUMN).cast(DataType::Int64),
                col(NAME_COLUMN).cast(DataType::String),
                col(CUISINE_COLUMN).cast(DataType::String),
                col(LATITUDE_COLUMN).cast(DataType::Float64),
                col(LONGITUDE_COLUMN).cast(DataType::Float64),
                col(CUISINE_COLUMN)
                    .cast(DataType::String)
                    .str()
                    .strip_chars(lit(NULL))
                    .str()
                    .to_lowercase()
                    .alias(CUISINE_KEY_COLUMN),
            ])
            .collect()?;

        info!(
            rows = df.height(),
            elapsed = ?t_load.elapsed(),
            "Restaurant table collected into memory"
        );
        Ok(df.lazy())
    }
}

impl RestaurantSource for FrameRestaurantSource {
    fn cuisines(&self) -> Result<Vec<String>> {
        let df = self
            .frame()?
            .clone()
            .select([col(CUISINE_KEY_COLUMN)])
            .collect()?;
        let keys = df.column(CUISINE_KEY_COLUMN)?.str()?;
        let mut cuisines: Vec<String> = keys
            .into_iter()
            .flatten()
            .filter(|key| !key.is_empty())
            .map(str::to_owned)
            .collect();
        cuisines.sort_unstable();
        cuisines.dedup();
        Ok(cuisines)
    }

    #[instrument(name = "Scan restaurant table", level = "debug", skip(self))]
    fn scan(&self, cuisine_key: Option<&str>) -> Result<RestaurantScan<'_>> {
        let mut lf = self.frame()?.clone();
        if let Some(key) = cuisine_key {
            lf = lf.filter(col(CUISINE_KEY_COLUMN).eq(lit(key.to_owned())));
        }
        let df = lf
            .select([
                col(ID_COLUMN),
                col(NAME_COLUMN),
                col(CUISINE_COLUMN),
                col(LATITUDE_COLUMN),
                col(LONGITUDE_COLUMN),
            ])
            .collect()?;
        debug!(rows = df.height(), "Scan matched rows");
        Ok(Box::new(FrameScan::new(&df)?))
    }
}

/// Row cursor over a collected frame.
struct FrameScan {
    ids: Int64Chunked,
    names: StringChunked,
    cuisines: StringChunked,
    latitudes: Float64Chunked,
    longitudes: Float64Chunked,
    row: usize,
}

impl FrameScan {
    fn new(df: &DataFrame) -> Result<Self> {
        Ok(Self {
            ids: df.column(ID_COLUMN)?.i64()?.clone(),
            names: df.column(NAME_COLUMN)?.str()?.clone(),
            cuisines: df.column(CUISINE_COLUMN)?.str()?.clone(),
            latitudes: df.column(LATITUDE_COLUMN)?.f64()?.clone(),
            longitudes: df.column(LONGITUDE_COLUMN)?.f64()?.clone(),
            row: 0,
        })
    }
}

impl Iterator for FrameScan {
    type Item = Result<RestaurantDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.row < self.ids.len() {
            let row = self.row;
            self.row += 1;

            // Rows without an id cannot be referenced by anything downstream.
            let Some(restaurant_id) = self.ids.get(row) else {
                debug!(row, "Skipping row without restaurant id");
                continue;
            };
            let position = match (self.latitudes.get(row), self.longitudes.get(row)) {
                (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
                _ => None,
            };
            return Some(Ok(RestaurantDocument {
                restaurant_id,
                name: self.names.get(row).map(str::to_owned),
                cuisine: self.cuisines.get(row).map(str::to_owned),
                position,
            }));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_format_from_extension() {
        assert_eq!(
            TableFormat::from_path(Path::new("restaurants.csv")).unwrap(),
            TableFormat::Csv
        );
        assert_eq!(
            TableFormat::from_path(Path::new("restaurants.PARQUET")).unwrap(),
            TableFormat::Parquet
        );
        assert!(matches!(
            TableFormat::from_path(Path::new("restaurants.json")),
            Err(DataError::UnsupportedFormat(_))
        ));
        assert!(TableFormat::from_path(Path::new("restaurants")).is_err());
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let source = FrameRestaurantSource::new("/definitely/not/here/restaurants.csv").unwrap();
        assert!(matches!(
            source.scan(None).err(),
            Some(DataError::Unavailable(_))
        ));
    }
}
