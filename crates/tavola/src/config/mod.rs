use std::ops::RangeInclusive;

use tavola_data::GeoPoint;

use crate::{
    cache::{DEFAULT_CAPACITY, DEFAULT_MAX_RESULTS, DEFAULT_TOLERANCE},
    cuisine::CuisineResolver,
    error::TavolaError,
};

/// Latitude/longitude window a caller accepts input for.
///
/// The engine never checks positions itself; this is for whatever collects
/// them (the CLI does).
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateBounds {
    pub latitude: RangeInclusive<f64>,
    pub longitude: RangeInclusive<f64>,
}

impl Default for CoordinateBounds {
    /// The New York City service area.
    fn default() -> Self {
        Self {
            latitude: 40.50..=41.20,
            longitude: -74.26..=-73.20,
        }
    }
}

impl CoordinateBounds {
    pub fn validate(&self, position: GeoPoint) -> Result<GeoPoint, TavolaError> {
        if !self.latitude.contains(&position.latitude) {
            return Err(TavolaError::InvalidPosition(format!(
                "latitude {} is outside the valid range [{}, {}]",
                position.latitude,
                self.latitude.start(),
                self.latitude.end()
            )));
        }
        if !self.longitude.contains(&position.longitude) {
            return Err(TavolaError::InvalidPosition(format!(
                "longitude {} is outside the valid range [{}, {}]",
                position.longitude,
                self.longitude.start(),
                self.longitude.end()
            )));
        }
        Ok(position)
    }
}

/// Configuration for nearest-restaurant queries.
///
/// Use [`QueryConfigBuilder`] to build one; the defaults reproduce the
/// engine's fixed policy (3 results, ±0.001° cache box, 20 cached rows).
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Number of nearest restaurants to return
    pub limit: usize,
    /// Half-width in degrees of the box a cached position covers on each axis
    pub cache_tolerance: f64,
    /// Rows the cache holds before it is flushed
    pub cache_capacity: usize,
    /// Minimum similarity for a cuisine suggestion
    pub fuzzy_cutoff: f64,
    /// Maximum number of cuisine suggestions considered
    pub max_suggestions: usize,
    /// Replace an unknown cuisine with the closest known one
    pub suggest_cuisines: bool,
    /// Accepted input window for callers that validate positions
    pub bounds: CoordinateBounds,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_MAX_RESULTS,
            cache_tolerance: DEFAULT_TOLERANCE,
            cache_capacity: DEFAULT_CAPACITY,
            fuzzy_cutoff: CuisineResolver::DEFAULT_CUTOFF,
            max_suggestions: CuisineResolver::DEFAULT_MAX_SUGGESTIONS,
            suggest_cuisines: true,
            bounds: CoordinateBounds::default(),
        }
    }
}

impl QueryConfig {
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::default()
    }

    pub fn cuisine_resolver(&self) -> CuisineResolver {
        CuisineResolver::new(
            self.fuzzy_cutoff,
            self.max_suggestions,
            self.suggest_cuisines,
        )
    }
}

/// Builder for creating query configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct QueryConfigBuilder {
    config: QueryConfig,
}

impl QueryConfigBuilder {
    /// Create a new builder with the default policy
    pub fn new() -> Self {
        Self {
            config: QueryConfig::default(),
        }
    }

    /// Only ever filter on a cuisine the store knows exactly
    pub fn strict() -> Self {
        let mut builder = Self::new();
        builder.config.suggest_cuisines = false;
        builder
    }

    /// Set the number of nearest restaurants to return
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = limit;
        self
    }

    /// Set the cache tolerance box half-width in degrees
    pub fn cache_tolerance(mut self, degrees: f64) -> Self {
        self.config.cache_tolerance = degrees;
        self
    }

    /// Set how many rows the cache holds before flushing
    pub fn cache_capacity(mut self, rows: usize) -> Self {
        self.config.cache_capacity = rows;
        self
    }

    /// Configure fuzzy cuisine matching
    pub fn fuzzy(mut self, enabled: bool, cutoff: f64) -> Self {
        self.config.suggest_cuisines = enabled;
        self.config.fuzzy_cutoff = cutoff;
        self
    }

    pub fn max_suggestions(mut self, max: usize) -> Self {
        self.config.max_suggestions = max;
        self
    }

    /// Set the accepted coordinate window
    pub fn bounds(mut self, bounds: CoordinateBounds) -> Self {
        self.config.bounds = bounds;
        self
    }

    /// Validate and build the final configuration
    pub fn build(self) -> Result<QueryConfig, TavolaError> {
        let config = self.config;
        if config.limit == 0 {
            return Err(TavolaError::ConfigError(
                "limit must be at least 1".to_string(),
            ));
        }
        if !config.cache_tolerance.is_finite() || config.cache_tolerance < 0.0 {
            return Err(TavolaError::ConfigError(format!(
                "cache tolerance must be a non-negative number of degrees, got {}",
                config.cache_tolerance
            )));
        }
        if config.cache_capacity == 0 {
            return Err(TavolaError::ConfigError(
                "cache capacity must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&config.fuzzy_cutoff) {
            return Err(TavolaError::ConfigError(format!(
                "fuzzy cutoff must be within [0, 1], got {}",
                config.fuzzy_cutoff
            )));
        }
        Ok(config)
    }
}
