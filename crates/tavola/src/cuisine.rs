//! Deciding which cuisine filter a query runs with.
//!
//! An exact (case-insensitive) match filters on that cuisine. A near miss is
//! treated as a typo and replaced by the closest known cuisine. Anything else
//! runs unfiltered, because a cuisine nobody serves is more likely a mistake
//! than a request for zero results.

use std::fmt;

use ahash::AHashSet as HashSet;
use itertools::Itertools;
use rapidfuzz::fuzz;
use tavola_data::normalize_cuisine;
use tracing::debug;

/// The cuisine filter a query ends up using.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CuisineFilter {
    /// No cuisine was requested, or nothing close enough exists.
    NoFilter,
    /// The request matched a known cuisine.
    Exact(String),
    /// The request did not match, so the closest known cuisine is used instead.
    Suggested {
        requested: String,
        suggestion: String,
    },
}

impl CuisineFilter {
    /// The normalized cuisine to filter on, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::NoFilter => None,
            Self::Exact(cuisine) => Some(cuisine),
            Self::Suggested { suggestion, .. } => Some(suggestion),
        }
    }

    pub fn is_filtered(&self) -> bool {
        !matches!(self, Self::NoFilter)
    }
}

impl fmt::Display for CuisineFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFilter => write!(f, "all cuisines"),
            Self::Exact(cuisine) => write!(f, "{cuisine}"),
            Self::Suggested {
                requested,
                suggestion,
            } => write!(f, "{suggestion} (suggested for '{requested}')"),
        }
    }
}

/// Resolves a requested cuisine against the cuisines the store knows about.
#[derive(Debug, Clone)]
pub struct CuisineResolver {
    cutoff: f64,
    max_suggestions: usize,
    suggest: bool,
}

impl Default for CuisineResolver {
    fn default() -> Self {
        Self {
            cutoff: Self::DEFAULT_CUTOFF,
            max_suggestions: Self::DEFAULT_MAX_SUGGESTIONS,
            suggest: true,
        }
    }
}

impl CuisineResolver {
    pub const DEFAULT_CUTOFF: f64 = 0.6;
    pub const DEFAULT_MAX_SUGGESTIONS: usize = 3;

    pub fn new(cutoff: f64, max_suggestions: usize, suggest: bool) -> Self {
        Self {
            cutoff,
            max_suggestions,
            suggest,
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Decide the filter for `requested` given the known cuisines.
    ///
    /// Known cuisines may be in any case; they are folded before comparison.
    pub fn resolve<S: AsRef<str>>(&self, requested: Option<&str>, known: &[S]) -> CuisineFilter {
        let Some(requested) = requested.and_then(normalize_cuisine) else {
            return CuisineFilter::NoFilter;
        };

        let known: HashSet<String> = known
            .iter()
            .filter_map(|cuisine| normalize_cuisine(cuisine.as_ref()))
            .collect();
        if known.contains(&requested) {
            return CuisineFilter::Exact(requested);
        }

        if self.suggest
            && let Some(suggestion) = self
                .rank(&requested, known.iter().map(String::as_str))
                .into_iter()
                .next()
        {
            debug!(%requested, %suggestion, "Using closest known cuisine");
            return CuisineFilter::Suggested {
                requested,
                suggestion,
            };
        }

        debug!(%requested, "No close cuisine match, searching unfiltered");
        CuisineFilter::NoFilter
    }

    /// Up to `max_suggestions` known cuisines that look like `requested`,
    /// best match first.
    pub fn suggestions<S: AsRef<str>>(&self, requested: &str, known: &[S]) -> Vec<String> {
        let Some(requested) = normalize_cuisine(requested) else {
            return Vec::new();
        };
        let known: Vec<String> = known
            .iter()
            .filter_map(|cuisine| normalize_cuisine(cuisine.as_ref()))
            .sorted()
            .dedup()
            .collect();
        self.rank(&requested, known.iter().map(String::as_str))
    }

    fn rank<'a>(&self, requested: &str, known: impl Iterator<Item = &'a str>) -> Vec<String> {
        if self.max_suggestions == 0 {
            return Vec::new();
        }
        known
            .map(|candidate| (similarity(requested, candidate), candidate))
            .filter(|(score, _)| *score >= self.cutoff)
            // Highest score first, alphabetical among equals.
            .sorted_by(|(a_score, a), (b_score, b)| {
                b_score.total_cmp(a_score).then_with(|| a.cmp(b))
            })
            .take(self.max_suggestions)
            .map(|(_, candidate)| candidate.to_owned())
            .collect()
    }
}

/// Normalized similarity in `[0, 1]`, 1 meaning identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    fuzz::ratio(a.chars(), b.chars())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: [&str; 6] = ["Italian", "Chinese", "Pizza", "Thai", "Mexican", "Pizza/Italian"];

    #[test]
    fn test_empty_request_is_unfiltered() {
        let resolver = CuisineResolver::default();
        assert_eq!(resolver.resolve(None, &KNOWN), CuisineFilter::NoFilter);
        assert_eq!(resolver.resolve(Some(""), &KNOWN), CuisineFilter::NoFilter);
        assert_eq!(resolver.resolve(Some("   "), &KNOWN), CuisineFilter::NoFilter);
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let resolver = CuisineResolver::default();
        assert_eq!(
            resolver.resolve(Some("ITALIAN"), &KNOWN),
            CuisineFilter::Exact("italian".to_string())
        );
        assert_eq!(
            resolver.resolve(Some(" thai "), &KNOWN),
            CuisineFilter::Exact("thai".to_string())
        );
    }

    #[test]
    fn test_typo_resolves_to_suggestion() {
        let resolver = CuisineResolver::default();
        let filter = resolver.resolve(Some("Itlian"), &KNOWN);
        assert_eq!(
            filter,
            CuisineFilter::Suggested {
                requested: "itlian".to_string(),
                suggestion: "italian".to_string(),
            }
        );
        assert_eq!(filter.key(), Some("italian"));
    }

    // Unknown cuisines deliberately broaden to an unfiltered search rather than
    // returning nothing.
    #[test]
    fn test_unmatched_cuisine_falls_back_to_no_filter() {
        let resolver = CuisineResolver::default();
        assert_eq!(
            resolver.resolve(Some("xyzzy"), &KNOWN),
            CuisineFilter::NoFilter
        );
    }

    #[test]
    fn test_no_known_cuisines_is_unfiltered() {
        let resolver = CuisineResolver::default();
        assert_eq!(
            resolver.resolve(Some("italian"), &Vec::<String>::new()),
            CuisineFilter::NoFilter
        );
    }

    #[test]
    fn test_suggestions_disabled() {
        let resolver = CuisineResolver::new(0.6, 3, false);
        assert_eq!(
            resolver.resolve(Some("Itlian"), &KNOWN),
            CuisineFilter::NoFilter
        );
        assert_eq!(
            resolver.resolve(Some("italian"), &KNOWN),
            CuisineFilter::Exact("italian".to_string())
        );
    }

    #[test]
    fn test_suggestions_are_ranked_and_capped() {
        let resolver = CuisineResolver::default();
        let suggestions = resolver.suggestions("pizza italian", &KNOWN);
        assert_eq!(suggestions.first().map(String::as_str), Some("pizza/italian"));
        assert!(suggestions.len() <= CuisineResolver::DEFAULT_MAX_SUGGESTIONS);

        let capped = CuisineResolver::new(0.0, 2, true).suggestions("a", &KNOWN);
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = CuisineResolver::default();
        let first = resolver.resolve(Some("chinse"), &KNOWN);
        for _ in 0..10 {
            assert_eq!(resolver.resolve(Some("chinse"), &KNOWN), first);
        }
        assert_eq!(first.key(), Some("chinese"));
    }

    #[test]
    fn test_similarity_bounds() {
        assert!((similarity("thai", "thai") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("thai", "mexican") < 0.6);
    }
}
