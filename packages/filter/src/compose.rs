//! Query composition.
//!
//! Turns the shared [`FilterState`] plus view-local [`QueryOverrides`] into
//! a normalized, deterministically ordered parameter set. The encoded form
//! doubles as the change-detection key for re-fetching, so identical
//! logical input must always produce byte-identical output.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use roadwatch_filter_models::{FilterDimension, FilterState, QueryOverrides};

/// Characters escaped in query values: everything except the unreserved
/// set `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A composed, ordered set of query parameters.
///
/// Pairs are sorted alphabetically by key and never contain empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams {
    pairs: Vec<(FilterDimension, String)>,
}

impl QueryParams {
    /// Returns `true` if no dimension is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Value for `dimension`, if present.
    #[must_use]
    pub fn get(&self, dimension: FilterDimension) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over `(key, value)` pairs in encoding order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.pairs.iter().map(|(d, v)| (d.query_key(), v.as_str()))
    }

    /// Unencoded pairs, suitable for `reqwest::RequestBuilder::query`.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        self.pairs
            .iter()
            .map(|(d, v)| (d.query_key(), v.clone()))
            .collect()
    }

    /// Encodes as `key=value&...` with percent-encoded values.
    #[must_use]
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(d, v)| format!("{}={}", d.query_key(), utf8_percent_encode(v, QUERY_VALUE)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl std::fmt::Display for QueryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Returns `true` for a non-empty, finite decimal number.
fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Composes the query for a view.
///
/// For each dimension the override wins, then the shared state, otherwise
/// the dimension is omitted. KM bounds are only sent when numeric; whether
/// start is below end is left to the server.
#[must_use]
pub fn compose(filters: &FilterState, overrides: &QueryOverrides) -> QueryParams {
    let mut pairs: Vec<(FilterDimension, String)> = FilterDimension::ALL
        .iter()
        .filter_map(|dim| {
            let value = overrides
                .get(*dim)
                .filter(|v| !dim.is_numeric() || is_numeric(v))
                .or_else(|| filters.get(*dim))?;
            Some((*dim, value.trim().to_string()))
        })
        .collect();

    pairs.sort_by(|(a, _), (b, _)| a.query_key().cmp(b.query_key()));

    QueryParams { pairs }
}

/// Canonical query string for the shared state alone.
#[must_use]
pub fn query_string(filters: &FilterState) -> String {
    compose(filters, &QueryOverrides::default()).encode()
}
