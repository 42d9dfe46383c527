#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard filter types shared by every view.
//!
//! [`FilterState`] is the session-wide selection (year, month, time-of-day
//! phase, accident type, weather). It is never mutated in place: every
//! setter returns a new value and the owner swaps the whole snapshot.
//! [`QueryOverrides`] carries view-local selections (road and KM range)
//! that are layered on top of the shared state at query time, and
//! [`OptionCatalog`] holds the selectable values advertised by the remote
//! service.

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Errors raised while building filter values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Month outside `1..=12` or not a number.
    #[error("invalid month '{value}': expected 1-12")]
    InvalidMonth {
        /// The rejected input.
        value: String,
    },

    /// Dimension only exists as a view-local override.
    #[error("'{dimension}' is not part of the shared filter state")]
    OverrideOnly {
        /// The dimension that was rejected.
        dimension: FilterDimension,
    },
}

/// A single queryable dimension.
///
/// The string form of each variant is the query-parameter key understood by
/// the remote service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
pub enum FilterDimension {
    /// Calendar year of the accident.
    #[strum(serialize = "ano")]
    Year,
    /// Calendar month (1-12).
    #[strum(serialize = "mes")]
    Month,
    /// Time-of-day phase (dawn, full day, dusk, night).
    #[strum(serialize = "fase_dia")]
    Phase,
    /// Accident type (rear-end, run-off-road, ...).
    #[strum(serialize = "tipo_acidente")]
    AccidentType,
    /// Weather condition at the time of the accident.
    #[strum(serialize = "condicao_met")]
    Weather,
    /// Federal road number (view-local).
    #[strum(serialize = "br")]
    Road,
    /// First kilometer of the analysed stretch (view-local).
    #[strum(serialize = "km_inicio")]
    KmStart,
    /// Last kilometer of the analysed stretch (view-local).
    #[strum(serialize = "km_fim")]
    KmEnd,
}

impl FilterDimension {
    /// Every dimension, shared ones first.
    pub const ALL: &[Self] = &[
        Self::Year,
        Self::Month,
        Self::Phase,
        Self::AccidentType,
        Self::Weather,
        Self::Road,
        Self::KmStart,
        Self::KmEnd,
    ];

    /// Dimensions stored in [`FilterState`].
    pub const SHARED: &[Self] = &[
        Self::Year,
        Self::Month,
        Self::Phase,
        Self::AccidentType,
        Self::Weather,
    ];

    /// Query-parameter key for this dimension.
    #[must_use]
    pub const fn query_key(self) -> &'static str {
        match self {
            Self::Year => "ano",
            Self::Month => "mes",
            Self::Phase => "fase_dia",
            Self::AccidentType => "tipo_acidente",
            Self::Weather => "condicao_met",
            Self::Road => "br",
            Self::KmStart => "km_inicio",
            Self::KmEnd => "km_fim",
        }
    }

    /// Whether values for this dimension must be numeric to be sent.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::KmStart | Self::KmEnd)
    }

    /// Whether this dimension can only be supplied as a [`QueryOverrides`]
    /// entry.
    #[must_use]
    pub const fn is_override_only(self) -> bool {
        matches!(self, Self::Road | Self::KmStart | Self::KmEnd)
    }

    /// Human-readable label used by the presentation layer.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Year => "Year",
            Self::Month => "Month",
            Self::Phase => "Time of day",
            Self::AccidentType => "Accident type",
            Self::Weather => "Weather",
            Self::Road => "Road",
            Self::KmStart => "KM start",
            Self::KmEnd => "KM end",
        }
    }
}

/// Short Portuguese month labels as shown by the dashboard, indexed by
/// month number minus one.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Returns the dashboard label for a month number (1-12).
#[must_use]
pub fn month_label(month: u8) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|idx| MONTH_LABELS.get(usize::from(idx)))
        .copied()
}

/// Parses and normalizes a month value (`"03"` becomes `"3"`).
///
/// # Errors
///
/// Returns [`FilterError::InvalidMonth`] if the value is not an integer in
/// `1..=12`.
pub fn parse_month(value: &str) -> Result<u8, FilterError> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| FilterError::InvalidMonth {
            value: value.to_string(),
        })
}

fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The currently selected shared filters.
///
/// An unset field means "no constraint on that dimension". Values are
/// trimmed and never empty, so an unset dimension can never leak into a
/// query as `key=`. Deserialized states go through the same setters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FilterFields")]
pub struct FilterState {
    #[serde(rename = "ano", skip_serializing_if = "Option::is_none")]
    year: Option<String>,
    #[serde(rename = "mes", skip_serializing_if = "Option::is_none")]
    month: Option<String>,
    #[serde(rename = "fase_dia", skip_serializing_if = "Option::is_none")]
    phase: Option<String>,
    #[serde(rename = "tipo_acidente", skip_serializing_if = "Option::is_none")]
    accident_type: Option<String>,
    #[serde(rename = "condicao_met", skip_serializing_if = "Option::is_none")]
    weather: Option<String>,
}

/// Unvalidated wire form of [`FilterState`].
#[derive(Deserialize)]
struct FilterFields {
    #[serde(rename = "ano", default)]
    year: Option<String>,
    #[serde(rename = "mes", default)]
    month: Option<String>,
    #[serde(rename = "fase_dia", default)]
    phase: Option<String>,
    #[serde(rename = "tipo_acidente", default)]
    accident_type: Option<String>,
    #[serde(rename = "condicao_met", default)]
    weather: Option<String>,
}

impl TryFrom<FilterFields> for FilterState {
    type Error = FilterError;

    fn try_from(fields: FilterFields) -> Result<Self, Self::Error> {
        Self::new()
            .with_year(fields.year.as_deref().unwrap_or_default())
            .with_phase(fields.phase.as_deref().unwrap_or_default())
            .with_accident_type(fields.accident_type.as_deref().unwrap_or_default())
            .with_weather(fields.weather.as_deref().unwrap_or_default())
            .with_month(fields.month.as_deref().unwrap_or_default())
    }
}

impl FilterState {
    /// Creates a state with every dimension unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the year set (blank clears it).
    #[must_use]
    pub fn with_year(mut self, year: &str) -> Self {
        self.year = normalize(year);
        self
    }

    /// Returns a copy with the month set (blank clears it).
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidMonth`] if a non-blank value is not in
    /// `1..=12`.
    pub fn with_month(mut self, month: &str) -> Result<Self, FilterError> {
        self.month = match normalize(month) {
            Some(value) => Some(parse_month(&value)?.to_string()),
            None => None,
        };
        Ok(self)
    }

    /// Returns a copy with the time-of-day phase set (blank clears it).
    #[must_use]
    pub fn with_phase(mut self, phase: &str) -> Self {
        self.phase = normalize(phase);
        self
    }

    /// Returns a copy with the accident type set (blank clears it).
    #[must_use]
    pub fn with_accident_type(mut self, accident_type: &str) -> Self {
        self.accident_type = normalize(accident_type);
        self
    }

    /// Returns a copy with the weather condition set (blank clears it).
    #[must_use]
    pub fn with_weather(mut self, weather: &str) -> Self {
        self.weather = normalize(weather);
        self
    }

    /// Returns a copy with `dimension` set to `value`.
    ///
    /// # Errors
    ///
    /// * [`FilterError::OverrideOnly`] for road and KM dimensions.
    /// * [`FilterError::InvalidMonth`] for an out-of-range month.
    pub fn with(self, dimension: FilterDimension, value: &str) -> Result<Self, FilterError> {
        match dimension {
            FilterDimension::Year => Ok(self.with_year(value)),
            FilterDimension::Month => self.with_month(value),
            FilterDimension::Phase => Ok(self.with_phase(value)),
            FilterDimension::AccidentType => Ok(self.with_accident_type(value)),
            FilterDimension::Weather => Ok(self.with_weather(value)),
            FilterDimension::Road | FilterDimension::KmStart | FilterDimension::KmEnd => {
                Err(FilterError::OverrideOnly { dimension })
            }
        }
    }

    /// Returns the selected value for `dimension`, if any.
    #[must_use]
    pub fn get(&self, dimension: FilterDimension) -> Option<&str> {
        match dimension {
            FilterDimension::Year => self.year.as_deref(),
            FilterDimension::Month => self.month.as_deref(),
            FilterDimension::Phase => self.phase.as_deref(),
            FilterDimension::AccidentType => self.accident_type.as_deref(),
            FilterDimension::Weather => self.weather.as_deref(),
            FilterDimension::Road | FilterDimension::KmStart | FilterDimension::KmEnd => None,
        }
    }

    /// Selected year.
    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    /// Selected month.
    #[must_use]
    pub fn month(&self) -> Option<&str> {
        self.month.as_deref()
    }

    /// Selected time-of-day phase.
    #[must_use]
    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }

    /// Selected accident type.
    #[must_use]
    pub fn accident_type(&self) -> Option<&str> {
        self.accident_type.as_deref()
    }

    /// Selected weather condition.
    #[must_use]
    pub fn weather(&self) -> Option<&str> {
        self.weather.as_deref()
    }

    /// Returns `true` if no dimension is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        FilterDimension::SHARED.iter().all(|d| self.get(*d).is_none())
    }

    /// Iterates over the constrained dimensions and their values.
    pub fn selected(&self) -> impl Iterator<Item = (FilterDimension, &str)> {
        FilterDimension::SHARED
            .iter()
            .filter_map(|d| self.get(*d).map(|v| (*d, v)))
    }
}

/// View-local selections layered over the shared [`FilterState`] when a
/// query is composed.
///
/// Any dimension may be overridden; the road and KM range exist only here.
/// Values are stored as entered; the composer decides what is sendable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOverrides {
    values: std::collections::BTreeMap<FilterDimension, String>,
}

impl QueryOverrides {
    /// Creates an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy overriding `dimension` (blank removes the override).
    #[must_use]
    pub fn with(mut self, dimension: FilterDimension, value: &str) -> Self {
        match normalize(value) {
            Some(v) => {
                self.values.insert(dimension, v);
            }
            None => {
                self.values.remove(&dimension);
            }
        }
        self
    }

    /// Returns a copy selecting a road.
    #[must_use]
    pub fn road(self, road: &str) -> Self {
        self.with(FilterDimension::Road, road)
    }

    /// Returns a copy selecting a KM range. Either bound may be blank.
    #[must_use]
    pub fn km_range(self, start: &str, end: &str) -> Self {
        self.with(FilterDimension::KmStart, start)
            .with(FilterDimension::KmEnd, end)
    }

    /// Returns the raw override for `dimension`, if any.
    #[must_use]
    pub fn get(&self, dimension: FilterDimension) -> Option<&str> {
        self.values.get(&dimension).map(String::as_str)
    }

    /// Returns `true` if nothing is overridden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Selectable values advertised by the remote service.
///
/// An empty catalog means "no options available yet", not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCatalog {
    /// Years present in the dataset.
    #[serde(alias = "anos", deserialize_with = "string_list")]
    pub years: Vec<String>,
    /// Weather conditions.
    #[serde(alias = "condicoes_meteorologicas", deserialize_with = "string_list")]
    pub conditions: Vec<String>,
    /// Accident types.
    #[serde(alias = "tipos_acidente", deserialize_with = "string_list")]
    pub types: Vec<String>,
    /// Time-of-day phases.
    #[serde(alias = "fases_dia", deserialize_with = "string_list")]
    pub phases: Vec<String>,
}

impl OptionCatalog {
    /// Returns `true` if no dimension has any option.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
            && self.conditions.is_empty()
            && self.types.is_empty()
            && self.phases.is_empty()
    }

    /// Options for a shared dimension. Month options are fixed; override-only
    /// dimensions have none.
    #[must_use]
    pub fn values_for(&self, dimension: FilterDimension) -> Vec<String> {
        match dimension {
            FilterDimension::Year => self.years.clone(),
            FilterDimension::Month => (1..=12u8).map(|m| m.to_string()).collect(),
            FilterDimension::Phase => self.phases.clone(),
            FilterDimension::AccidentType => self.types.clone(),
            FilterDimension::Weather => self.conditions.clone(),
            FilterDimension::Road | FilterDimension::KmStart | FilterDimension::KmEnd => {
                Vec::new()
            }
        }
    }
}

/// Accepts an array of strings or numbers; numbers are stringified and
/// nulls skipped. Anything else is a shape error.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .filter(|v| !v.is_null())
        .map(|v| match v {
            serde_json::Value::String(s) => Ok(s),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "expected string or number option, got {other}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_clear_dimensions() {
        let state = FilterState::new().with_year("2024").with_year("   ");
        assert!(state.year().is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn month_is_validated_and_normalized() {
        let state = FilterState::new().with_month("03").unwrap();
        assert_eq!(state.month(), Some("3"));
        assert!(FilterState::new().with_month("13").is_err());
        assert!(FilterState::new().with_month("jan").is_err());
        assert!(FilterState::new().with_month("").unwrap().month().is_none());
    }

    #[test]
    fn deserialized_state_is_normalized() {
        let state: FilterState =
            serde_json::from_str(r#"{"ano": "", "mes": " 03 ", "fase_dia": "  Noite "}"#).unwrap();
        assert!(state.year().is_none());
        assert_eq!(state.month(), Some("3"));
        assert_eq!(state.phase(), Some("Noite"));
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"mes":"3","fase_dia":"Noite"}"#
        );

        assert!(serde_json::from_str::<FilterState>(r#"{"mes": "99"}"#).is_err());
        assert_eq!(
            serde_json::from_str::<FilterState>("{}").unwrap(),
            FilterState::new()
        );
    }

    #[test]
    fn override_only_dimensions_rejected_by_state() {
        let err = FilterState::new()
            .with(FilterDimension::Road, "381")
            .unwrap_err();
        assert_eq!(
            err,
            FilterError::OverrideOnly {
                dimension: FilterDimension::Road
            }
        );
    }

    #[test]
    fn dimension_keys_match_display() {
        for dim in FilterDimension::ALL {
            assert_eq!(dim.to_string(), dim.query_key());
            assert_eq!(dim.query_key().parse::<FilterDimension>().unwrap(), *dim);
        }
    }

    #[test]
    fn month_labels() {
        assert_eq!(month_label(1), Some("Jan"));
        assert_eq!(month_label(12), Some("Dez"));
        assert_eq!(month_label(0), None);
        assert_eq!(month_label(13), None);
    }

    #[test]
    fn catalog_accepts_service_keys_and_numeric_years() {
        let body = serde_json::json!({
            "anos": [2023, "2024"],
            "condicoes_meteorologicas": ["Chuva", "Sol"],
            "tipos_acidente": ["Colisão traseira"],
            "fases_dia": ["Pleno dia", null]
        });
        let catalog: OptionCatalog = serde_json::from_value(body).unwrap();
        assert_eq!(catalog.years, vec!["2023", "2024"]);
        assert_eq!(catalog.phases, vec!["Pleno dia"]);
        assert!(!catalog.is_empty());
    }

    #[test]
    fn catalog_missing_key_is_an_error() {
        let body = serde_json::json!({ "anos": ["2024"] });
        assert!(serde_json::from_value::<OptionCatalog>(body).is_err());
    }

    #[test]
    fn overrides_drop_blank_values() {
        let overrides = QueryOverrides::new().road("381").km_range("10", " ");
        assert_eq!(overrides.get(FilterDimension::Road), Some("381"));
        assert_eq!(overrides.get(FilterDimension::KmStart), Some("10"));
        assert!(overrides.get(FilterDimension::KmEnd).is_none());
    }
}
