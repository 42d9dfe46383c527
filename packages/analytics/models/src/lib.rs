#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input and output types for the dashboard analytics.
//!
//! [`SegmentRecord`]s arrive from the remote KM-distribution endpoint and
//! are reshaped into [`AggregatedRow`]s plus an optional
//! [`CriticalSegmentInsight`]. [`RawPoint`]s from the forecast endpoint are
//! merged into provenance-tagged [`TimePoint`]s.
//!
//! Field names follow the dashboard's camelCase JSON contract; the
//! Portuguese keys emitted by the data service are accepted as aliases.

use serde::ser::SerializeMap as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// Per-cause accident counts for one KM bucket, in the order the service
/// listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CauseCounts(Vec<(String, u64)>);

impl CauseCounts {
    /// Builds counts from `(cause, count)` pairs. Later duplicates replace
    /// earlier ones in place.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut counts = Self::default();
        for (cause, count) in pairs {
            counts.insert(cause.into(), count);
        }
        counts
    }

    fn insert(&mut self, cause: String, count: u64) {
        if let Some(entry) = self.0.iter_mut().find(|(c, _)| *c == cause) {
            entry.1 = count;
        } else {
            self.0.push((cause, count));
        }
    }

    /// Reads counts from an arbitrary JSON value. Anything but an object is
    /// empty; entries whose count is not a non-negative integer are skipped.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut counts = Self::default();
        if let Some(map) = value.as_object() {
            for (cause, count) in map {
                if let Some(count) = count_value(count) {
                    counts.insert(cause.clone(), count);
                }
            }
        }
        counts
    }

    /// Count for `cause`, if attributed.
    #[must_use]
    pub fn get(&self, cause: &str) -> Option<u64> {
        self.0.iter().find(|(c, _)| c == cause).map(|(_, n)| *n)
    }

    /// Iterates over `(cause, count)` in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(c, n)| (c.as_str(), *n))
    }

    /// Number of attributed causes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no cause is attributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of the attributed counts. Not necessarily the bucket total.
    #[must_use]
    pub fn attributed_total(&self) -> u64 {
        self.0.iter().map(|(_, n)| *n).sum()
    }
}

impl Serialize for CauseCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (cause, count) in &self.0 {
            map.serialize_entry(cause, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CauseCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> serde::de::Visitor<'de> for CountsVisitor {
            type Value = CauseCounts;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of cause name to count, or null")
            }

            fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                while access.next_element::<serde::de::IgnoredAny>()?.is_some() {}
                Ok(CauseCounts::default())
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(CauseCounts::default())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(CauseCounts::default())
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut counts = CauseCounts::default();
                while let Some((cause, value)) =
                    access.next_entry::<String, serde_json::Value>()?
                {
                    if let Some(count) = count_value(&value) {
                        counts.insert(cause, count);
                    }
                }
                Ok(counts)
            }
        }

        deserializer.deserialize_any(CountsVisitor)
    }
}

/// Non-negative integer count from a JSON number; whole floats are
/// accepted, anything else is skipped.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
#[must_use]
pub fn count_value(value: &serde_json::Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.trunc() == *f)
            .map(|f| f as u64)
    })
}

/// One KM bucket as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    /// Bucket label, e.g. `"0 - 10"`.
    #[serde(alias = "faixa_km")]
    pub bucket_label: String,
    /// Accidents in the bucket.
    #[serde(alias = "total_acidentes", default)]
    pub total_accidents: u64,
    /// Weighted severity score used to rank buckets.
    #[serde(alias = "indice_severidade", default)]
    pub severity_index: f64,
    /// Most frequent cause in the bucket.
    #[serde(alias = "causa_predominante", default)]
    pub dominant_cause: String,
    /// Per-cause counts. May be partial; does not have to sum to
    /// `total_accidents`.
    #[serde(alias = "causas_detalhadas", default)]
    pub cause_counts: CauseCounts,
}

/// A flattened bucket row ready for stacked-series rendering.
///
/// `causes` is aligned with [`SegmentAnalysis::causes`]: every batch cause
/// is present, zero when the bucket has no attribution for it.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    /// Bucket label.
    pub bucket_label: String,
    /// Accidents in the bucket.
    pub total: u64,
    /// Severity score.
    pub severity_index: f64,
    /// Most frequent cause.
    pub dominant_cause: String,
    /// `(cause, count)` per batch column, in column order.
    pub causes: Vec<(String, u64)>,
}

impl AggregatedRow {
    /// Count for `cause`, `0` when the cause is not a column.
    #[must_use]
    pub fn cause(&self, cause: &str) -> u64 {
        self.causes
            .iter()
            .find(|(c, _)| c == cause)
            .map_or(0, |(_, n)| *n)
    }
}

/// Serialized flat: the fixed fields followed by one numeric field per
/// cause column.
impl Serialize for AggregatedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4 + self.causes.len()))?;
        map.serialize_entry("bucketLabel", &self.bucket_label)?;
        map.serialize_entry("total", &self.total)?;
        map.serialize_entry("severityIndex", &self.severity_index)?;
        map.serialize_entry("dominantCause", &self.dominant_cause)?;
        for (cause, count) in &self.causes {
            map.serialize_entry(cause, count)?;
        }
        map.end()
    }
}

/// The most severe bucket of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalSegmentInsight {
    /// Label of the worst bucket.
    pub bucket_label: String,
    /// Its dominant cause.
    pub dominant_cause: String,
    /// Its severity score.
    pub severity_index: f64,
}

/// Aggregation output for one batch of segment records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentAnalysis {
    /// Union of cause names across the batch, in order of first appearance.
    pub causes: Vec<String>,
    /// One row per input record, in input order.
    pub rows: Vec<AggregatedRow>,
    /// The highest-severity bucket, absent for an empty batch.
    pub insight: Option<CriticalSegmentInsight>,
}

impl SegmentAnalysis {
    /// Returns `true` if the batch had no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Whether a trend point was observed or produced by the forecast model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provenance {
    /// Observed data.
    Historical,
    /// Model output.
    Forecast,
}

/// A raw `(date, value)` point from the forecast endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    /// ISO-like, lexically sortable date.
    pub date: String,
    /// Point value. The forecast series names it `predicao`.
    #[serde(alias = "predicao", default)]
    pub value: f64,
}

impl RawPoint {
    /// Creates a point.
    #[must_use]
    pub fn new(date: impl Into<String>, value: f64) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }
}

/// A merged trend point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePoint {
    /// ISO-like, lexically sortable date.
    pub date: String,
    /// Point value, scaled for forecast points.
    pub value: f64,
    /// Where the point came from.
    pub provenance: Provenance,
    /// Lower uncertainty bound (forecast only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_low: Option<f64>,
    /// Upper uncertainty bound (forecast only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_high: Option<f64>,
}

/// Knobs applied to the forecast series when merging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOptions {
    /// Multiplier for forecast values; `1.0` leaves them unchanged.
    pub reduction_factor: f64,
    /// Half-width of the uncertainty band; `0` disables it.
    pub uncertainty_margin: f64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            reduction_factor: 1.0,
            uncertainty_margin: 0.0,
        }
    }
}

impl MergeOptions {
    /// Returns a copy with the reduction factor set.
    #[must_use]
    pub const fn with_reduction_factor(mut self, factor: f64) -> Self {
        self.reduction_factor = factor;
        self
    }

    /// Returns a copy with the uncertainty margin set.
    #[must_use]
    pub const fn with_uncertainty_margin(mut self, margin: f64) -> Self {
        self.uncertainty_margin = margin;
        self
    }
}

/// Model quality and risk summary reported alongside a forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastMetrics {
    /// Mean absolute error of the model.
    #[serde(default)]
    pub mae: Option<f64>,
    /// Risk classification, e.g. `"ESTÁVEL"` or `"CRÍTICO"`.
    #[serde(alias = "risk_level", default)]
    pub risk_level: Option<String>,
    /// Last observed date.
    #[serde(alias = "last_date", default)]
    pub last_date: Option<String>,
    /// Road the forecast was computed for.
    #[serde(alias = "br_ativa", default)]
    pub active_road: Option<String>,
}

/// A merged historical + forecast series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    /// Historical points followed by forecast points.
    pub points: Vec<TimePoint>,
    /// Forecast metrics, when the service reported any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ForecastMetrics>,
    /// Main causes the model's recommendations are built around.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl TrendSeries {
    /// Returns `true` if neither series contributed a point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Observed points.
    pub fn historical(&self) -> impl Iterator<Item = &TimePoint> {
        self.points
            .iter()
            .filter(|p| p.provenance == Provenance::Historical)
    }

    /// Forecast points.
    pub fn forecast(&self) -> impl Iterator<Item = &TimePoint> {
        self.points
            .iter()
            .filter(|p| p.provenance == Provenance::Forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_record_accepts_service_keys() {
        let body = serde_json::json!({
            "faixa_km": "0 - 10",
            "total_acidentes": 12,
            "indice_severidade": 1.8,
            "causa_predominante": "Velocidade",
            "causas_detalhadas": { "Velocidade": 9, "Chuva": 3 }
        });
        let record: SegmentRecord = serde_json::from_value(body).unwrap();
        assert_eq!(record.bucket_label, "0 - 10");
        assert_eq!(record.total_accidents, 12);
        assert_eq!(record.cause_counts.get("Chuva"), Some(3));
    }

    #[test]
    fn cause_counts_keep_source_order() {
        let counts: CauseCounts =
            serde_json::from_str(r#"{"speeding": 9, "rain": 3, "alcohol": 1}"#).unwrap();
        let names: Vec<&str> = counts.iter().map(|(c, _)| c).collect();
        assert_eq!(names, vec!["speeding", "rain", "alcohol"]);
        assert_eq!(counts.attributed_total(), 13);
    }

    #[test]
    fn missing_or_null_cause_counts_are_empty() {
        let record: SegmentRecord = serde_json::from_value(serde_json::json!({
            "bucketLabel": "10 - 20",
            "totalAccidents": 4,
            "severityIndex": 2.0,
            "dominantCause": "rain",
            "causeCounts": null
        }))
        .unwrap();
        assert!(record.cause_counts.is_empty());

        let record: SegmentRecord =
            serde_json::from_value(serde_json::json!({ "bucketLabel": "20 - 30" })).unwrap();
        assert!(record.cause_counts.is_empty());
        assert_eq!(record.total_accidents, 0);
    }

    #[test]
    fn cause_counts_from_json_value_keep_order() {
        let value = serde_json::json!({ "speeding": 9, "rain": 3.0, "alcohol": "x", "fog": 1 });
        let counts = CauseCounts::from_json(&value);
        let names: Vec<&str> = counts.iter().map(|(c, _)| c).collect();
        assert_eq!(names, vec!["speeding", "rain", "fog"]);

        assert!(CauseCounts::from_json(&serde_json::json!(["x"])).is_empty());
        assert!(CauseCounts::from_json(&serde_json::Value::Null).is_empty());
    }

    #[test]
    fn cause_counts_list_reads_as_empty() {
        let counts: CauseCounts = serde_json::from_str(r#"["x", 1]"#).unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn non_integer_counts_are_skipped() {
        let counts: CauseCounts =
            serde_json::from_str(r#"{"a": 2.0, "b": "x", "c": -1, "d": 1.5}"#).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("a"), Some(2));
    }

    #[test]
    fn aggregated_row_serializes_flat() {
        let row = AggregatedRow {
            bucket_label: "0 - 10".to_string(),
            total: 12,
            severity_index: 1.8,
            dominant_cause: "speeding".to_string(),
            causes: vec![("speeding".to_string(), 9), ("rain".to_string(), 0)],
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["bucketLabel"], "0 - 10");
        assert_eq!(json["speeding"], 9);
        assert_eq!(json["rain"], 0);
        assert_eq!(row.cause("overtaking"), 0);
    }

    #[test]
    fn forecast_point_reads_predicao() {
        let point: RawPoint =
            serde_json::from_value(serde_json::json!({ "date": "2026-01-01", "predicao": 31.5 }))
                .unwrap();
        assert!((point.value - 31.5).abs() < f64::EPSILON);
    }

    #[test]
    fn provenance_strings() {
        assert_eq!(Provenance::Historical.to_string(), "historical");
        assert_eq!("forecast".parse::<Provenance>().unwrap(), Provenance::Forecast);
    }
}
