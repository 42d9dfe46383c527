//! Response validation, one function per endpoint.
//!
//! The data service returns loosely shaped JSON. Everything that can be
//! absent, renamed or mistyped is handled here, so the analytics code only
//! ever sees well-formed records. A response is either normalized into the
//! internal types or rejected as [`ClientError::Malformed`]; within an
//! accepted response, individual bad entries are dropped and logged.

use roadwatch_analytics_models::{
    CauseCounts, ForecastMetrics, RawPoint, SegmentRecord, count_value,
};
use roadwatch_filter_models::OptionCatalog;
use serde_json::Value;

use crate::{ClientError, endpoint::Endpoint};

/// Validated forecast payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastResponse {
    /// Observed series.
    pub historical: Vec<RawPoint>,
    /// Model series.
    pub forecast: Vec<RawPoint>,
    /// Model metrics, when reported.
    pub metrics: Option<ForecastMetrics>,
    /// Main causes behind the forecast.
    pub causes: Vec<String>,
}

fn malformed(endpoint: Endpoint, message: impl Into<String>) -> ClientError {
    ClientError::Malformed {
        endpoint,
        message: message.into(),
    }
}

/// First non-null value among `keys`.
fn field<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| body.get(*k).filter(|v| !v.is_null()))
}

/// Array under one of `keys`; a missing key is an empty array.
fn optional_array<'a>(
    endpoint: Endpoint,
    body: &'a Value,
    keys: &[&str],
) -> Result<&'a [Value], ClientError> {
    match field(body, keys) {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(malformed(
            endpoint,
            format!("expected '{}' to be an array, got {other}", keys[0]),
        )),
    }
}

/// Validates a `GET options` body.
///
/// All four option lists must be present.
///
/// # Errors
///
/// Returns [`ClientError::Malformed`] if the body is not an object or any
/// list is missing or mistyped.
pub fn parse_options(body: &Value) -> Result<OptionCatalog, ClientError> {
    if !body.is_object() {
        return Err(malformed(Endpoint::Options, "expected a JSON object"));
    }
    serde_json::from_value(body.clone()).map_err(|e| malformed(Endpoint::Options, e.to_string()))
}

/// Validates a `GET distribuicao-km` body.
///
/// A missing or null segment list is an empty batch. Records without a
/// bucket label are dropped; every other field is read leniently and falls
/// back to zero, an empty string or an empty cause map.
///
/// # Errors
///
/// Returns [`ClientError::Malformed`] if the body is not an object or the
/// segment list is not an array.
pub fn parse_segments(body: &Value) -> Result<Vec<SegmentRecord>, ClientError> {
    if !body.is_object() {
        return Err(malformed(Endpoint::KmDistribution, "expected a JSON object"));
    }

    let items = optional_array(Endpoint::KmDistribution, body, &["segments", "faixas_km"])?;

    let records: Vec<SegmentRecord> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let record = segment_record(item);
            if record.is_none() {
                log::warn!("Dropping KM segment #{idx} without a bucket label: {item}");
            }
            record
        })
        .collect();

    Ok(records)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn segment_record(item: &Value) -> Option<SegmentRecord> {
    if !item.is_object() {
        return None;
    }
    let bucket_label = field(item, &["bucketLabel", "faixa_km"]).and_then(scalar_text)?;

    Some(SegmentRecord {
        bucket_label,
        total_accidents: field(item, &["totalAccidents", "total_acidentes"])
            .and_then(count_value)
            .unwrap_or(0),
        severity_index: field(item, &["severityIndex", "indice_severidade"])
            .and_then(|v| {
                v.as_f64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            })
            .filter(|f: &f64| f.is_finite())
            .unwrap_or(0.0),
        dominant_cause: field(item, &["dominantCause", "causa_predominante"])
            .and_then(scalar_text)
            .unwrap_or_default(),
        cause_counts: field(item, &["causeCounts", "causas_detalhadas"])
            .map(CauseCounts::from_json)
            .unwrap_or_default(),
    })
}

fn parse_points(endpoint: Endpoint, items: &[Value], series: &str) -> Vec<RawPoint> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<RawPoint>(item.clone()) {
            Ok(point) => Some(point),
            Err(e) => {
                log::warn!("Dropping malformed {endpoint} {series} point #{idx}: {e}");
                None
            }
        })
        .collect()
}

/// Validates a `GET predict/lstm` body.
///
/// Missing series are empty. Points without a date are dropped; a missing
/// value reads as zero. Unreadable metrics are ignored, as are main causes
/// that are not a list of names.
///
/// # Errors
///
/// Returns [`ClientError::Malformed`] if the body is not an object or a
/// series is not an array.
pub fn parse_forecast(body: &Value) -> Result<ForecastResponse, ClientError> {
    if !body.is_object() {
        return Err(malformed(Endpoint::Forecast, "expected a JSON object"));
    }

    let historical = optional_array(Endpoint::Forecast, body, &["historical", "historico"])?;
    let forecast = optional_array(Endpoint::Forecast, body, &["forecast", "previsao"])?;

    let metrics = field(body, &["metrics"])
        .filter(|m| m.is_object())
        .and_then(|m| serde_json::from_value::<ForecastMetrics>(m.clone()).ok());

    let causes = field(body, &["causas_principais", "causas", "causes"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(scalar_text).collect())
        .unwrap_or_default();

    Ok(ForecastResponse {
        historical: parse_points(Endpoint::Forecast, historical, "historical"),
        forecast: parse_points(Endpoint::Forecast, forecast, "forecast"),
        metrics,
        causes,
    })
}
