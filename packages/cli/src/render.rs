//! Terminal rendering of the dashboard views.

use std::sync::Arc;

use roadwatch_analytics_models::{SegmentAnalysis, TrendSeries};
use roadwatch_client::ViewState;
use roadwatch_filter_models::{FilterDimension, FilterState, OptionCatalog, month_label};

/// Shown when the KM distribution has no buckets for the query.
pub const NO_SEGMENT_DATA: &str =
    "No KM data for this road/segment. Check that KM end is greater than KM start.";

/// Shown when the forecast has no points for the query.
pub const NO_TREND_DATA: &str = "No forecast data for the selected filters.";

/// Prints the option catalog.
pub fn catalog(catalog: &OptionCatalog) {
    if catalog.is_empty() {
        println!("No options available yet.");
        return;
    }

    for dimension in FilterDimension::SHARED {
        if *dimension == FilterDimension::Month {
            continue;
        }
        let values = catalog.values_for(*dimension);
        println!("{} ({}):", dimension.label(), values.len());
        for value in &values {
            println!("  {value}");
        }
    }
}

/// One-line summary of the active filters.
#[must_use]
pub fn filter_summary(filters: &FilterState) -> String {
    let parts: Vec<String> = filters
        .selected()
        .map(|(dimension, value)| {
            let shown = if dimension == FilterDimension::Month {
                value
                    .parse()
                    .ok()
                    .and_then(month_label)
                    .unwrap_or(value)
            } else {
                value
            };
            format!("{}={shown}", dimension.label())
        })
        .collect();

    if parts.is_empty() {
        "all data".to_string()
    } else {
        parts.join(", ")
    }
}

/// Prints the KM distribution view.
pub fn segments(state: &ViewState<Arc<SegmentAnalysis>>, json: bool) {
    let analysis = match state {
        ViewState::Ready(analysis) => analysis,
        ViewState::Empty => {
            println!("{NO_SEGMENT_DATA}");
            return;
        }
        other => {
            println!("{}", other.message().unwrap_or_default());
            return;
        }
    };

    if json {
        print_json(analysis.as_ref());
        return;
    }

    if let Some(insight) = &analysis.insight {
        println!(
            "Most critical segment: KM {} (severity {:.2}), main cause: {}",
            insight.bucket_label, insight.severity_index, insight.dominant_cause
        );
        println!();
    }

    println!("{:<14} {:>7} {:>9}  DOMINANT CAUSE", "KM", "TOTAL", "SEVERITY");
    println!("{}", "-".repeat(60));
    for row in &analysis.rows {
        println!(
            "{:<14} {:>7} {:>9.2}  {}",
            row.bucket_label, row.total, row.severity_index, row.dominant_cause
        );
        let breakdown: Vec<String> = row
            .causes
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(cause, count)| format!("{cause}: {count}"))
            .collect();
        if !breakdown.is_empty() {
            println!("{:<14} {}", "", breakdown.join(", "));
        }
    }
}

/// Prints the forecast view.
pub fn trend(state: &ViewState<Arc<TrendSeries>>, json: bool) {
    let series = match state {
        ViewState::Ready(series) => series,
        ViewState::Empty => {
            println!("{NO_TREND_DATA}");
            return;
        }
        other => {
            println!("{}", other.message().unwrap_or_default());
            return;
        }
    };

    if json {
        print_json(series.as_ref());
        return;
    }

    if let Some(metrics) = &series.metrics {
        if let Some(mae) = metrics.mae {
            println!("Model MAE: {mae:.2}");
        }
        if let Some(risk) = &metrics.risk_level {
            println!("Risk level: {risk}");
        }
        if let Some(road) = &metrics.active_road {
            println!("Road: BR-{road}");
        }
        println!();
    }

    println!("{:<12} {:>10}  {:<10} BAND", "DATE", "VALUE", "SOURCE");
    println!("{}", "-".repeat(50));
    for point in &series.points {
        let band = match (point.uncertainty_low, point.uncertainty_high) {
            (Some(low), Some(high)) => format!("{low:.1} .. {high:.1}"),
            _ => String::new(),
        };
        println!(
            "{:<12} {:>10.1}  {:<10} {band}",
            point.date,
            point.value,
            point.provenance.as_ref()
        );
    }

    if !series.causes.is_empty() {
        println!();
        println!("Recommended actions:");
        for line in cause_actions(&series.causes) {
            println!("  {line}");
        }
    }
}

/// One preventive action line per main forecast cause.
#[must_use]
pub fn cause_actions(causes: &[String]) -> Vec<String> {
    causes
        .iter()
        .map(|cause| format!("Action for {cause}: preventive operation toward the reduction target"))
        .collect()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to serialize output: {e}"),
    }
}
