//! KM segment aggregation.
//!
//! Reshapes a batch of [`SegmentRecord`]s into stacked-series rows with one
//! column per cause seen anywhere in the batch, and picks the single most
//! critical bucket. This is the only place cause columns are derived.

use roadwatch_analytics_models::{
    AggregatedRow, CriticalSegmentInsight, SegmentAnalysis, SegmentRecord,
};

/// Union of cause names across `records`, in order of first appearance.
#[must_use]
pub fn cause_columns(records: &[SegmentRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for (cause, _) in record.cause_counts.iter() {
            if !columns.iter().any(|c| c == cause) {
                columns.push(cause.to_string());
            }
        }
    }
    columns
}

/// Aggregates one batch of segment records.
///
/// Emits exactly one row per record, in input order. The insight is the
/// record with the strictly greatest severity index; on ties the first one
/// encountered wins. An empty batch yields no rows and no insight.
#[must_use]
pub fn aggregate(records: &[SegmentRecord]) -> SegmentAnalysis {
    if records.is_empty() {
        return SegmentAnalysis::default();
    }

    let causes = cause_columns(records);
    let mut rows = Vec::with_capacity(records.len());
    let mut insight: Option<CriticalSegmentInsight> = None;

    for record in records {
        rows.push(AggregatedRow {
            bucket_label: record.bucket_label.clone(),
            total: record.total_accidents,
            severity_index: record.severity_index,
            dominant_cause: record.dominant_cause.clone(),
            causes: causes
                .iter()
                .map(|cause| (cause.clone(), record.cause_counts.get(cause).unwrap_or(0)))
                .collect(),
        });

        // NaN never beats a real score but is displaced by one.
        let is_new_max = insight.as_ref().is_none_or(|best| {
            record.severity_index > best.severity_index
                || (best.severity_index.is_nan() && !record.severity_index.is_nan())
        });

        if is_new_max {
            insight = Some(CriticalSegmentInsight {
                bucket_label: record.bucket_label.clone(),
                dominant_cause: record.dominant_cause.clone(),
                severity_index: record.severity_index,
            });
        }
    }

    log::debug!(
        "Aggregated {} segment(s) into {} cause column(s)",
        rows.len(),
        causes.len()
    );

    SegmentAnalysis {
        causes,
        rows,
        insight,
    }
}
