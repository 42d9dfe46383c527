//! Historical + forecast trend merging.
//!
//! The service returns the observed series and the model forecast as two
//! contiguous, already-sorted ranges. Merging tags each point with its
//! provenance, applies the "what-if" reduction lever to forecast values
//! only, and optionally attaches an uncertainty band to forecast points.

use roadwatch_analytics_models::{MergeOptions, Provenance, RawPoint, TimePoint};

/// Converts a reduction percentage (e.g. `20` for "20% fewer accidents")
/// into a forecast multiplier. The percentage is clamped to `0..=100`.
#[must_use]
pub fn reduction_factor(percent: f64) -> f64 {
    if percent.is_nan() {
        return 1.0;
    }
    1.0 - percent.clamp(0.0, 100.0) / 100.0
}

/// Merge options for a reduction percentage and band margin.
#[must_use]
pub fn options_for_reduction(percent: f64, uncertainty_margin: f64) -> MergeOptions {
    MergeOptions::default()
        .with_reduction_factor(reduction_factor(percent))
        .with_uncertainty_margin(uncertainty_margin)
}

/// Merges the historical and forecast series.
///
/// Historical points are copied unchanged and never carry a band. Forecast
/// values are multiplied by `options.reduction_factor`; when
/// `options.uncertainty_margin` is positive each forecast point gets
/// `value ± margin`. Historical points come first, then forecast points,
/// each in source order; nothing is re-sorted.
#[must_use]
pub fn merge(historical: &[RawPoint], forecast: &[RawPoint], options: MergeOptions) -> Vec<TimePoint> {
    let margin = (options.uncertainty_margin > 0.0).then_some(options.uncertainty_margin);

    let observed = historical.iter().map(|p| TimePoint {
        date: p.date.clone(),
        value: p.value,
        provenance: Provenance::Historical,
        uncertainty_low: None,
        uncertainty_high: None,
    });

    let predicted = forecast.iter().map(|p| {
        let value = p.value * options.reduction_factor;
        TimePoint {
            date: p.date.clone(),
            value,
            provenance: Provenance::Forecast,
            uncertainty_low: margin.map(|m| value - m),
            uncertainty_high: margin.map(|m| value + m),
        }
    });

    observed.chain(predicted).collect()
}
