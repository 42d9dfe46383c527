//! Victim-weighted severity score for a group of accidents.

/// Weight of a fatality.
pub const DEATH_WEIGHT: f64 = 5.0;
/// Weight of a serious injury.
pub const SERIOUS_INJURY_WEIGHT: f64 = 3.0;
/// Weight of a minor injury.
pub const MINOR_INJURY_WEIGHT: f64 = 1.0;

/// Weighted mean victim severity on a `0..=5` scale, rounded to two
/// decimals: `(5·deaths + 3·serious + minor) / victims`.
///
/// Returns `0.0` when there are no victims.
#[must_use]
pub fn severity_index(deaths: f64, serious_injuries: f64, minor_injuries: f64) -> f64 {
    let victims = deaths + serious_injuries + minor_injuries;
    if victims <= 0.0 {
        return 0.0;
    }
    let weighted = deaths.mul_add(
        DEATH_WEIGHT,
        serious_injuries.mul_add(SERIOUS_INJURY_WEIGHT, minor_injuries * MINOR_INJURY_WEIGHT),
    );
    (weighted / victims * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_victims_scores_zero() {
        assert!(severity_index(0.0, 0.0, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn all_fatal_scores_five() {
        assert!((severity_index(3.0, 0.0, 0.0) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mixed_victims_are_weighted_and_rounded() {
        // (5 + 3*2 + 4) / 7 = 2.142857...
        assert!((severity_index(1.0, 2.0, 4.0) - 2.14).abs() < 1e-9);
    }
}
