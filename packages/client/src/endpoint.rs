//! Data service endpoints.

use strum_macros::{AsRefStr, Display, EnumString};

/// An endpoint of the data service, relative to the configured base URL.
///
/// The string form is the URL path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum Endpoint {
    /// Selectable filter values.
    #[strum(serialize = "options")]
    Options,
    /// Accident counts, severity and causes per KM bucket.
    #[strum(serialize = "distribuicao-km")]
    KmDistribution,
    /// Historical series plus model forecast.
    #[strum(serialize = "predict/lstm")]
    Forecast,
    /// Top accident causes.
    #[strum(serialize = "causas")]
    Causes,
    /// Road and municipality rankings.
    #[strum(serialize = "rankings")]
    Rankings,
    /// Monthly accident, death and injury evolution.
    #[strum(serialize = "evolucao")]
    Evolution,
    /// Distributions by weekday, phase, weather and type.
    #[strum(serialize = "distribuicoes")]
    Distributions,
    /// Critical road/municipality pairs.
    #[strum(serialize = "areas-criticas")]
    CriticalAreas,
    /// Headline indicators.
    #[strum(serialize = "kpis")]
    Kpis,
    /// CSV dataset replacement.
    #[strum(serialize = "upload")]
    Upload,
}

impl Endpoint {
    /// Endpoints whose JSON is handed to the presentation layer as-is.
    pub const PASSTHROUGH: &[Self] = &[
        Self::Causes,
        Self::Rankings,
        Self::Evolution,
        Self::Distributions,
        Self::CriticalAreas,
        Self::Kpis,
    ];

    /// URL path segment relative to the API base.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Options => "options",
            Self::KmDistribution => "distribuicao-km",
            Self::Forecast => "predict/lstm",
            Self::Causes => "causas",
            Self::Rankings => "rankings",
            Self::Evolution => "evolucao",
            Self::Distributions => "distribuicoes",
            Self::CriticalAreas => "areas-criticas",
            Self::Kpis => "kpis",
            Self::Upload => "upload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_matches_string_form() {
        for endpoint in [
            Endpoint::Options,
            Endpoint::KmDistribution,
            Endpoint::Forecast,
            Endpoint::Upload,
        ]
        .iter()
        .chain(Endpoint::PASSTHROUGH)
        {
            assert_eq!(endpoint.to_string(), endpoint.path());
            assert_eq!(endpoint.path().parse::<Endpoint>().unwrap(), *endpoint);
        }
    }
}
