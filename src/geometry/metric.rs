// file: src/geometry/metric.rs
// description: metric enumeration shared by distances, geodesics, means and classifiers
// reference: pyRiemann metric naming

use crate::error::{GeometryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Riemann,
    Euclidean,
    LogEuclidean,
    LogDet,
    Kullback,
    /// AJD-based log-Euclidean.
    Ale,
    Harmonic,
    Wasserstein,
    Identity,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Riemann,
        Metric::Euclidean,
        Metric::LogEuclidean,
        Metric::LogDet,
        Metric::Kullback,
        Metric::Ale,
        Metric::Harmonic,
        Metric::Wasserstein,
        Metric::Identity,
    ];

    /// Metrics with a closed-form geodesic, the ones usable for online updates.
    pub fn has_geodesic(&self) -> bool {
        matches!(
            self,
            Metric::Riemann | Metric::Euclidean | Metric::LogEuclidean | Metric::Identity
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Riemann => "Riemann",
            Metric::Euclidean => "Euclidean",
            Metric::LogEuclidean => "Log Euclidean",
            Metric::LogDet => "Log Determinant",
            Metric::Kullback => "Kullback",
            Metric::Ale => "AJD-based log-Euclidean",
            Metric::Harmonic => "Harmonic",
            Metric::Wasserstein => "Wasserstein",
            Metric::Identity => "Identity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "riemann" => Ok(Metric::Riemann),
            "euclidean" | "euclidian" => Ok(Metric::Euclidean),
            "logeuclidean" | "logeuclidian" => Ok(Metric::LogEuclidean),
            "logdet" | "logdeterminant" => Ok(Metric::LogDet),
            "kullback" => Ok(Metric::Kullback),
            "ale" | "ajdbasedlogeuclidean" => Ok(Metric::Ale),
            "harmonic" => Ok(Metric::Harmonic),
            "wasserstein" => Ok(Metric::Wasserstein),
            "identity" => Ok(Metric::Identity),
            _ => Err(GeometryError::InvalidInput(format!("Unknown metric: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_through_from_str() {
        for metric in Metric::ALL {
            let parsed: Metric = metric.to_string().parse().unwrap();
            assert_eq!(parsed, metric);
        }
    }

    #[test]
    fn test_legacy_spellings() {
        assert_eq!("Euclidian".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert_eq!("Log Euclidian".parse::<Metric>().unwrap(), Metric::LogEuclidean);
        assert_eq!("log_det".parse::<Metric>().unwrap(), Metric::LogDet);
    }

    #[test]
    fn test_unknown_metric_is_rejected() {
        assert!("Manhattan".parse::<Metric>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Metric::LogEuclidean).unwrap();
        assert_eq!(json, "\"log_euclidean\"");
        let back: Metric = serde_json::from_str("\"wasserstein\"").unwrap();
        assert_eq!(back, Metric::Wasserstein);
    }
}
