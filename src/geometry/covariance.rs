// file: src/geometry/covariance.rs
// description: covariance estimators (population, normalized, shrinkage, correlation)
// reference: Ledoit & Wolf (2004), Chen et al. (2010) oracle approximating shrinkage

use super::basics::{Standardization, standardized};
use super::{Matrix, RowVector};
use crate::error::{GeometryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    /// Population covariance.
    Cov,
    /// Normalized spatial covariance matrix.
    Scm,
    /// Ledoit and Wolf shrinkage.
    #[default]
    Lwf,
    /// Oracle approximating shrinkage.
    Oas,
    /// Minimum covariance determinant (not available).
    Mcd,
    /// Pearson correlation.
    Cor,
    Identity,
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Estimator::Cov => "Covariance",
            Estimator::Scm => "Normalized Spatial Covariance Matrix (SCM)",
            Estimator::Lwf => "Ledoit and Wolf",
            Estimator::Oas => "Oracle Approximating Shrinkage (OAS)",
            Estimator::Mcd => "Minimum Covariance Determinant (MCD)",
            Estimator::Cor => "Pearson Correlation",
            Estimator::Identity => "Identity",
        };
        f.write_str(name)
    }
}

impl FromStr for Estimator {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cov" | "covariance" => Ok(Estimator::Cov),
            "scm" => Ok(Estimator::Scm),
            "lwf" | "ledoit-wolf" | "ledoit_wolf" => Ok(Estimator::Lwf),
            "oas" => Ok(Estimator::Oas),
            "mcd" => Ok(Estimator::Mcd),
            "cor" | "corr" | "correlation" => Ok(Estimator::Cor),
            "ide" | "identity" => Ok(Estimator::Identity),
            _ => Err(GeometryError::UnsupportedEstimator(s.to_string())),
        }
    }
}

/// Estimator choice together with the preprocessing applied to raw signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CovarianceSettings {
    pub estimator: Estimator,
    pub standardization: Standardization,
    pub shrinkage: f64,
}

impl Default for CovarianceSettings {
    fn default() -> Self {
        Self {
            estimator: Estimator::Lwf,
            standardization: Standardization::Center,
            shrinkage: 0.0,
        }
    }
}

impl CovarianceSettings {
    pub fn estimate(&self, samples: &Matrix) -> Result<Matrix> {
        let mut cov = covariance_matrix(samples, self.estimator, self.standardization)?;
        if self.shrinkage > 0.0 {
            shrunk_covariance(&mut cov, self.shrinkage)?;
        }
        Ok(cov)
    }
}

pub fn variance(x: &RowVector) -> f64 {
    let s = x.len();
    if s == 0 {
        return 0.0;
    }
    let mu = x.mean();
    x.component_mul(x).sum() / s as f64 - mu * mu
}

pub fn covariance(x: &RowVector, y: &RowVector) -> f64 {
    let s = x.len();
    if s == 0 || s != y.len() {
        return 0.0;
    }
    (x.component_mul(y).sum() - x.sum() * y.sum() / s as f64) / s as f64
}

/// `(1 - s) C + s tr(C)/N I`, with `s` in [0, 1].
pub fn shrunk_covariance(cov: &mut Matrix, shrinkage: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&shrinkage) {
        return Err(GeometryError::OutOfRange(format!(
            "shrinkage {} not in [0, 1]",
            shrinkage
        )));
    }
    let n = cov.nrows();
    if n == 0 {
        return Ok(());
    }
    let coef = shrinkage * cov.trace() / n as f64;
    *cov *= 1.0 - shrinkage;
    for i in 0..n {
        cov[(i, i)] += coef;
    }
    Ok(())
}

/// Covariance of `samples` (features by rows, samples by columns) after standardization.
pub fn covariance_matrix(
    samples: &Matrix,
    estimator: Estimator,
    standard: Standardization,
) -> Result<Matrix> {
    if samples.is_empty() {
        return Err(GeometryError::empty("covariance matrix samples"));
    }
    let sample = standardized(samples, standard);
    match estimator {
        Estimator::Cov => Ok(covariance_cov(&sample)),
        Estimator::Scm => covariance_scm(&sample),
        Estimator::Lwf => covariance_lwf(&sample),
        Estimator::Oas => covariance_oas(&sample),
        Estimator::Cor => covariance_cor(&sample),
        Estimator::Identity => Ok(Matrix::identity(sample.nrows(), sample.nrows())),
        Estimator::Mcd => Err(GeometryError::UnsupportedEstimator(estimator.to_string())),
    }
}

pub fn covariance_cov(samples: &Matrix) -> Matrix {
    let n = samples.nrows();
    let rows: Vec<RowVector> = samples.row_iter().map(|r| r.into_owned()).collect();
    let mut cov = Matrix::zeros(n, n);
    for i in 0..n {
        cov[(i, i)] = variance(&rows[i]);
        for j in i + 1..n {
            let c = covariance(&rows[i], &rows[j]);
            cov[(i, j)] = c;
            cov[(j, i)] = c;
        }
    }
    cov
}

fn covariance_scm(samples: &Matrix) -> Result<Matrix> {
    let cov = samples * samples.transpose();
    let trace = cov.trace();
    if trace == 0.0 {
        return Err(GeometryError::Singular("SCM of all-zero samples".to_string()));
    }
    Ok(cov / trace)
}

fn covariance_lwf(samples: &Matrix) -> Result<Matrix> {
    let (n, s) = samples.shape();
    let mut cov = covariance_cov(samples);

    let mu = cov.trace() / n as f64;
    let mut delta_m = cov.clone();
    for i in 0..n {
        delta_m[(i, i)] -= mu;
    }
    let x2 = samples.component_mul(samples);
    let cov2 = cov.component_mul(&cov);

    let delta = delta_m.component_mul(&delta_m).sum() / n as f64;
    let beta = 1.0 / (n * s) as f64 * (&x2 * x2.transpose() / s as f64 - cov2).sum();
    let shrinkage = if delta == 0.0 {
        0.0
    } else {
        beta.min(delta).max(0.0) / delta
    };

    shrunk_covariance(&mut cov, shrinkage)?;
    Ok(cov)
}

fn covariance_oas(samples: &Matrix) -> Result<Matrix> {
    let (n, s) = samples.shape();
    let mut cov = covariance_cov(samples);

    let mu = cov.trace() / n as f64;
    let mu2 = mu * mu;
    let alpha = cov.component_mul(&cov).mean();
    let num = alpha + mu2;
    let den = (s + 1) as f64 * (alpha - mu2 / n as f64);
    let shrinkage = if den == 0.0 {
        1.0
    } else {
        (num / den).clamp(0.0, 1.0)
    };

    shrunk_covariance(&mut cov, shrinkage)?;
    Ok(cov)
}

fn covariance_cor(samples: &Matrix) -> Result<Matrix> {
    let cov = covariance_cov(samples);
    let d: Vec<f64> = cov.diagonal().iter().map(|v| v.sqrt()).collect();
    if d.iter().any(|v| *v == 0.0) {
        return Err(GeometryError::InvalidInput(
            "correlation of a constant feature".to_string(),
        ));
    }
    Ok(Matrix::from_fn(cov.nrows(), cov.ncols(), |i, j| {
        cov[(i, j)] / (d[i] * d[j])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::random_signal;

    #[test]
    fn test_variance_and_covariance() {
        let x = RowVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let y = RowVector::from_vec(vec![2.0, 4.0, 6.0, 8.0]);
        assert!((variance(&x) - 1.25).abs() < 1e-12);
        assert!((covariance(&x, &y) - 2.5).abs() < 1e-12);
        assert_eq!(covariance(&x, &RowVector::from_vec(vec![1.0])), 0.0);
        assert_eq!(variance(&RowVector::zeros(0)), 0.0);
    }

    #[test]
    fn test_shrunk_covariance() {
        let mut cov = Matrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 4.0]);
        shrunk_covariance(&mut cov, 0.5).unwrap();
        assert_eq!(cov, Matrix::from_row_slice(2, 2, &[2.5, 0.5, 0.5, 3.5]));
        assert!(shrunk_covariance(&mut cov, 1.5).is_err());
    }

    #[test]
    fn test_cov_matches_definition() {
        let samples = Matrix::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, 2.0, 4.0, 6.0, 8.0]);
        let cov = covariance_matrix(&samples, Estimator::Cov, Standardization::None).unwrap();
        assert_eq!(cov, Matrix::from_row_slice(2, 2, &[1.25, 2.5, 2.5, 5.0]));
    }

    #[test]
    fn test_scm_has_unit_trace() {
        let samples = random_signal(3, 64, 7);
        let cov = covariance_matrix(&samples, Estimator::Scm, Standardization::Center).unwrap();
        assert!((cov.trace() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shrinkage_estimators_stay_between_cov_and_target() {
        let samples = random_signal(4, 32, 11);
        let cov = covariance_matrix(&samples, Estimator::Cov, Standardization::Center).unwrap();
        for estimator in [Estimator::Lwf, Estimator::Oas] {
            let shrunk = covariance_matrix(&samples, estimator, Standardization::Center).unwrap();
            assert!((shrunk.trace() - cov.trace()).abs() < 1e-9);
            let off_cov: f64 = (0..4).flat_map(|i| (0..4).map(move |j| (i, j)))
                .filter(|(i, j)| i != j)
                .map(|ij| cov[ij].abs())
                .sum();
            let off_shrunk: f64 = (0..4).flat_map(|i| (0..4).map(move |j| (i, j)))
                .filter(|(i, j)| i != j)
                .map(|ij| shrunk[ij].abs())
                .sum();
            assert!(off_shrunk <= off_cov + 1e-12);
        }
    }

    #[test]
    fn test_correlation_has_unit_diagonal() {
        let samples = random_signal(3, 50, 3);
        let cor = covariance_matrix(&samples, Estimator::Cor, Standardization::None).unwrap();
        for i in 0..3 {
            assert!((cor[(i, i)] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_identity_and_unsupported_estimators() {
        let samples = random_signal(3, 10, 1);
        let ide = covariance_matrix(&samples, Estimator::Identity, Standardization::None).unwrap();
        assert_eq!(ide, Matrix::identity(3, 3));
        assert!(covariance_matrix(&samples, Estimator::Mcd, Standardization::None).is_err());
        assert!(covariance_matrix(&Matrix::zeros(0, 0), Estimator::Cov, Standardization::None).is_err());
    }

    #[test]
    fn test_estimator_parsing() {
        assert_eq!("LWF".parse::<Estimator>().unwrap(), Estimator::Lwf);
        assert_eq!("ide".parse::<Estimator>().unwrap(), Estimator::Identity);
        assert!("ledoit".parse::<Estimator>().is_err());
    }

    #[test]
    fn test_shrinkage_on_degenerate_dispersion() {
        // sample covariance is exactly I: LWF has no dispersion, OAS a zero denominator
        let samples = Matrix::from_row_slice(2, 4, &[1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0]);
        assert_eq!(covariance_cov(&samples), Matrix::identity(2, 2));
        for estimator in [Estimator::Lwf, Estimator::Oas] {
            let cov = covariance_matrix(&samples, estimator, Standardization::None).unwrap();
            assert!(cov.iter().all(|v| v.is_finite()), "{:?}", estimator);
            assert!((cov - Matrix::identity(2, 2)).norm() < 1e-12, "{:?}", estimator);
        }
    }

    #[test]
    fn test_correlation_of_constant_feature() {
        let samples = Matrix::from_row_slice(2, 4, &[3.0, 3.0, 3.0, 3.0, 1.0, 2.0, 3.0, 4.0]);
        let err = covariance_matrix(&samples, Estimator::Cor, Standardization::None).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidInput(_)));
        assert!(covariance_matrix(&samples, Estimator::Cov, Standardization::None).is_ok());
    }
}
