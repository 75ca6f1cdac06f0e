// file: src/geometry/distance.rs
// description: distances between symmetric positive definite matrices
// reference: pyRiemann distance module

use super::linalg::{affine_transformation, inverse, logm, sqrtm};
use super::{Matrix, Metric};
use crate::error::{GeometryError, Result};
use nalgebra::SymmetricEigen;

pub fn distance(a: &Matrix, b: &Matrix, metric: Metric) -> Result<f64> {
    if a.is_empty() || a.shape() != b.shape() {
        return Err(GeometryError::size_mismatch("distance", a.shape(), b.shape()));
    }
    match metric {
        Metric::Riemann => distance_riemann(a, b),
        Metric::Euclidean => Ok(distance_euclidean(a, b)),
        Metric::LogEuclidean => distance_log_euclidean(a, b),
        Metric::LogDet => distance_log_det(a, b),
        Metric::Kullback => distance_kullback_sym(a, b),
        Metric::Wasserstein => distance_wasserstein(a, b),
        Metric::Identity => Ok(1.0),
        Metric::Ale | Metric::Harmonic => Err(GeometryError::unsupported(metric, "distance")),
    }
}

/// `sqrt(sum(ln^2 lambda_i))` over the generalized eigenvalues of `(a, b)`.
pub fn distance_riemann(a: &Matrix, b: &Matrix) -> Result<f64> {
    let whitened = affine_transformation(b, a)?;
    let eigen = SymmetricEigen::new((&whitened + whitened.transpose()) * 0.5);
    let mut sum = 0.0;
    for &l in eigen.eigenvalues.iter() {
        if l <= 0.0 {
            return Err(GeometryError::NotPositiveDefinite(format!(
                "generalized eigenvalue {} in Riemann distance",
                l
            )));
        }
        sum += l.ln().powi(2);
    }
    Ok(sum.sqrt())
}

pub fn distance_euclidean(a: &Matrix, b: &Matrix) -> f64 {
    (b - a).norm()
}

pub fn distance_log_euclidean(a: &Matrix, b: &Matrix) -> Result<f64> {
    Ok(distance_euclidean(&logm(a)?, &logm(b)?))
}

fn positive_determinant(m: &Matrix, context: &str) -> Result<f64> {
    if !m.is_square() {
        return Err(GeometryError::not_square(context, m.nrows(), m.ncols()));
    }
    let det = m.determinant();
    if det <= 0.0 {
        return Err(GeometryError::NotPositiveDefinite(format!(
            "{}: determinant {}",
            context, det
        )));
    }
    Ok(det)
}

pub fn distance_log_det(a: &Matrix, b: &Matrix) -> Result<f64> {
    let mid = positive_determinant(&((a + b) * 0.5), "log-det distance")?;
    let da = positive_determinant(a, "log-det distance")?;
    let db = positive_determinant(b, "log-det distance")?;
    Ok((mid.ln() - 0.5 * (da * db).ln()).max(0.0).sqrt())
}

/// One-sided Kullback-Leibler divergence between zero mean Gaussians.
pub fn distance_kullback(a: &Matrix, b: &Matrix) -> Result<f64> {
    let da = positive_determinant(a, "Kullback distance")?;
    let db = positive_determinant(b, "Kullback distance")?;
    let n = a.nrows() as f64;
    Ok(0.5 * ((inverse(b)? * a).trace() - n + (db / da).ln()))
}

pub fn distance_kullback_sym(a: &Matrix, b: &Matrix) -> Result<f64> {
    Ok(distance_kullback(a, b)? + distance_kullback(b, a)?)
}

pub fn distance_wasserstein(a: &Matrix, b: &Matrix) -> Result<f64> {
    let sb = sqrtm(b)?;
    let cross = sqrtm(&(&sb * a * &sb))?;
    Ok((a + b - cross * 2.0).trace().max(0.0).sqrt())
}
