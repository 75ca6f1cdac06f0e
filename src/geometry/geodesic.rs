// file: src/geometry/geodesic.rs
// description: points along the geodesic between two matrices

use super::linalg::{expm, inv_sqrtm, logm, powm, sqrtm, symmetrize};
use super::{Matrix, Metric};
use crate::error::{GeometryError, Result};

/// Point at position `alpha` in [0, 1] on the geodesic from `a` to `b`.
pub fn geodesic(a: &Matrix, b: &Matrix, metric: Metric, alpha: f64) -> Result<Matrix> {
    if a.is_empty() || a.shape() != b.shape() {
        return Err(GeometryError::size_mismatch("geodesic", a.shape(), b.shape()));
    }
    if !a.is_square() {
        return Err(GeometryError::not_square("geodesic", a.nrows(), a.ncols()));
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(GeometryError::OutOfRange(format!(
            "geodesic position {} not in [0, 1]",
            alpha
        )));
    }

    match metric {
        Metric::Riemann => geodesic_riemann(a, b, alpha),
        Metric::Euclidean => Ok(a * (1.0 - alpha) + b * alpha),
        Metric::LogEuclidean => expm(&(logm(a)? * (1.0 - alpha) + logm(b)? * alpha)),
        Metric::Identity => Ok(Matrix::identity(a.nrows(), a.nrows())),
        _ => Err(GeometryError::unsupported(metric, "geodesic")),
    }
}

/// `A^{1/2} (A^{-1/2} B A^{-1/2})^alpha A^{1/2}`.
pub fn geodesic_riemann(a: &Matrix, b: &Matrix, alpha: f64) -> Result<Matrix> {
    let sa = sqrtm(a)?;
    let isa = inv_sqrtm(a)?;
    let inner = symmetrize(&(&isa * b * &isa));
    Ok(&sa * powm(&inner, alpha)? * &sa)
}
