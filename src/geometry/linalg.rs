// file: src/geometry/linalg.rs
// description: spectral functions of symmetric matrices (sqrt, log, exp, power)
// reference: https://docs.rs/nalgebra/latest/nalgebra/linalg/struct.SymmetricEigen.html

use super::{Matrix, RowVector};
use crate::error::{GeometryError, Result};
use nalgebra::{DVector, SymmetricEigen};

/// Eigenvalues below this are treated as numerical zero by `sqrtm`.
const NEGATIVE_TOLERANCE: f64 = 1e-10;

pub fn symmetrize(m: &Matrix) -> Matrix {
    (m + m.transpose()) * 0.5
}

fn ensure_square(m: &Matrix, context: &str) -> Result<()> {
    if m.is_empty() || m.nrows() != m.ncols() {
        return Err(GeometryError::not_square(context, m.nrows(), m.ncols()));
    }
    Ok(())
}

/// Eigen pairs of a symmetric matrix, eigenvalues ascending with eigenvectors by column.
pub fn symmetric_eigen_sorted(m: &Matrix) -> Result<(RowVector, Matrix)> {
    ensure_square(m, "symmetric eigen decomposition")?;
    let eigen = SymmetricEigen::new(symmetrize(m));
    let n = m.nrows();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let values = RowVector::from_iterator(n, order.iter().map(|&i| eigen.eigenvalues[i]));
    let mut vectors = Matrix::zeros(n, n);
    for (dst, &src) in order.iter().enumerate() {
        vectors.set_column(dst, &eigen.eigenvectors.column(src));
    }
    Ok((values, vectors))
}

fn spectral_map<F>(m: &Matrix, context: &str, f: F) -> Result<Matrix>
where
    F: Fn(f64) -> Result<f64>,
{
    ensure_square(m, context)?;
    let eigen = SymmetricEigen::new(symmetrize(m));
    let mapped: Vec<f64> = eigen
        .eigenvalues
        .iter()
        .map(|&v| f(v))
        .collect::<Result<_>>()?;
    let diag = Matrix::from_diagonal(&DVector::from_vec(mapped));
    let vectors = &eigen.eigenvectors;
    Ok(vectors * diag * vectors.transpose())
}

fn positive(context: &'static str) -> impl Fn(f64) -> Result<f64> {
    move |v| {
        if v > 0.0 {
            Ok(v)
        } else {
            Err(GeometryError::NotPositiveDefinite(format!(
                "{}: eigenvalue {}",
                context, v
            )))
        }
    }
}

pub fn sqrtm(m: &Matrix) -> Result<Matrix> {
    spectral_map(m, "matrix square root", |v| {
        if v < -NEGATIVE_TOLERANCE {
            Err(GeometryError::NotPositiveDefinite(format!(
                "matrix square root: eigenvalue {}",
                v
            )))
        } else {
            Ok(v.max(0.0).sqrt())
        }
    })
}

pub fn inv_sqrtm(m: &Matrix) -> Result<Matrix> {
    let check = positive("inverse square root");
    spectral_map(m, "inverse square root", |v| check(v).map(|v| 1.0 / v.sqrt()))
}

pub fn logm(m: &Matrix) -> Result<Matrix> {
    let check = positive("matrix logarithm");
    spectral_map(m, "matrix logarithm", |v| check(v).map(f64::ln))
}

pub fn expm(m: &Matrix) -> Result<Matrix> {
    spectral_map(m, "matrix exponential", |v| Ok(v.exp()))
}

pub fn powm(m: &Matrix, exponent: f64) -> Result<Matrix> {
    let check = positive("matrix power");
    spectral_map(m, "matrix power", |v| check(v).map(|v| v.powf(exponent)))
}

pub fn inverse(m: &Matrix) -> Result<Matrix> {
    ensure_square(m, "matrix inverse")?;
    m.clone()
        .try_inverse()
        .ok_or_else(|| GeometryError::Singular(format!("{}x{} matrix", m.nrows(), m.ncols())))
}

/// Affine transformation `R^{-1/2} M R^{-1/2}`.
pub fn affine_transformation(reference: &Matrix, m: &Matrix) -> Result<Matrix> {
    let isr = inv_sqrtm(reference)?;
    Ok(&isr * m * isr.transpose())
}
