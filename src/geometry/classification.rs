// file: src/geometry/classification.rs
// description: least squares discriminant weights and Fisher geodesic filtering
// reference: pyRiemann FGDA, sklearn LDA with lsqr solver

use super::basics::{Standardization, matrix_standard_scaler};
use super::covariance::{Estimator, covariance_matrix};
use super::linalg::inverse;
use super::{Matrix, RowVector};
use crate::error::{GeometryError, Result};

/// Linear discriminant weights (one row per class, or a single row for two classes).
pub fn lsqr(datasets: &[Vec<RowVector>]) -> Result<Matrix> {
    let features = datasets
        .first()
        .and_then(|class| class.first())
        .map(|row| row.len())
        .ok_or_else(|| GeometryError::empty("discriminant datasets"))?;
    if datasets.iter().any(|class| class.is_empty()) {
        return Err(GeometryError::empty("discriminant class"));
    }
    if let Some(row) = datasets.iter().flatten().find(|row| row.len() != features) {
        return Err(GeometryError::size_mismatch("discriminant features", (1, features), (1, row.len())));
    }

    let n_class = datasets.len();
    let total: usize = datasets.iter().map(Vec::len).sum();

    let mut means = Matrix::zeros(n_class, features);
    for (k, class) in datasets.iter().enumerate() {
        let mut sum = RowVector::zeros(features);
        for row in class {
            sum += row;
        }
        means.set_row(k, &(sum / class.len() as f64));
    }

    let mut cov = Matrix::zeros(features, features);
    for class in datasets {
        let mut data = Matrix::zeros(features, class.len());
        for (i, row) in class.iter().enumerate() {
            data.set_column(i, &row.transpose());
        }
        let scale = matrix_standard_scaler(&mut data);
        let mut class_cov = covariance_matrix(&data, Estimator::Lwf, Standardization::Center)?;
        for i in 0..features {
            for j in 0..features {
                class_cov[(i, j)] *= scale[i] * scale[j];
            }
        }
        cov += class_cov * (class.len() as f64 / total as f64);
    }

    let solution = cov
        .svd(true, true)
        .solve(&means.transpose(), 1e-12)
        .map_err(|e| GeometryError::Singular(format!("discriminant covariance: {}", e)))?;
    let weight = solution.transpose();

    if n_class == 2 {
        let diff = weight.row(1) - weight.row(0);
        return Ok(Matrix::from_row_slice(1, features, diff.as_slice()));
    }
    Ok(weight)
}

/// Filter `W^T (W W^T)^{-1} W` built on the discriminant weights.
pub fn fgda_compute(datasets: &[Vec<RowVector>]) -> Result<Matrix> {
    let w = lsqr(datasets)?;
    let wt = w.transpose();
    let gram = inverse(&(&w * &wt))?;
    Ok(wt * gram * w)
}

pub fn fgda_apply(row: &RowVector, weight: &Matrix) -> Result<RowVector> {
    if row.len() != weight.nrows() {
        return Err(GeometryError::size_mismatch(
            "filter application",
            (1, weight.nrows()),
            (1, row.len()),
        ));
    }
    Ok(row * weight)
}
