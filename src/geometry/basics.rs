// file: src/geometry/basics.rs
// description: row standardization, index helpers and approximate matrix comparison
// reference: numpy arange and Eigen isApprox semantics

use super::{Matrix, RowVector};
use crate::error::{GeometryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standardization {
    None,
    #[default]
    Center,
    StandardScale,
}

impl fmt::Display for Standardization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Standardization::None => "None",
            Standardization::Center => "Center",
            Standardization::StandardScale => "Standard Scale",
        };
        f.write_str(name)
    }
}

fn row_mean(m: &Matrix, row: usize) -> f64 {
    if m.ncols() == 0 {
        return 0.0;
    }
    m.row(row).sum() / m.ncols() as f64
}

/// Removes the mean of each row.
pub fn matrix_center(m: &mut Matrix) {
    for i in 0..m.nrows() {
        let mu = row_mean(m, i);
        m.row_mut(i).add_scalar_mut(-mu);
    }
}

/// Scales each row to zero mean and unit population variance, returning the per-row scale.
/// Constant rows keep a scale of 1.
pub fn matrix_standard_scaler(m: &mut Matrix) -> RowVector {
    let (rows, cols) = m.shape();
    let mut scale = RowVector::from_element(rows, 1.0);
    if cols == 0 {
        return scale;
    }

    for i in 0..rows {
        let mu = row_mean(m, i);
        let sigma = m.row(i).iter().map(|v| v * v).sum::<f64>() / cols as f64 - mu * mu;
        scale[i] = if sigma <= 0.0 { 1.0 } else { sigma.sqrt() };
        let s = scale[i];
        m.row_mut(i).apply(|v| *v = (*v - mu) / s);
    }
    scale
}

pub fn matrix_standardization(m: &mut Matrix, standard: Standardization) {
    match standard {
        Standardization::None => {}
        Standardization::Center => matrix_center(m),
        Standardization::StandardScale => {
            matrix_standard_scaler(m);
        }
    }
}

pub fn standardized(m: &Matrix, standard: Standardization) -> Matrix {
    let mut out = m.clone();
    matrix_standardization(&mut out, standard);
    out
}

/// Picks `row[index[k]]` for every `k`.
pub fn get_elements(row: &RowVector, index: &[usize]) -> Result<RowVector> {
    let values = index
        .iter()
        .map(|&i| {
            row.get(i).copied().ok_or_else(|| {
                GeometryError::OutOfRange(format!("index {} for vector of length {}", i, row.len()))
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(RowVector::from_vec(values))
}

/// Half-open range `[start, stop)` by `step`. A non-positive step yields an empty range.
pub fn arange<T>(start: T, stop: T, step: T) -> Vec<T>
where
    T: Copy + PartialOrd + AddAssign + Default,
{
    let mut result = Vec::new();
    if step <= T::default() {
        return result;
    }
    let mut i = start;
    while i < stop {
        result.push(i);
        i += step;
    }
    result
}

/// Concatenates per-class sets in class order.
pub fn flatten_classes(classes: &[Vec<Matrix>]) -> Vec<Matrix> {
    classes.iter().flatten().cloned().collect()
}

/// Approximate equality: `||a - b|| <= precision * min(||a||, ||b||)`.
pub fn are_equals(a: &Matrix, b: &Matrix, precision: f64) -> bool {
    if a.shape() != b.shape() {
        return false;
    }
    if a.is_empty() {
        return true;
    }
    (a - b).norm() <= precision * a.norm().min(b.norm())
}

pub fn matrix_print(m: &Matrix) -> String {
    m.row_iter()
        .map(|row| {
            row.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_center_removes_row_means() {
        let mut m = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
        matrix_center(&mut m);
        assert_eq!(m, Matrix::from_row_slice(2, 3, &[-1.0, 0.0, 1.0, -10.0, 0.0, 10.0]));
    }

    #[test]
    fn test_standard_scaler_unit_variance() {
        let mut m = Matrix::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0]);
        let scale = matrix_standard_scaler(&mut m);

        let row = m.row(0);
        let var = row.iter().map(|v| v * v).sum::<f64>() / 4.0;
        assert!((var - 1.0).abs() < 1e-12);
        assert!((scale[0] - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(scale[1], 1.0);
        assert!(m.row(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_standardization_dispatch() {
        let m = Matrix::from_row_slice(1, 4, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(standardized(&m, Standardization::None), m);
        let scaled = standardized(&m, Standardization::StandardScale);
        assert!((scaled[(0, 3)] - 1.5 / 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_get_elements() {
        let row = RowVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let picked = get_elements(&row, &[3, 0]).unwrap();
        assert_eq!(picked.as_slice(), &[4.0, 1.0]);
        assert!(get_elements(&row, &[9]).is_err());
    }

    #[test]
    fn test_arange() {
        assert_eq!(arange(0, 5, 2), vec![0, 2, 4]);
        assert_eq!(arange(1.0, 2.0, 0.5), vec![1.0, 1.5]);
        assert!(arange(3, 1, 1).is_empty());
        assert!(arange(0, 3, 0).is_empty());
    }

    #[test]
    fn test_are_equals() {
        let a = Matrix::identity(2, 2);
        let b = &a * (1.0 + 1e-9);
        assert!(are_equals(&a, &b, 1e-6));
        assert!(!are_equals(&a, &(&a * 2.0), 1e-6));
        assert!(!are_equals(&a, &Matrix::identity(3, 3), 1e-6));
        assert!(are_equals(&Matrix::zeros(0, 0), &Matrix::zeros(0, 0), 1e-6));
    }

    #[test]
    fn test_matrix_print() {
        let m = Matrix::from_row_slice(2, 2, &[1.0, 2.5, -3.0, 4.0]);
        assert_eq!(matrix_print(&m), "1 2.5\n-3 4");
    }
}
