// file: src/geometry/median.rs
// description: scalar and matrix medians (Weiszfeld and tangent space)
// reference: Weiszfeld (1937) geometric median

use super::basics::are_equals;
use super::featurization::{tangent_space, untangent_space};
use super::mean::mean_euclidean;
use super::{Convergence, Matrix, Metric, RowVector};
use crate::error::{GeometryError, Result};
use tracing::debug;

/// Middle value, or the mean of the two middle values for an even count.
pub fn median_scalar(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(GeometryError::empty("median"));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 0 {
        Ok((sorted[n / 2 - 1] + sorted[n / 2]) * 0.5)
    } else {
        Ok(sorted[n / 2])
    }
}

pub fn median_of_entries(m: &Matrix) -> Result<f64> {
    median_scalar(m.as_slice())
}

pub fn median(matrices: &[Matrix], metric: Metric) -> Result<Matrix> {
    median_with(matrices, metric, &Convergence::default())
}

pub fn median_with(matrices: &[Matrix], metric: Metric, convergence: &Convergence) -> Result<Matrix> {
    let first = matrices.first().ok_or_else(|| GeometryError::empty("median"))?;
    if matrices.len() == 1 {
        return Ok(first.clone());
    }
    if let Some(other) = matrices.iter().find(|m| m.shape() != first.shape()) {
        return Err(GeometryError::size_mismatch("median", first.shape(), other.shape()));
    }
    if first.is_empty() {
        return Err(GeometryError::empty("median matrices"));
    }

    match metric {
        Metric::Riemann => {
            if !first.is_square() {
                return Err(GeometryError::not_square("Riemann median", first.nrows(), first.ncols()));
            }
            median_riemann(matrices, convergence)
        }
        Metric::Euclidean => median_euclidean(matrices, convergence),
        Metric::Identity => Ok(Matrix::identity(first.nrows(), first.ncols())),
        _ => Err(GeometryError::unsupported(metric, "median")),
    }
}

fn median_euclidean(matrices: &[Matrix], convergence: &Convergence) -> Result<Matrix> {
    let (r, c) = matrices[0].shape();
    let mut median = Matrix::zeros(r, c);
    let mut column = Vec::with_capacity(matrices.len());
    for idx in 0..r * c {
        column.clear();
        column.extend(matrices.iter().map(|m| m[idx]));
        median[idx] = median_scalar(&column)?;
    }

    let mut iter = 0;
    let mut gain = convergence.epsilon;
    while iter < convergence.max_iterations && gain >= convergence.epsilon {
        let prev = median.clone();
        let mut weighted = Matrix::zeros(r, c);
        let mut direction = Matrix::zeros(r, c);
        let mut sum_coefs = 0.0;
        let mut coincident = 0usize;
        for m in matrices {
            if are_equals(m, &prev, 1e-12) {
                coincident += 1;
                continue;
            }
            let coef = 1.0 / (m - &prev).norm();
            sum_coefs += coef;
            weighted += m * coef;
            direction += (m - &prev) * coef;
        }

        median = if sum_coefs == 0.0 {
            prev.clone()
        } else if coincident == 0 {
            weighted / sum_coefs
        } else {
            // Vardi-Zhang step when the estimate sits on data points
            let pull = direction.norm();
            let ratio = if pull > 0.0 {
                (coincident as f64 / pull).min(1.0)
            } else {
                1.0
            };
            weighted / sum_coefs * (1.0 - ratio) + &prev * ratio
        };

        let norm = median.norm();
        gain = if norm > 0.0 { (&median - &prev).norm() / norm } else { 0.0 };
        iter += 1;
    }
    debug!("Euclidean median stopped after {} iterations (gain {:.3e})", iter, gain);
    Ok(median)
}

fn median_riemann(matrices: &[Matrix], convergence: &Convergence) -> Result<Matrix> {
    let n = matrices[0].nrows();
    let nf = n * (n + 1) / 2;
    let mut median = mean_euclidean(matrices);
    let mut gain = convergence.epsilon;
    let mut iter = 0;

    while iter < convergence.max_iterations {
        let ts = matrices
            .iter()
            .map(|m| tangent_space(m, Some(&median)))
            .collect::<Result<Vec<RowVector>>>()?;
        let sum: f64 = ts.iter().map(|t| t.norm()).sum();
        if ((sum - gain) / gain).abs() < convergence.epsilon {
            break;
        }

        let mut feature = Vec::with_capacity(ts.len());
        let mut feature_median = RowVector::zeros(nf);
        for j in 0..nf {
            feature.clear();
            feature.extend(ts.iter().map(|t| t[j]));
            feature_median[j] = median_scalar(&feature)?;
        }

        median = untangent_space(&feature_median, Some(&median))?;
        gain = sum;
        iter += 1;
    }
    debug!("Riemann median stopped after {} iterations", iter);
    Ok(median)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{diag, random_spd};

    #[test]
    fn test_scalar_median() {
        assert_eq!(median_scalar(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_eq!(median_scalar(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
        assert!(median_scalar(&[]).is_err());
        let m = Matrix::from_row_slice(2, 2, &[5.0, 1.0, 3.0, 9.0]);
        assert_eq!(median_of_entries(&m).unwrap(), 4.0);
    }

    #[test]
    fn test_euclidean_median_ignores_outlier() {
        let mut set = vec![diag(&[1.0, 1.0]); 4];
        set.push(diag(&[100.0, 100.0]));
        let m = median(&set, Metric::Euclidean).unwrap();
        assert!(are_equals(&m, &diag(&[1.0, 1.0]), 1e-6));
    }

    #[test]
    fn test_riemann_median_of_symmetric_set() {
        let set = vec![diag(&[1.0, 1.0]), diag(&[2.0, 2.0]), diag(&[4.0, 4.0])];
        let m = median(&set, Metric::Riemann).unwrap();
        assert!(are_equals(&m, &diag(&[2.0, 2.0]), 1e-6));
    }

    #[test]
    fn test_single_matrix_and_identity() {
        let a = random_spd(3, 1);
        assert_eq!(median(std::slice::from_ref(&a), Metric::Riemann).unwrap(), a);
        let set = vec![a.clone(), random_spd(3, 2)];
        assert_eq!(median(&set, Metric::Identity).unwrap(), Matrix::identity(3, 3));
    }

    #[test]
    fn test_unsupported_and_invalid() {
        let set = vec![random_spd(2, 1), random_spd(2, 2)];
        assert!(median(&set, Metric::Wasserstein).is_err());
        assert!(median(&[], Metric::Euclidean).is_err());
        let rect = vec![Matrix::zeros(2, 3), Matrix::zeros(2, 3)];
        assert!(median(&rect, Metric::Riemann).is_err());
    }

    #[test]
    fn test_riemann_median_stops_once_the_spread_settles() {
        let set = vec![diag(&[1.0, 1.0]), diag(&[2.0, 2.0]), diag(&[4.0, 4.0])];
        let at = |max_iterations| {
            let convergence = Convergence { epsilon: 1e-4, max_iterations };
            median_with(&set, Metric::Riemann, &convergence).unwrap()
        };
        assert!(are_equals(&at(0), &mean_euclidean(&set), 1e-12));
        // one tangent space step from the Euclidean mean already lands on the median
        assert!(are_equals(&at(1), &diag(&[2.0, 2.0]), 1e-9));
        // the stopping rule fires long before either budget runs out
        assert_eq!(at(10), at(1000));
    }
}
