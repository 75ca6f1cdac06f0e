// file: src/geometry/mean.rs
// description: means of matrix sets under each metric
// reference: pyRiemann mean module, Congedo et al. (2017) for the ALE and LogDet fixed points

use super::distance::distance_riemann;
use super::geodesic::geodesic_riemann;
use super::linalg::{expm, inverse, inv_sqrtm, logm, sqrtm, symmetrize};
use super::{Convergence, Matrix, Metric};
use crate::error::{GeometryError, Result};
use nalgebra::DVector;
use tracing::{debug, warn};

pub fn mean(covs: &[Matrix], metric: Metric) -> Result<Matrix> {
    mean_with(covs, metric, &Convergence::default())
}

pub fn mean_with(covs: &[Matrix], metric: Metric, convergence: &Convergence) -> Result<Matrix> {
    let first = covs.first().ok_or_else(|| GeometryError::empty("mean"))?;
    if covs.len() == 1 {
        return Ok(first.clone());
    }
    if let Some(other) = covs.iter().find(|c| c.shape() != first.shape()) {
        return Err(GeometryError::size_mismatch("mean", first.shape(), other.shape()));
    }
    if !first.is_square() && !matches!(metric, Metric::Euclidean | Metric::Identity) {
        return Err(GeometryError::not_square(
            &format!("{} mean", metric),
            first.nrows(),
            first.ncols(),
        ));
    }

    match metric {
        Metric::Riemann => mean_riemann(covs, convergence),
        Metric::Euclidean => Ok(mean_euclidean(covs)),
        Metric::LogEuclidean => mean_log_euclidean(covs),
        Metric::LogDet => mean_log_det(covs, convergence),
        Metric::Kullback => mean_kullback(covs),
        Metric::Ale => mean_ale(covs, convergence),
        Metric::Harmonic => mean_harmonic(covs),
        Metric::Wasserstein => mean_wasserstein(covs, convergence),
        Metric::Identity => Ok(Matrix::identity(first.nrows(), first.ncols())),
    }
}

fn average<I>(shape: (usize, usize), count: usize, terms: I) -> Result<Matrix>
where
    I: Iterator<Item = Result<Matrix>>,
{
    let mut sum = Matrix::zeros(shape.0, shape.1);
    for term in terms {
        sum += term?;
    }
    Ok(sum / count as f64)
}

fn report(metric: Metric, iterations: usize, converged: bool, crit: f64) {
    if converged {
        debug!("{} mean converged after {} iterations (criterion {:.3e})", metric, iterations, crit);
    } else {
        warn!(
            "{} mean reached {} iterations without converging (criterion {:.3e})",
            metric, iterations, crit
        );
    }
}

pub fn mean_euclidean(covs: &[Matrix]) -> Matrix {
    let (r, c) = covs[0].shape();
    let mut sum = Matrix::zeros(r, c);
    for cov in covs {
        sum += cov;
    }
    sum / covs.len() as f64
}

fn mean_riemann(covs: &[Matrix], convergence: &Convergence) -> Result<Matrix> {
    let shape = covs[0].shape();
    let eps = convergence.epsilon;
    let mut mean = mean_euclidean(covs);
    let mut nu = 1.0;
    let mut tau = f64::MAX;
    let mut crit = f64::MAX;
    let mut i = 0;

    while i < convergence.max_iterations && eps < crit && eps < nu {
        i += 1;
        let sc = sqrtm(&mean)?;
        let isc = inv_sqrtm(&mean)?;
        let j = average(
            shape,
            covs.len(),
            covs.iter().map(|c| logm(&symmetrize(&(&isc * c * &isc)))),
        )?;
        crit = j.norm();
        mean = symmetrize(&(&sc * expm(&(&j * nu))? * &sc));

        let h = nu * crit;
        if h < tau {
            nu *= 0.95;
            tau = h;
        } else {
            nu *= 0.5;
        }
    }
    report(Metric::Riemann, i, crit <= eps || nu <= eps, crit);
    Ok(mean)
}

fn mean_log_euclidean(covs: &[Matrix]) -> Result<Matrix> {
    let j = average(covs[0].shape(), covs.len(), covs.iter().map(logm))?;
    expm(&j)
}

fn mean_log_det(covs: &[Matrix], convergence: &Convergence) -> Result<Matrix> {
    let shape = covs[0].shape();
    let mut mean = mean_euclidean(covs);
    let mut crit = f64::MAX;
    let mut i = 0;

    while i < convergence.max_iterations && convergence.epsilon < crit {
        i += 1;
        let j = average(
            shape,
            covs.len(),
            covs.iter().map(|c| inverse(&((c + &mean) * 0.5))),
        )?;
        let next = inverse(&j)?;
        crit = (&next - &mean).norm();
        mean = next;
    }
    report(Metric::LogDet, i, crit <= convergence.epsilon, crit);
    Ok(mean)
}

/// Riemannian midpoint of the Euclidean and harmonic means.
fn mean_kullback(covs: &[Matrix]) -> Result<Matrix> {
    let euclidean = mean_euclidean(covs);
    let harmonic = mean_harmonic(covs)?;
    geodesic_riemann(&euclidean, &harmonic, 0.5)
}

fn mean_wasserstein(covs: &[Matrix], convergence: &Convergence) -> Result<Matrix> {
    let shape = covs[0].shape();
    let mut sc = sqrtm(&mean_euclidean(covs))?;
    let mut crit = f64::MAX;
    let mut i = 0;

    while i < convergence.max_iterations && convergence.epsilon < crit {
        i += 1;
        let j = average(
            shape,
            covs.len(),
            covs.iter().map(|c| sqrtm(&symmetrize(&(&sc * c * &sc)))),
        )?;
        let sj = sqrtm(&j)?;
        crit = (&sj - &sc).norm();
        sc = sj;
    }
    report(Metric::Wasserstein, i, crit <= convergence.epsilon, crit);
    Ok(&sc * &sc)
}

/// Joint diagonalizer used to seed the ALE mean. Starts from the identity.
fn ajd_initialization(n: usize) -> Matrix {
    Matrix::identity(n, n)
}

fn ale_change(covs: &[Matrix], m: &Matrix) -> Result<Matrix> {
    average(
        covs[0].shape(),
        covs.len(),
        covs.iter().map(|c| logm(&symmetrize(&(m.transpose() * c * m)))),
    )
}

fn mean_ale(covs: &[Matrix], convergence: &Convergence) -> Result<Matrix> {
    let n = covs[0].nrows();
    let mut mean = ajd_initialization(n);
    let mut crit = f64::MAX;
    let mut i = 0;

    while i < convergence.max_iterations && convergence.epsilon < crit {
        i += 1;
        let j = ale_change(covs, &mean)?;
        let exp_j = expm(&j)?;
        let update = Matrix::from_diagonal(&DVector::from_iterator(n, exp_j.diagonal().iter().copied()));
        mean = &mean * inv_sqrtm(&update)?;
        crit = distance_riemann(&Matrix::identity(n, n), &update)?;
    }
    report(Metric::Ale, i, crit <= convergence.epsilon, crit);

    let j = ale_change(covs, &mean)?;
    let a = inverse(&mean)?;
    Ok(symmetrize(&(a.transpose() * expm(&j)? * a)))
}

fn mean_harmonic(covs: &[Matrix]) -> Result<Matrix> {
    let j = average(covs[0].shape(), covs.len(), covs.iter().map(inverse))?;
    inverse(&j)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::are_equals;
    use crate::test_support::{capture_logs, diag, random_spd, spd_cloud};

    fn pair() -> Vec<Matrix> {
        vec![diag(&[1.0, 1.0]), diag(&[4.0, 4.0])]
    }

    #[test]
    fn test_closed_form_means_of_diagonals() {
        let expected = diag(&[2.0, 2.0]);
        for metric in [
            Metric::Riemann,
            Metric::LogEuclidean,
            Metric::LogDet,
            Metric::Kullback,
            Metric::Ale,
        ] {
            let m = mean(&pair(), metric).unwrap();
            assert!(are_equals(&m, &expected, 1e-3), "{} gave {}", metric, m);
        }
        let euclid = mean(&pair(), Metric::Euclidean).unwrap();
        assert!(are_equals(&euclid, &diag(&[2.5, 2.5]), 1e-12));
        let wasserstein = mean(&pair(), Metric::Wasserstein).unwrap();
        assert!(are_equals(&wasserstein, &diag(&[2.25, 2.25]), 1e-3));
    }

    #[test]
    fn test_harmonic_mean() {
        let covs = vec![diag(&[1.0]), diag(&[3.0])];
        let m = mean(&covs, Metric::Harmonic).unwrap();
        assert!((m[(0, 0)] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_riemann_mean_is_a_fixed_point() {
        let center = random_spd(3, 21);
        let covs = spd_cloud(&center, 8, 0.05, 3);
        let convergence = Convergence {
            epsilon: 1e-10,
            max_iterations: 200,
        };
        let m = mean_with(&covs, Metric::Riemann, &convergence).unwrap();
        let isc = inv_sqrtm(&m).unwrap();
        let mut gradient = Matrix::zeros(3, 3);
        for c in &covs {
            gradient += logm(&symmetrize(&(&isc * c * &isc))).unwrap();
        }
        assert!(gradient.norm() < 1e-6);
    }

    #[test]
    fn test_single_matrix_is_returned() {
        let m = random_spd(3, 2);
        for metric in Metric::ALL {
            assert_eq!(mean(std::slice::from_ref(&m), metric).unwrap(), m);
        }
    }

    #[test]
    fn test_identity_and_non_square() {
        let rect = vec![Matrix::from_element(2, 3, 1.0), Matrix::from_element(2, 3, 3.0)];
        assert_eq!(mean(&rect, Metric::Euclidean).unwrap(), Matrix::from_element(2, 3, 2.0));
        assert_eq!(mean(&rect, Metric::Identity).unwrap(), Matrix::identity(2, 3));
        assert!(mean(&rect, Metric::Riemann).is_err());
    }

    #[test]
    fn test_invalid_sets() {
        assert!(mean(&[], Metric::Riemann).is_err());
        let mixed = vec![Matrix::identity(2, 2), Matrix::identity(3, 3)];
        assert!(mean(&mixed, Metric::Euclidean).is_err());
    }

    #[test]
    fn test_riemann_mean_out_of_iterations() {
        let covs = spd_cloud(&diag(&[1.0, 3.0, 2.0]), 6, 0.4, 21);
        let convergence = Convergence { epsilon: 1e-12, max_iterations: 1 };
        let (estimate, logs) = capture_logs(|| mean_with(&covs, Metric::Riemann, &convergence));
        let estimate = estimate.unwrap();

        let start = mean_euclidean(&covs);
        let sc = sqrtm(&start).unwrap();
        let isc = inv_sqrtm(&start).unwrap();
        let mut j = Matrix::zeros(3, 3);
        for c in &covs {
            j += logm(&symmetrize(&(&isc * c * &isc))).unwrap();
        }
        j /= covs.len() as f64;
        let step = symmetrize(&(&sc * expm(&j).unwrap() * &sc));

        assert!(are_equals(&estimate, &step, 1e-10));
        assert!(!are_equals(&estimate, &mean(&covs, Metric::Riemann).unwrap(), 1e-10));
        assert!(logs.contains("WARN"), "{}", logs);
        assert!(logs.contains("without converging"), "{}", logs);
    }
}
