// file: src/geometry/misc.rs
// description: ranges, histograms and generalized Gaussian fitting used by artifact removal
// reference: EEGLAB clean_rawdata fit_eeg_distribution

use super::linalg::symmetric_eigen_sorted;
use super::Matrix;
use crate::error::{GeometryError, Result};
use crate::utils::validation::Validator;
use statrs::distribution::{ContinuousCDF, Gamma};
use statrs::function::gamma::gamma;

fn range_len(begin: f64, end: f64, step: f64, closed: bool) -> usize {
    let size = (end - begin) / step;
    let len = if closed && size.trunc() == size { size + 1.0 } else { size };
    len.ceil().max(0.0) as usize
}

/// Values from `begin` by `step`, up to `end` (included when `closed` and reached exactly).
pub fn double_range(begin: f64, end: f64, step: f64, closed: bool) -> Vec<f64> {
    if end < begin || step <= 0.0 {
        return Vec::new();
    }
    let mut v = begin;
    (0..range_len(begin, end, step, closed))
        .map(|_| {
            let current = v;
            v += step;
            current
        })
        .collect()
}

/// Same walk as [`double_range`] with every value rounded to an index.
pub fn round_index_range(begin: f64, end: f64, step: f64, closed: bool, unique: bool) -> Vec<usize> {
    if end < begin || step <= 0.0 {
        return Vec::new();
    }
    let mut v = begin;
    let mut res: Vec<usize> = (0..range_len(begin, end, step, closed))
        .map(|_| {
            let current = v.round().max(0.0) as usize;
            v += step;
            current
        })
        .collect();
    if unique {
        res.dedup();
    }
    res
}

/// Histogram of `data` on `n` bins spanning `[0, max]`. Negative values are ignored.
pub fn bin_hist(data: &[f64], n: usize) -> Vec<usize> {
    let mut res = vec![0; n];
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if n == 0 || data.is_empty() || max <= 0.0 {
        return res;
    }
    let coef = n as f64 / max;
    for &value in data.iter().filter(|v| **v >= 0.0) {
        let bin = (value * coef).floor() as usize;
        if bin < n {
            res[bin] += 1;
        } else if bin == n {
            res[n - 1] += 1;
        }
    }
    res
}

/// Search grid for [`fit_distribution`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitParams {
    pub betas: Vec<f64>,
    pub min_quantile: f64,
    pub max_quantile: f64,
    pub min_clean: f64,
    pub max_dropout: f64,
    pub step_bound: f64,
    pub step_scale: f64,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            betas: double_range(1.7, 3.5, 0.15, true),
            min_quantile: 0.022,
            max_quantile: 0.60,
            min_clean: 0.25,
            max_dropout: 0.10,
            step_bound: 0.01,
            step_scale: 0.01,
        }
    }
}

impl FitParams {
    pub fn validate(&self) -> Result<()> {
        if self.betas.is_empty() {
            return Err(GeometryError::Validation("no beta to fit".to_string()));
        }
        Validator::validate_in_range("min_quantile", self.min_quantile, 0.0, 1.0)?;
        Validator::validate_in_range("max_quantile", self.max_quantile, 0.0, 1.0)?;
        Validator::validate_in_range("step_bound", self.step_bound, 1e-4, 0.1)?;
        Validator::validate_in_range("step_scale", self.step_scale, 1e-4, 0.1)?;
        if self.min_clean < 0.0 || self.max_dropout < 0.0 {
            return Err(GeometryError::Validation(
                "min_clean and max_dropout must be non-negative".to_string(),
            ));
        }
        if self.max_quantile <= self.min_quantile {
            return Err(GeometryError::Validation(
                "max_quantile must exceed min_quantile".to_string(),
            ));
        }
        Ok(())
    }
}

fn gamma_p_inv(shape: f64, p: f64) -> Result<f64> {
    let dist = Gamma::new(shape, 1.0)
        .map_err(|e| GeometryError::InvalidInput(format!("gamma shape {}: {}", shape, e)))?;
    Ok(dist.inverse_cdf(p))
}

/// Robust `(mu, sigma)` of the clean part of a distribution, matched against a
/// generalized Gaussian over a grid of subsets and shape parameters.
pub fn fit_distribution(values: &[f64], params: &FitParams) -> Result<(f64, f64)> {
    if values.is_empty() {
        return Err(GeometryError::empty("distribution values"));
    }
    params.validate()?;

    let betas = &params.betas;
    let scales: Vec<f64> = betas.iter().map(|b| b / (2.0 * gamma(1.0 / b))).collect();

    let sign_min = (params.min_quantile - 0.5).signum();
    let sign_max = (params.max_quantile - 0.5).signum();
    let coef_min = sign_min * (2.0 * params.min_quantile - 1.0);
    let coef_max = sign_max * (2.0 * params.max_quantile - 1.0);
    let z_bounds = betas
        .iter()
        .map(|&b| {
            if b == 0.0 {
                return Ok((0.0, 0.0));
            }
            let inv = 1.0 / b;
            Ok((
                sign_min * gamma_p_inv(inv, coef_min)?.powf(inv),
                sign_max * gamma_p_inv(inv, coef_max)?.powf(inv),
            ))
        })
        .collect::<Result<Vec<(f64, f64)>>>()?;

    let n = values.len();
    let nf = n as f64;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let span = params.max_quantile - params.min_quantile;
    let mut widths = round_index_range(nf * span * params.min_clean, nf * span, nf * params.step_scale, true, false);
    widths.reverse();
    let bounds = round_index_range(
        nf * params.min_quantile,
        nf * (params.min_quantile + params.max_dropout),
        nf * params.step_bound,
        true,
        false,
    );
    let max_width = widths.iter().copied().max().unwrap_or(0);
    let last_bound = bounds.iter().copied().max().unwrap_or(0);
    if widths.is_empty() || bounds.is_empty() || last_bound + max_width > n {
        return Err(GeometryError::InvalidInput(format!(
            "{} values are too few for the fitting grid",
            n
        )));
    }

    let (firsts, grid): (Vec<f64>, Vec<Vec<f64>>) = bounds
        .iter()
        .map(|&b| {
            let first = sorted[b];
            (first, sorted[b..b + max_width].iter().map(|v| v - first).collect())
        })
        .unzip();

    let mut best: Option<(f64, usize, usize, usize)> = None;
    for &w in &widths {
        let nbins = (3.0 * (1.0 + w as f64 / 2.0).log2()).round() as usize;
        if w == 0 || nbins == 0 {
            continue;
        }
        let hist: Vec<Vec<f64>> = grid
            .iter()
            .map(|row| {
                bin_hist(&row[..w], nbins)
                    .into_iter()
                    .map(|e| (e as f64 + 0.01).ln())
                    .collect()
            })
            .collect();

        for (b, &(z_lo, z_hi)) in z_bounds.iter().enumerate() {
            let mut prob: Vec<f64> = (0..nbins)
                .map(|i| {
                    let z = z_lo + ((i as f64 + 0.5) / nbins as f64) * (z_hi - z_lo);
                    (-z.abs().powf(betas[b])).exp() * scales[b]
                })
                .collect();
            let sum: f64 = prob.iter().sum();
            if sum != 0.0 {
                prob.iter_mut().for_each(|p| *p /= sum);
            }

            for (id, h) in hist.iter().enumerate() {
                let kl = (w as f64).ln()
                    + prob
                        .iter()
                        .zip(h)
                        .map(|(p, hj)| p * (p.ln() - hj))
                        .sum::<f64>();
                if kl.is_finite() && best.is_none_or(|(best_kl, ..)| kl < best_kl) {
                    best = Some((kl, b, id, w - 1));
                }
            }
        }
    }

    let (_, beta_id, bound_id, width_id) = best.ok_or_else(|| {
        GeometryError::ConvergenceFailure("no generalized Gaussian candidate fits".to_string())
    })?;
    let (z_lo, z_hi) = z_bounds[beta_id];
    let alpha = grid[bound_id][width_id] / (z_hi - z_lo);
    let beta = betas[beta_id];

    let mu = firsts[bound_id] - z_lo * alpha;
    let sigma = (alpha * alpha * gamma(3.0 / beta) / gamma(1.0 / beta)).sqrt();
    Ok((mu, sigma))
}

/// Eigen pairs with eigenvalues ascending and the matching eigenvectors by column.
pub fn sorted_eigen_vectors(m: &Matrix) -> Result<(Matrix, Vec<f64>)> {
    let (values, vectors) = symmetric_eigen_sorted(m)?;
    Ok((vectors, values.iter().copied().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use statrs::distribution::Normal;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_double_range() {
        assert_close(&double_range(0.0, 10.0, 2.0, true), &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_close(&double_range(0.0, 10.0, 2.0, false), &[0.0, 2.0, 4.0, 6.0, 8.0]);
        let expected = [0.15, 0.65, 1.15, 1.65, 2.15, 2.65];
        assert_close(&double_range(0.15, 3.05, 0.5, true), &expected);
        assert_close(&double_range(0.15, 3.05, 0.5, false), &expected);
        assert!(double_range(2.0, 1.0, 0.5, true).is_empty());
        assert_eq!(FitParams::default().betas.len(), 13);
    }

    #[test]
    fn test_round_index_range() {
        assert_eq!(round_index_range(0.0, 10.0, 2.0, true, true), vec![0, 2, 4, 6, 8, 10]);
        assert_eq!(round_index_range(0.0, 10.0, 2.0, false, true), vec![0, 2, 4, 6, 8]);
        assert_eq!(round_index_range(0.15, 3.15, 0.2, true, true), vec![0, 1, 2, 3]);
        assert_eq!(
            round_index_range(0.15, 3.05, 0.2, false, false),
            vec![0, 0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3]
        );
    }

    #[test]
    fn test_bin_hist() {
        assert_eq!(bin_hist(&[0.0, 1.0, 2.0, 3.0, 4.0], 4), vec![1, 1, 1, 2]);
        assert_eq!(bin_hist(&[0.0, 0.0], 3), vec![0, 0, 0]);
        assert_eq!(bin_hist(&[], 2), vec![0, 0]);
        assert_eq!(bin_hist(&[-1.0, 2.0], 2), vec![0, 1]);
    }

    #[test]
    fn test_fit_distribution_on_gaussian_quantiles() {
        let normal = Normal::new(5.0, 1.0).unwrap();
        let n = 2000;
        let values: Vec<f64> = (0..n)
            .map(|i| normal.inverse_cdf((i as f64 + 0.5) / n as f64))
            .collect();
        let (mu, sigma) = fit_distribution(&values, &FitParams::default()).unwrap();
        assert!((mu - 5.0).abs() < 0.3, "mu = {}", mu);
        assert!(sigma > 0.5 && sigma < 1.5, "sigma = {}", sigma);
    }

    #[test]
    fn test_fit_distribution_rejects_bad_params() {
        let values = vec![1.0; 100];
        let params = FitParams {
            step_bound: 0.5,
            ..FitParams::default()
        };
        assert!(fit_distribution(&values, &params).is_err());
        assert!(fit_distribution(&[], &FitParams::default()).is_err());

        let inverted = FitParams {
            min_quantile: 0.6,
            max_quantile: 0.2,
            ..FitParams::default()
        };
        let err = inverted.validate().unwrap_err();
        assert!(err.to_string().contains("max_quantile must exceed min_quantile"));
    }

    #[test]
    fn test_sorted_eigen_vectors() {
        let m = Matrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let (vectors, values) = sorted_eigen_vectors(&m).unwrap();
        assert_close(&values, &[1.0, 3.0]);
        let v = vectors.column(0);
        assert!((v[0] + v[1]).abs() < 1e-12);
    }
}
