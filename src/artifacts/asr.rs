// file: src/artifacts/asr.rs
// description: artifact subspace reconstruction of multichannel signal windows
// reference: Kothe & Jung (2016) clean_rawdata asr_calibrate / asr_process

use crate::error::{GeometryError, Result};
use crate::geometry::basics::{are_equals, matrix_print};
use crate::geometry::covariance::{Estimator, covariance_matrix};
use crate::geometry::linalg::sqrtm;
use crate::geometry::misc::{FitParams, fit_distribution, sorted_eigen_vectors};
use crate::geometry::{Matrix, Metric, Standardization, median};
use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub const DEFAULT_REJECTION_LIMIT: f64 = 5.0;

/// Calibrated on clean windows (channels by samples), then removes the
/// high-variance components of incoming windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asr {
    metric: Metric,
    channel_count: usize,
    /// Fraction of channels that may be reconstructed.
    max_channel: f64,
    trivial: bool,
    /// Square root of the calibration covariance median.
    #[serde(with = "crate::io::matrix_serde")]
    median: Matrix,
    #[serde(with = "crate::io::matrix_serde")]
    threshold: Matrix,
    #[serde(with = "crate::io::matrix_serde")]
    reconstruction: Matrix,
    #[serde(with = "crate::io::matrix_serde")]
    covariance: Matrix,
}

impl Default for Asr {
    fn default() -> Self {
        Self::new(Metric::Euclidean)
    }
}

impl Asr {
    pub fn new(metric: Metric) -> Self {
        let mut asr = Self {
            metric: Metric::Euclidean,
            channel_count: 0,
            max_channel: 1.0,
            trivial: true,
            median: Matrix::zeros(0, 0),
            threshold: Matrix::zeros(0, 0),
            reconstruction: Matrix::zeros(0, 0),
            covariance: Matrix::zeros(0, 0),
        };
        asr.set_metric(metric);
        asr
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Only Riemann and Euclidean medians are used, anything else is Euclidean.
    pub fn set_metric(&mut self, metric: Metric) {
        self.metric = if metric == Metric::Riemann {
            Metric::Riemann
        } else {
            Metric::Euclidean
        };
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn max_channel(&self) -> f64 {
        self.max_channel
    }

    /// Values outside [0, 1] are ignored.
    pub fn set_max_channel(&mut self, max: f64) {
        if Validator::in_range(max, 0.0, 1.0) {
            self.max_channel = max;
        }
    }

    pub fn is_trivial(&self) -> bool {
        self.trivial
    }

    pub fn median(&self) -> &Matrix {
        &self.median
    }

    pub fn threshold(&self) -> &Matrix {
        &self.threshold
    }

    pub fn reconstruction(&self) -> &Matrix {
        &self.reconstruction
    }

    pub fn covariance(&self) -> &Matrix {
        &self.covariance
    }

    pub fn is_trained(&self) -> bool {
        Validator::is_square(&self.median) && self.median.shape() == self.threshold.shape()
    }

    pub fn set_matrices(
        &mut self,
        median: Matrix,
        threshold: Matrix,
        reconstruction: Option<Matrix>,
        covariance: Option<Matrix>,
    ) -> Result<()> {
        Validator::validate_square("ASR median", &median)?;
        Validator::validate_same_size("ASR threshold", &median, &threshold)?;
        for (name, m) in [("ASR reconstruction", &reconstruction), ("ASR covariance", &covariance)] {
            if let Some(m) = m {
                Validator::validate_same_size(name, &median, m)?;
            }
        }
        self.channel_count = median.nrows();
        self.median = median;
        self.threshold = threshold;
        self.reconstruction = reconstruction.unwrap_or_else(|| Matrix::zeros(0, 0));
        self.covariance = covariance.unwrap_or_else(|| Matrix::zeros(0, 0));
        self.trivial = true;
        Ok(())
    }

    /// Calibrates the median and the per-component rejection threshold
    /// `T = diag(mu + k sigma) V^T`.
    pub fn train(&mut self, dataset: &[Matrix], rejection_limit: f64) -> Result<()> {
        if !Validator::are_not_empty(dataset) {
            return Err(GeometryError::empty("ASR calibration windows"));
        }
        if !Validator::all_same_size(dataset) {
            let other = dataset
                .iter()
                .find(|m| m.shape() != dataset[0].shape())
                .map_or(dataset[0].shape(), Matrix::shape);
            return Err(GeometryError::size_mismatch("ASR calibration windows", dataset[0].shape(), other));
        }
        if !(rejection_limit.is_finite() && rejection_limit > 0.0) {
            return Err(GeometryError::OutOfRange(format!(
                "rejection limit {} must be positive",
                rejection_limit
            )));
        }
        let channels = dataset[0].nrows();
        let windows = dataset.len();

        let covs = dataset
            .iter()
            .map(|w| covariance_matrix(w, Estimator::Lwf, Standardization::Center))
            .collect::<Result<Vec<_>>>()?;
        let root = sqrtm(&median(&covs, self.metric)?)?;
        let (vectors, _) = sorted_eigen_vectors(&root)?;

        let mut rms = vec![Vec::with_capacity(windows); channels];
        for window in dataset {
            let projected = window.transpose() * &vectors;
            for (j, column) in projected.column_iter().enumerate() {
                rms[j].push((column.norm_squared() / column.len() as f64).sqrt());
            }
        }

        let params = FitParams::default();
        let mut limits = Vec::with_capacity(channels);
        for (j, values) in rms.iter().enumerate() {
            let (mu, sigma) = fit_distribution(values, &params)?;
            debug!("ASR component {}: mu = {:.4}, sigma = {:.4}", j, mu, sigma);
            limits.push(mu + rejection_limit * sigma);
        }
        let limits = nalgebra::DVector::from_vec(limits);

        self.threshold = Matrix::from_diagonal(&limits) * vectors.transpose();
        self.median = root;
        self.channel_count = channels;
        self.trivial = true;
        self.reconstruction = Matrix::zeros(0, 0);
        self.covariance = Matrix::zeros(0, 0);
        debug!("ASR calibrated on {} windows of {} channels", windows, channels);
        Ok(())
    }

    /// Cleans one window. Components whose variance exceeds the threshold are
    /// rebuilt from the others.
    pub fn process(&mut self, input: &Matrix) -> Result<Matrix> {
        if !self.is_trained() {
            return Err(GeometryError::InvalidModel("ASR is not trained".to_string()));
        }
        Validator::validate_not_empty("ASR window", input)?;
        let c = self.channel_count;
        if input.nrows() != c {
            return Err(GeometryError::size_mismatch("ASR window", (c, input.ncols()), input.shape()));
        }

        let cov = covariance_matrix(input, Estimator::Cov, Standardization::Center)?;
        let (vectors, values) = sorted_eigen_vectors(&cov)?;
        let energy = &self.threshold * &vectors;
        let forced = c as f64 - (c as f64 * self.max_channel).round();

        let keep: Vec<bool> = (0..c)
            .map(|i| {
                let limit: f64 = energy.column(i).iter().map(|v| v * v).sum();
                values[i] < limit || ((i + 1) as f64) < forced
            })
            .collect();
        let removed = keep.iter().filter(|k| !**k).count();

        let reconstruction = if removed == 0 {
            self.trivial = true;
            Matrix::identity(c, c)
        } else {
            self.trivial = false;
            let mask = nalgebra::DVector::from_iterator(c, keep.iter().map(|&k| if k { 1.0 } else { 0.0 }));
            let partial = Matrix::from_diagonal(&mask) * vectors.transpose() * &self.median;
            let pinv = partial
                .pseudo_inverse(1e-12)
                .map_err(|e| GeometryError::Singular(format!("ASR reconstruction: {}", e)))?;
            debug!("ASR removed {} of {} components", removed, c);
            &self.median * pinv * vectors.transpose()
        };

        let output = &reconstruction * input;
        self.reconstruction = reconstruction;
        self.covariance = cov;
        Ok(output)
    }

    pub fn is_approx_eq(&self, other: &Self, precision: f64) -> bool {
        self.metric == other.metric
            && are_equals(&self.median, &other.median, precision)
            && are_equals(&self.threshold, &other.threshold, precision)
    }
}

impl fmt::Display for Asr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Metric = {}", self.metric)?;
        writeln!(f, "Number of channels = {}", self.channel_count)?;
        writeln!(f, "Max channel fraction = {}", self.max_channel)?;
        writeln!(f, "Median = \n{}", matrix_print(&self.median))?;
        writeln!(f, "Threshold matrix = \n{}", matrix_print(&self.threshold))
    }
}
