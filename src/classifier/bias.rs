// file: src/classifier/bias.rs
// description: session bias estimation and removal for covariance trials
// reference: Zanini et al. (2018) transfer learning by Riemannian re-centering

use crate::error::{GeometryError, Result};
use crate::geometry::basics::{are_equals, flatten_classes, matrix_print};
use crate::geometry::linalg::inv_sqrtm;
use crate::geometry::{Convergence, Matrix, Metric, geodesic, mean_with};
use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference matrix `B` and its whitening `B^{-1/2}`, updated online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bias {
    #[serde(with = "crate::io::matrix_serde")]
    bias: Matrix,
    #[serde(with = "crate::io::matrix_serde")]
    bias_is: Matrix,
    classification_count: usize,
    #[serde(default)]
    convergence: Convergence,
}

impl Default for Bias {
    fn default() -> Self {
        Self {
            bias: Matrix::zeros(0, 0),
            bias_is: Matrix::zeros(0, 0),
            classification_count: 0,
            convergence: Convergence::default(),
        }
    }
}

impl Bias {
    pub fn with_convergence(mut self, convergence: Convergence) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn convergence(&self) -> &Convergence {
        &self.convergence
    }

    pub fn bias(&self) -> &Matrix {
        &self.bias
    }

    pub fn classification_count(&self) -> usize {
        self.classification_count
    }

    pub fn is_computed(&self) -> bool {
        Validator::is_square(&self.bias_is)
    }

    pub fn set_bias(&mut self, bias: Matrix) -> Result<()> {
        Validator::validate_square("bias", &bias)?;
        self.bias_is = inv_sqrtm(&bias)?;
        self.bias = bias;
        Ok(())
    }

    /// Bias becomes the mean of `trials`. The online counter restarts.
    pub fn compute(&mut self, trials: &[Matrix], metric: Metric) -> Result<()> {
        Validator::validate_square_set("bias trials", trials)?;
        let reference = mean_with(trials, metric, &self.convergence)?;
        self.set_bias(reference)?;
        self.classification_count = 0;
        Ok(())
    }

    pub fn compute_classes(&mut self, datasets: &[Vec<Matrix>], metric: Metric) -> Result<()> {
        self.compute(&flatten_classes(datasets), metric)
    }

    /// `B^{-1/2} M B^{-1/2}`.
    pub fn apply(&self, m: &Matrix) -> Result<Matrix> {
        if !self.is_computed() {
            return Err(GeometryError::InvalidModel("bias is not computed".to_string()));
        }
        if m.shape() != self.bias_is.shape() {
            return Err(GeometryError::size_mismatch("bias application", self.bias_is.shape(), m.shape()));
        }
        Ok(&self.bias_is * m * self.bias_is.transpose())
    }

    pub fn apply_all(&self, trials: &[Matrix]) -> Result<Vec<Matrix>> {
        trials.iter().map(|m| self.apply(m)).collect()
    }

    pub fn apply_classes(&self, datasets: &[Vec<Matrix>]) -> Result<Vec<Vec<Matrix>>> {
        datasets.iter().map(|trials| self.apply_all(trials)).collect()
    }

    /// The first classified sample replaces the training bias, later ones
    /// pull it along the geodesic with weight `1 / n`.
    pub fn update(&mut self, sample: &Matrix, metric: Metric) -> Result<()> {
        Validator::validate_square("bias sample", sample)?;
        let count = self.classification_count + 1;
        let next = if count == 1 {
            sample.clone()
        } else {
            geodesic(&self.bias, sample, metric, 1.0 / count as f64)?
        };
        self.set_bias(next)?;
        self.classification_count = count;
        Ok(())
    }

    pub fn is_approx_eq(&self, other: &Self, precision: f64) -> bool {
        self.classification_count == other.classification_count
            && are_equals(&self.bias, &other.bias, precision)
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of Classification : {}", self.classification_count)?;
        write!(f, "Bias Matrix : ")?;
        if self.bias.is_empty() {
            writeln!(f, "Not Computed")
        } else {
            writeln!(f, "\n{}", matrix_print(&self.bias))
        }
    }
}
