// file: src/geometry/mod.rs
// description: geometry module exports and shared matrix types
// reference: Riemannian geometry of symmetric positive definite matrices

pub mod basics;
pub mod classification;
pub mod covariance;
pub mod distance;
pub mod featurization;
pub mod geodesic;
pub mod linalg;
pub mod mean;
pub mod median;
pub mod metric;
pub mod misc;

use serde::{Deserialize, Serialize};

pub type Matrix = nalgebra::DMatrix<f64>;
pub type RowVector = nalgebra::RowDVector<f64>;

pub use basics::{Standardization, are_equals};
pub use covariance::{CovarianceSettings, Estimator, covariance_matrix};
pub use distance::distance;
pub use featurization::{tangent_space, untangent_space};
pub use geodesic::geodesic;
pub use mean::{mean, mean_with};
pub use median::{median, median_with};
pub use metric::Metric;

/// Stopping rule for the iterative means and medians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Convergence {
    pub epsilon: f64,
    pub max_iterations: usize,
}

impl Default for Convergence {
    fn default() -> Self {
        Self {
            epsilon: 1e-4,
            max_iterations: 50,
        }
    }
}
