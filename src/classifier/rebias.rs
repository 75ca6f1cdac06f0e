// file: src/classifier/rebias.rs
// description: wraps any matrix classifier with online bias removal

use super::{Adaptation, Bias, ClassifierKind, FgMdm, FgMdmRt, MatrixClassifier, Mdm, Prediction};
use crate::error::{GeometryError, Result};
use crate::geometry::{Convergence, Matrix, Metric};
use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trains the inner classifier on re-centered trials and keeps re-centering
/// each new sample with the running mean of the samples seen so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rebiased<C> {
    bias: Bias,
    inner: C,
}

pub type MdmRebias = Rebiased<Mdm>;
pub type FgMdmRtRebias = Rebiased<FgMdmRt>;
pub type FgMdmRebias = Rebiased<FgMdm>;

impl<C: Default> Default for Rebiased<C> {
    fn default() -> Self {
        Self::from_inner(C::default())
    }
}

impl<C> Rebiased<C> {
    pub fn from_inner(inner: C) -> Self {
        Self {
            bias: Bias::default(),
            inner,
        }
    }

    /// Stopping rule for the bias mean. The inner classifier keeps its own.
    pub fn with_convergence(mut self, convergence: Convergence) -> Self {
        self.bias = self.bias.with_convergence(convergence);
        self
    }

    pub fn bias(&self) -> &Bias {
        &self.bias
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn set_bias(&mut self, bias: Matrix) -> Result<()> {
        self.bias.set_bias(bias)
    }
}

impl<C: MatrixClassifier> MatrixClassifier for Rebiased<C> {
    fn kind(&self) -> ClassifierKind {
        self.inner.kind().rebiased()
    }

    fn class_count(&self) -> usize {
        self.inner.class_count()
    }

    fn metric(&self) -> Metric {
        self.inner.metric()
    }

    fn train(&mut self, datasets: &[Vec<Matrix>]) -> Result<()> {
        check_bias_metric(self.inner.metric())?;
        self.bias.compute_classes(datasets, self.inner.metric())?;
        let recentered = self.bias.apply_classes(datasets)?;
        self.inner.train(&recentered)
    }

    fn classify_with(
        &mut self,
        sample: &Matrix,
        adaptation: Adaptation,
        expected: Option<usize>,
    ) -> Result<Prediction> {
        check_bias_metric(self.inner.metric())?;
        Validator::validate_square("rebias sample", sample)?;
        let recentered = self.bias.apply(sample)?;
        self.bias.update(sample, self.inner.metric())?;
        self.inner.classify_with(&recentered, adaptation, expected)
    }

    fn is_approx_eq(&self, other: &Self, precision: f64) -> bool {
        self.inner.is_approx_eq(&other.inner, precision) && self.bias.is_approx_eq(&other.bias, precision)
    }
}

/// The running bias moves along geodesics, so the metric needs one.
fn check_bias_metric(metric: Metric) -> Result<()> {
    if !metric.has_geodesic() {
        return Err(GeometryError::InvalidModel(format!(
            "rebias classifiers need a metric with a geodesic, {} has none",
            metric
        )));
    }
    Ok(())
}

impl<C: fmt::Display> fmt::Display for Rebiased<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)?;
        write!(f, "{}", self.bias)
    }
}
