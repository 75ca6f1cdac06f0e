// file: src/classifier/fgmdm_rt.rs
// description: MDM on geodesically filtered trials, adapting only the class means
// reference: Barachant et al. (2010) Riemannian geometry applied to BCI classification

use super::{Adaptation, ClassifierKind, MatrixClassifier, Mdm, Prediction};
use crate::error::{GeometryError, Result};
use crate::geometry::basics::{are_equals, flatten_classes, matrix_print};
use crate::geometry::classification::{fgda_apply, fgda_compute};
use crate::geometry::{Convergence, Matrix, Metric, RowVector, mean_with, tangent_space, untangent_space};
use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FgMdmRt {
    mdm: Mdm,
    /// Riemann mean of all training trials, the tangent point.
    #[serde(with = "crate::io::matrix_serde")]
    reference: Matrix,
    #[serde(with = "crate::io::matrix_serde")]
    weight: Matrix,
}

impl Default for FgMdmRt {
    fn default() -> Self {
        Self::new(2, Metric::Riemann)
    }
}

impl FgMdmRt {
    pub fn new(class_count: usize, metric: Metric) -> Self {
        Self {
            mdm: Mdm::new(class_count, metric),
            reference: Matrix::zeros(0, 0),
            weight: Matrix::zeros(0, 0),
        }
    }

    /// Stopping rule for the reference mean and the class means.
    pub fn with_convergence(mut self, convergence: Convergence) -> Self {
        self.mdm = self.mdm.with_convergence(convergence);
        self
    }

    pub fn mdm(&self) -> &Mdm {
        &self.mdm
    }

    pub fn reference(&self) -> &Matrix {
        &self.reference
    }

    pub fn weight(&self) -> &Matrix {
        &self.weight
    }

    /// Projects `sample` onto the discriminant subspace of the tangent space.
    pub fn filter(&self, sample: &Matrix) -> Result<Matrix> {
        if self.weight.is_empty() {
            return Err(GeometryError::InvalidModel("geodesic filter is not trained".to_string()));
        }
        Validator::validate_same_size("filtered sample", &self.reference, sample)?;
        self.filter_unchecked(sample)
    }

    fn filter_unchecked(&self, sample: &Matrix) -> Result<Matrix> {
        let ts = tangent_space(sample, Some(&self.reference))?;
        let filtered = fgda_apply(&ts, &self.weight)?;
        untangent_space(&filtered, Some(&self.reference))
    }
}

impl MatrixClassifier for FgMdmRt {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::FgMdmRt
    }

    fn class_count(&self) -> usize {
        self.mdm.class_count()
    }

    fn metric(&self) -> Metric {
        self.mdm.metric()
    }

    fn train(&mut self, datasets: &[Vec<Matrix>]) -> Result<()> {
        let all = flatten_classes(datasets);
        Validator::validate_square_set("FgMDM training trials", &all)?;
        if datasets.iter().any(Vec::is_empty) {
            return Err(GeometryError::empty("FgMDM training class"));
        }

        let reference = mean_with(&all, Metric::Riemann, self.mdm.convergence())?;
        let features = datasets
            .iter()
            .map(|trials| {
                trials
                    .iter()
                    .map(|t| tangent_space(t, Some(&reference)))
                    .collect::<Result<Vec<RowVector>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        self.weight = fgda_compute(&features)?;
        self.reference = reference;

        let filtered = datasets
            .iter()
            .map(|trials| trials.iter().map(|t| self.filter_unchecked(t)).collect())
            .collect::<Result<Vec<Vec<Matrix>>>>()?;
        self.mdm.train(&filtered)
    }

    fn classify_with(
        &mut self,
        sample: &Matrix,
        adaptation: Adaptation,
        expected: Option<usize>,
    ) -> Result<Prediction> {
        let filtered = self.filter(sample)?;
        self.mdm.classify_with(&filtered, adaptation, expected)
    }

    fn is_approx_eq(&self, other: &Self, precision: f64) -> bool {
        self.mdm.is_approx_eq(&other.mdm, precision)
            && are_equals(&self.reference, &other.reference, precision)
            && are_equals(&self.weight, &other.weight, precision)
    }
}

impl fmt::Display for FgMdmRt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mdm)?;
        if self.reference.is_empty() {
            return writeln!(f, "Reference : Not Computed");
        }
        writeln!(f, "Reference : \n{}", matrix_print(&self.reference))?;
        writeln!(f, "Weight : {}x{}", self.weight.nrows(), self.weight.ncols())
    }
}
