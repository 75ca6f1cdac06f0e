// file: src/classifier/fgmdm.rs
// description: geodesic filtering MDM that retrains its filter when adapting

use super::{Adaptation, ClassifierKind, FgMdmRt, MatrixClassifier, Prediction, adaptation_target};
use crate::error::{GeometryError, Result};
use crate::geometry::{Convergence, Matrix, Metric};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Keeps every training trial so the filter and means can be rebuilt
/// when a classified sample joins its class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FgMdmRecord")]
pub struct FgMdm {
    inner: FgMdmRt,
    #[serde(with = "crate::io::matrix_serde::vec2")]
    datasets: Vec<Vec<Matrix>>,
}

#[derive(Deserialize)]
struct FgMdmRecord {
    inner: FgMdmRt,
    #[serde(with = "crate::io::matrix_serde::vec2")]
    datasets: Vec<Vec<Matrix>>,
}

impl TryFrom<FgMdmRecord> for FgMdm {
    type Error = GeometryError;

    /// A trained model must carry one stored dataset per class.
    fn try_from(record: FgMdmRecord) -> Result<Self> {
        let trained = record.inner.mdm().is_trained();
        let expected = if trained { record.inner.class_count() } else { 0 };
        if record.datasets.len() != expected {
            return Err(GeometryError::InvalidModel(format!(
                "{} stored datasets for {} classes",
                record.datasets.len(),
                expected
            )));
        }
        Ok(Self {
            inner: record.inner,
            datasets: record.datasets,
        })
    }
}

impl Default for FgMdm {
    fn default() -> Self {
        Self::new(2, Metric::Riemann)
    }
}

impl FgMdm {
    pub fn new(class_count: usize, metric: Metric) -> Self {
        Self {
            inner: FgMdmRt::new(class_count, metric),
            datasets: Vec::new(),
        }
    }

    pub fn with_convergence(mut self, convergence: Convergence) -> Self {
        self.inner = self.inner.with_convergence(convergence);
        self
    }

    pub fn inner(&self) -> &FgMdmRt {
        &self.inner
    }

    pub fn datasets(&self) -> &[Vec<Matrix>] {
        &self.datasets
    }
}

impl MatrixClassifier for FgMdm {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::FgMdm
    }

    fn class_count(&self) -> usize {
        self.inner.class_count()
    }

    fn metric(&self) -> Metric {
        self.inner.metric()
    }

    fn train(&mut self, datasets: &[Vec<Matrix>]) -> Result<()> {
        self.inner.train(datasets)?;
        self.datasets = datasets.to_vec();
        Ok(())
    }

    fn classify_with(
        &mut self,
        sample: &Matrix,
        adaptation: Adaptation,
        expected: Option<usize>,
    ) -> Result<Prediction> {
        let prediction = self.inner.classify(sample)?;
        if let Some(k) =
            adaptation_target(adaptation, prediction.class_id, expected, self.class_count())?
        {
            let mut datasets = self.datasets.clone();
            let class = datasets
                .get_mut(k)
                .ok_or_else(|| GeometryError::OutOfRange(format!("class {}", k)))?;
            class.push(sample.clone());
            let size = class.len();

            // commit only once the rebuilt model is complete
            let mut retrained = self.inner.clone();
            retrained.train(&datasets)?;
            self.inner = retrained;
            self.datasets = datasets;
            debug!("Retrained FgMDM with class {} at {} trials", k, size);
        }
        Ok(prediction)
    }

    fn is_approx_eq(&self, other: &Self, precision: f64) -> bool {
        self.inner.is_approx_eq(&other.inner, precision)
            && self.datasets.iter().map(Vec::len).eq(other.datasets.iter().map(Vec::len))
    }
}

impl fmt::Display for FgMdm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)?;
        let sizes: Vec<usize> = self.datasets.iter().map(Vec::len).collect();
        writeln!(f, "Stored Trials : {:?}", sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::basics::are_equals;
    use crate::test_support::{diag, spd_cloud};
    use pretty_assertions::assert_eq;

    fn data() -> Vec<Vec<Matrix>> {
        vec![
            spd_cloud(&diag(&[2.0, 1.0]), 10, 0.08, 21),
            spd_cloud(&diag(&[1.0, 2.0]), 10, 0.08, 22),
        ]
    }

    #[test]
    fn test_adaptation_retrains_on_raw_samples() {
        let data = data();
        let mut clf = FgMdm::default();
        clf.train(&data).unwrap();
        let reference = clf.inner().reference().clone();

        let sample = diag(&[1.0, 2.5]);
        let p = clf.classify_with(&sample, Adaptation::Supervised, Some(1)).unwrap();
        assert_eq!(p.class_id, 1);
        assert_eq!(clf.datasets()[1].len(), 11);
        assert_eq!(clf.datasets()[1][10], sample);
        assert_eq!(clf.inner().mdm().trial_counts(), &[10, 11]);
        assert!(!are_equals(clf.inner().reference(), &reference, 1e-12));
    }

    #[test]
    fn test_no_adaptation_keeps_model() {
        let data = data();
        let mut clf = FgMdm::default();
        clf.train(&data).unwrap();
        let before = clf.clone();
        clf.classify(&data[0][3]).unwrap();
        assert!(clf.is_approx_eq(&before, 1e-12));
    }

    #[test]
    fn test_failed_retrain_leaves_model_unchanged() {
        let data = data();
        let mut clf = FgMdm::default();
        clf.train(&data).unwrap();
        // a stored trial of the wrong size makes the next retrain fail
        clf.datasets[0].push(diag(&[1.0, 1.0, 1.0]));
        let before = clf.clone();

        let result = clf.classify_with(&diag(&[1.0, 2.5]), Adaptation::Supervised, Some(1));
        assert!(result.is_err());
        assert_eq!(clf.datasets()[0].len(), 11);
        assert_eq!(clf.datasets()[1].len(), 10);
        assert_eq!(clf, before);
    }

    #[test]
    fn test_saved_model_needs_one_dataset_per_class() {
        let data = data();
        let mut clf = FgMdm::default();
        clf.train(&data).unwrap();
        let mut value = serde_json::to_value(&clf).unwrap();
        let back: FgMdm = serde_json::from_value(value.clone()).unwrap();
        assert!(back.is_approx_eq(&clf, 1e-12));

        value["datasets"] = serde_json::json!([]);
        let err = serde_json::from_value::<FgMdm>(value).unwrap_err();
        assert!(err.to_string().contains("stored datasets"), "{}", err);

        let untrained: FgMdm = serde_json::from_value(serde_json::to_value(FgMdm::default()).unwrap()).unwrap();
        assert!(untrained.datasets().is_empty());
    }
}
