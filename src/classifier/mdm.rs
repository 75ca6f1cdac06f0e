// file: src/classifier/mdm.rs
// description: minimum distance to mean classifier with optional mean adaptation

use super::{Adaptation, ClassifierKind, MatrixClassifier, Prediction, adaptation_target};
use crate::error::{GeometryError, Result};
use crate::geometry::basics::{are_equals, matrix_print};
use crate::geometry::{Convergence, Matrix, Metric, distance, geodesic, mean_with};
use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MdmRecord")]
pub struct Mdm {
    metric: Metric,
    class_count: usize,
    #[serde(with = "crate::io::matrix_serde::vec")]
    means: Vec<Matrix>,
    /// Trials absorbed by each class mean, training included.
    trial_counts: Vec<usize>,
    convergence: Convergence,
}

/// Stored form of [`Mdm`], checked before it becomes a classifier.
#[derive(Deserialize)]
struct MdmRecord {
    metric: Metric,
    class_count: usize,
    #[serde(with = "crate::io::matrix_serde::vec")]
    means: Vec<Matrix>,
    trial_counts: Vec<usize>,
    #[serde(default)]
    convergence: Convergence,
}

impl TryFrom<MdmRecord> for Mdm {
    type Error = GeometryError;

    fn try_from(record: MdmRecord) -> Result<Self> {
        if record.means.len() != record.class_count {
            return Err(GeometryError::InvalidModel(format!(
                "{} class means for {} classes",
                record.means.len(),
                record.class_count
            )));
        }
        let mut mdm = Mdm::new(record.class_count, record.metric).with_convergence(record.convergence);
        if record.means.iter().all(Matrix::is_empty) {
            if record.trial_counts.len() != record.class_count {
                return Err(GeometryError::InvalidModel(format!(
                    "{} trial counts for {} classes",
                    record.trial_counts.len(),
                    record.class_count
                )));
            }
            return Ok(mdm);
        }
        mdm.set_means(record.means, record.trial_counts)?;
        Ok(mdm)
    }
}

impl Default for Mdm {
    fn default() -> Self {
        Self::new(2, Metric::Riemann)
    }
}

impl Mdm {
    pub fn new(class_count: usize, metric: Metric) -> Self {
        Self {
            metric,
            class_count,
            means: vec![Matrix::zeros(0, 0); class_count],
            trial_counts: vec![0; class_count],
            convergence: Convergence::default(),
        }
    }

    pub fn with_convergence(mut self, convergence: Convergence) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn convergence(&self) -> &Convergence {
        &self.convergence
    }

    pub fn means(&self) -> &[Matrix] {
        &self.means
    }

    pub fn trial_counts(&self) -> &[usize] {
        &self.trial_counts
    }

    pub fn is_trained(&self) -> bool {
        Validator::are_square(&self.means)
    }

    /// Replaces the class means, e.g. when restoring a model computed elsewhere.
    pub fn set_means(&mut self, means: Vec<Matrix>, trial_counts: Vec<usize>) -> Result<()> {
        Validator::validate_square_set("class means", &means)?;
        if trial_counts.len() != means.len() {
            return Err(GeometryError::InvalidModel(format!(
                "{} trial counts for {} class means",
                trial_counts.len(),
                means.len()
            )));
        }
        self.class_count = means.len();
        self.means = means;
        self.trial_counts = trial_counts;
        Ok(())
    }

    /// Distance from `sample` to every class mean.
    pub fn distances(&self, sample: &Matrix) -> Result<Vec<f64>> {
        if !self.is_trained() {
            return Err(GeometryError::InvalidModel("MDM classifier is not trained".to_string()));
        }
        Validator::validate_square("MDM sample", sample)?;
        let shape = self.means[0].shape();
        if sample.shape() != shape {
            return Err(GeometryError::size_mismatch("MDM sample", shape, sample.shape()));
        }
        self.means
            .iter()
            .map(|m| distance(sample, m, self.metric))
            .collect()
    }

    /// `C_k <- geodesic(C_k, S, 1 / n_k)` after counting the new trial.
    pub fn adapt(&mut self, class_id: usize, sample: &Matrix) -> Result<()> {
        let out_of_range = || GeometryError::OutOfRange(format!("class {}", class_id));
        let count = self.trial_counts.get(class_id).ok_or_else(out_of_range)? + 1;
        let mean = self.means.get_mut(class_id).ok_or_else(out_of_range)?;
        *mean = geodesic(&*mean, sample, self.metric, 1.0 / count as f64)?;
        if let Some(n) = self.trial_counts.get_mut(class_id) {
            *n = count;
        }
        debug!("Adapted class {} mean ({} trials)", class_id, count);
        Ok(())
    }
}

impl MatrixClassifier for Mdm {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Mdm
    }

    fn class_count(&self) -> usize {
        self.class_count
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn train(&mut self, datasets: &[Vec<Matrix>]) -> Result<()> {
        if datasets.is_empty() {
            return Err(GeometryError::empty("MDM training datasets"));
        }
        let means = datasets
            .iter()
            .enumerate()
            .map(|(k, trials)| {
                Validator::validate_square_set(&format!("MDM class {}", k), trials)?;
                mean_with(trials, self.metric, &self.convergence)
            })
            .collect::<Result<Vec<_>>>()?;
        Validator::validate_square_set("class means", &means)?;

        self.class_count = datasets.len();
        self.trial_counts = datasets.iter().map(Vec::len).collect();
        self.means = means;
        debug!("Trained MDM on {} classes ({:?} trials)", self.class_count, self.trial_counts);
        Ok(())
    }

    fn classify_with(
        &mut self,
        sample: &Matrix,
        adaptation: Adaptation,
        expected: Option<usize>,
    ) -> Result<Prediction> {
        let prediction = Prediction::from_distances(self.distances(sample)?)?;
        if let Some(k) =
            adaptation_target(adaptation, prediction.class_id, expected, self.class_count)?
        {
            self.adapt(k, sample)?;
        }
        Ok(prediction)
    }

    fn is_approx_eq(&self, other: &Self, precision: f64) -> bool {
        self.metric == other.metric
            && self.class_count == other.class_count
            && self.trial_counts == other.trial_counts
            && self.means.len() == other.means.len()
            && self
                .means
                .iter()
                .zip(&other.means)
                .all(|(a, b)| are_equals(a, b, precision))
    }
}

impl fmt::Display for Mdm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Metric : {}", self.metric)?;
        writeln!(f, "Nb of Class : {}", self.class_count)?;
        for (k, m) in self.means.iter().enumerate() {
            write!(f, "Mean Class {} : ", k)?;
            if m.is_empty() {
                writeln!(f, "Not Computed")?;
            } else {
                writeln!(f, "\n{}", matrix_print(m))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{diag, spd_cloud};
    use pretty_assertions::assert_eq;

    fn trained() -> (Mdm, Vec<Vec<Matrix>>) {
        let data = vec![
            spd_cloud(&diag(&[1.0, 2.0]), 10, 0.05, 3),
            spd_cloud(&diag(&[3.0, 0.5]), 10, 0.05, 4),
        ];
        let mut mdm = Mdm::new(2, Metric::Riemann);
        mdm.train(&data).unwrap();
        (mdm, data)
    }

    #[test]
    fn test_training_sets_means_and_counts() {
        let (mdm, _) = trained();
        assert!(mdm.is_trained());
        assert_eq!(mdm.trial_counts(), &[10, 10]);
        assert_eq!(mdm.means()[0].shape(), (2, 2));
    }

    #[test]
    fn test_classify_training_trials() {
        let (mut mdm, data) = trained();
        for (k, trials) in data.iter().enumerate() {
            for t in trials {
                let p = mdm.classify(t).unwrap();
                assert_eq!(p.class_id, k);
                assert!(p.probabilities[k] > 0.5);
            }
        }
    }

    #[test]
    fn test_supervised_adaptation_moves_expected_class() {
        let (mut mdm, _) = trained();
        let before = mdm.means()[1].clone();
        let sample = diag(&[1.0, 2.0]);
        mdm.classify_with(&sample, Adaptation::Supervised, Some(1)).unwrap();
        assert_eq!(mdm.trial_counts(), &[10, 11]);

        let expected = geodesic(&before, &sample, Metric::Riemann, 1.0 / 11.0).unwrap();
        assert!(are_equals(&mdm.means()[1], &expected, 1e-12));
    }

    #[test]
    fn test_unsupervised_adaptation_moves_predicted_class() {
        let (mut mdm, _) = trained();
        let p = mdm
            .classify_with(&diag(&[3.0, 0.5]), Adaptation::Unsupervised, None)
            .unwrap();
        assert_eq!(p.class_id, 1);
        assert_eq!(mdm.trial_counts(), &[10, 11]);
    }

    #[test]
    fn test_invalid_samples() {
        let mut untrained = Mdm::default();
        assert!(untrained.classify(&diag(&[1.0, 1.0])).is_err());

        let (mut mdm, _) = trained();
        assert!(mdm.classify(&Matrix::zeros(2, 3)).is_err());
        assert!(mdm.classify(&diag(&[1.0, 1.0, 1.0])).is_err());
        assert!(mdm.train(&[]).is_err());
        assert!(mdm.train(&[vec![], vec![diag(&[1.0, 1.0])]]).is_err());
    }

    #[test]
    fn test_display_and_equality() {
        let (mdm, _) = trained();
        let text = mdm.to_string();
        assert!(text.starts_with("Metric : Riemann\nNb of Class : 2\n"));
        assert!(Mdm::default().to_string().contains("Not Computed"));

        let mut other = mdm.clone();
        assert!(mdm.is_approx_eq(&other, 1e-9));
        other.adapt(0, &diag(&[5.0, 5.0])).unwrap();
        assert!(!mdm.is_approx_eq(&other, 1e-9));
    }

    #[test]
    fn test_inconsistent_saved_model_is_rejected() {
        let (mdm, _) = trained();
        let mut value = serde_json::to_value(&mdm).unwrap();
        let back: Mdm = serde_json::from_value(value.clone()).unwrap();
        assert!(back.is_approx_eq(&mdm, 1e-12));

        value["trial_counts"] = serde_json::json!([1, 1, 1]);
        value["class_count"] = serde_json::json!(3);
        let err = serde_json::from_value::<Mdm>(value.clone()).unwrap_err();
        assert!(err.to_string().contains("Invalid model"), "{}", err);

        value["class_count"] = serde_json::json!(2);
        assert!(serde_json::from_value::<Mdm>(value).is_err());

        let untrained = serde_json::to_value(Mdm::new(3, Metric::Euclidean)).unwrap();
        let restored: Mdm = serde_json::from_value(untrained).unwrap();
        assert_eq!(restored.class_count(), 3);
        assert!(!restored.is_trained());
    }

    #[test]
    fn test_adapting_unknown_class_is_an_error() {
        let (mut mdm, _) = trained();
        assert!(mdm.adapt(2, &diag(&[1.0, 1.0])).is_err());
        assert_eq!(mdm.trial_counts(), &[10, 10]);
    }

    #[test]
    fn test_convergence_is_kept() {
        let convergence = Convergence {
            epsilon: 1e-8,
            max_iterations: 3,
        };
        let mdm = Mdm::new(2, Metric::Riemann).with_convergence(convergence);
        assert_eq!(mdm.convergence(), &convergence);
        let back: Mdm = serde_json::from_value(serde_json::to_value(&mdm).unwrap()).unwrap();
        assert_eq!(back.convergence(), &convergence);
    }
}
