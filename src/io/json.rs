// file: src/io/json.rs
// description: json persistence for matrix datasets, classifiers and ASR state

use crate::error::{GeometryError, Result};
use crate::geometry::Matrix;
use crate::utils::Validator;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod kinds {
    pub const MATRIX: &str = "matrix";
    pub const MATRIX_SET: &str = "matrix_set";
    pub const CLASS_DATASET: &str = "class_dataset";
    pub const TRIAL_SET: &str = "trial_set";
    pub const CLASSIFIER: &str = "classifier";
    pub const ASR: &str = "asr";
    pub const EVALUATION_REPORT: &str = "evaluation_report";
    pub const PREDICTIONS: &str = "predictions";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleMatrix {
    #[serde(with = "super::matrix_serde")]
    pub matrix: Matrix,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatrixSet {
    #[serde(with = "super::matrix_serde::vec")]
    pub matrices: Vec<Matrix>,
}

/// Trials grouped by class, class `k` at index `k`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassDataset {
    #[serde(with = "super::matrix_serde::vec2")]
    pub classes: Vec<Vec<Matrix>>,
}

impl ClassDataset {
    pub fn trial_count(&self) -> usize {
        self.classes.iter().map(Vec::len).sum()
    }
}

/// Ordered trials with optional class labels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrialSet {
    #[serde(with = "super::matrix_serde::vec")]
    pub trials: Vec<Matrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<usize>>,
}

impl TrialSet {
    pub fn validate(&self) -> Result<()> {
        match &self.labels {
            Some(labels) if labels.len() != self.trials.len() => Err(GeometryError::Validation(
                format!("{} labels for {} trials", labels.len(), self.trials.len()),
            )),
            _ => Ok(()),
        }
    }

    /// Groups labelled trials into `class_count` classes.
    pub fn by_class(&self, class_count: usize) -> Result<ClassDataset> {
        self.validate()?;
        let labels = self
            .labels
            .as_ref()
            .ok_or_else(|| GeometryError::Validation("trials have no labels".to_string()))?;
        let mut classes = vec![Vec::new(); class_count];
        for (trial, &label) in self.trials.iter().zip(labels) {
            let class = classes.get_mut(label).ok_or_else(|| {
                GeometryError::OutOfRange(format!("label {} with {} classes", label, class_count))
            })?;
            class.push(trial.clone());
        }
        Ok(ClassDataset { classes })
    }
}

/// Wrapper written around every saved payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub kind: String,
    pub version: String,
    pub saved_at: String,
    pub payload: T,
}

#[derive(Debug, Clone)]
pub struct JsonStore {
    output_dir: PathBuf,
}

impl JsonStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `value` to `<output_dir>/<name>.json` and returns the path.
    pub fn save<T: Serialize>(&self, name: &str, kind: &str, value: &T, pretty: bool) -> Result<PathBuf> {
        let mut path = self.output_dir.join(name);
        if path.extension().is_none() {
            path.set_extension("json");
        }
        save_to(&path, kind, value, pretty)?;
        Ok(path)
    }

    /// Reads a payload of the given kind. Files without an envelope are
    /// read as a bare payload.
    pub fn load<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T> {
        Validator::validate_file_path(path)?;
        let contents = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&contents)?;

        let is_envelope = value.get("kind").is_some() && value.get("payload").is_some();
        let payload = if is_envelope {
            let envelope: Envelope<serde_json::Value> = serde_json::from_value(value)?;
            if envelope.kind != kind {
                return Err(GeometryError::InvalidModel(format!(
                    "{} holds a {} where a {} was expected",
                    path.display(),
                    envelope.kind,
                    kind
                )));
            }
            envelope.payload
        } else {
            value
        };
        debug!("Loaded {} from {}", kind, path.display());
        Ok(serde_json::from_value(payload)?)
    }
}

pub fn save_to<T: Serialize>(path: &Path, kind: &str, value: &T, pretty: bool) -> Result<()> {
    let envelope = Envelope {
        kind: kind.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        saved_at: Utc::now().to_rfc3339(),
        payload: value,
    };
    let contents = if pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    info!("Saved {} to {}", kind, path.display());
    Ok(())
}

pub fn read_matrix(path: &Path) -> Result<Matrix> {
    JsonStore::load::<SingleMatrix>(path, kinds::MATRIX).map(|m| m.matrix)
}

pub fn read_matrix_set(path: &Path) -> Result<MatrixSet> {
    JsonStore::load(path, kinds::MATRIX_SET)
}

pub fn read_class_dataset(path: &Path) -> Result<ClassDataset> {
    JsonStore::load(path, kinds::CLASS_DATASET)
}

pub fn read_trial_set(path: &Path) -> Result<TrialSet> {
    let set: TrialSet = JsonStore::load(path, kinds::TRIAL_SET)?;
    set.validate()?;
    Ok(set)
}

pub fn write_matrix(path: &Path, matrix: &Matrix, pretty: bool) -> Result<()> {
    let payload = SingleMatrix {
        matrix: matrix.clone(),
    };
    save_to(path, kinds::MATRIX, &payload, pretty)
}

pub fn write_matrix_set(path: &Path, matrices: Vec<Matrix>, pretty: bool) -> Result<()> {
    save_to(path, kinds::MATRIX_SET, &MatrixSet { matrices }, pretty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ClassifierKind, MatrixClassifier};
    use crate::geometry::{Convergence, Metric};
    use crate::test_support::{diag, spd_cloud};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_store_creates_directory() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("models")).unwrap();
        assert!(store.output_dir().is_dir());
    }

    #[test]
    fn test_saved_classifier_loads_back() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path()).unwrap();
        let mut classifier = Classifier::new(ClassifierKind::FgMdmRt, 2, Metric::Riemann, Convergence::default());
        classifier
            .train(&[
                spd_cloud(&diag(&[2.0, 1.0]), 8, 0.05, 41),
                spd_cloud(&diag(&[1.0, 2.0]), 8, 0.05, 42),
            ])
            .unwrap();

        let path = store.save("model", kinds::CLASSIFIER, &classifier, true).unwrap();
        assert_eq!(path.file_name().unwrap(), "model.json");
        let loaded: Classifier = JsonStore::load(&path, kinds::CLASSIFIER).unwrap();
        assert!(loaded.is_approx_eq(&classifier, 1e-9));
        assert!(JsonStore::load::<Classifier>(&path, kinds::ASR).is_err());
    }

    #[test]
    fn test_bare_payload_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trials.json");
        fs::write(&path, r#"{"trials":[[[1.0,0.0],[0.0,1.0]],[[2.0,0.0],[0.0,2.0]]],"labels":[0,1]}"#).unwrap();

        let set = read_trial_set(&path).unwrap();
        assert_eq!(set.trials.len(), 2);
        let classes = set.by_class(2).unwrap();
        assert_eq!(classes.classes[1], vec![diag(&[2.0, 2.0])]);
        assert!(set.by_class(1).is_err());
    }

    #[test]
    fn test_label_count_must_match() {
        let set = TrialSet {
            trials: vec![diag(&[1.0])],
            labels: Some(vec![0, 1]),
        };
        assert!(set.validate().is_err());
        assert!(TrialSet::default().by_class(2).is_err());
    }

    #[test]
    fn test_matrix_helpers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("mean.json");
        write_matrix(&path, &diag(&[1.0, 3.0]), false).unwrap();
        assert_eq!(read_matrix(&path).unwrap(), diag(&[1.0, 3.0]));

        let set_path = dir.path().join("set.json");
        write_matrix_set(&set_path, vec![diag(&[1.0]), diag(&[2.0])], true).unwrap();
        assert_eq!(read_matrix_set(&set_path).unwrap().matrices.len(), 2);
        assert!(read_class_dataset(&set_path).is_err());
    }
}
