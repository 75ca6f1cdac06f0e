// file: src/classifier/mod.rs
// description: minimum distance to mean classifiers and their shared interface
// reference: Barachant et al. (2012) multiclass BCI classification by Riemannian geometry

pub mod bias;
pub mod fgmdm;
pub mod fgmdm_rt;
pub mod mdm;
pub mod rebias;

pub use bias::Bias;
pub use fgmdm::FgMdm;
pub use fgmdm_rt::FgMdmRt;
pub use mdm::Mdm;
pub use rebias::{FgMdmRebias, FgMdmRtRebias, MdmRebias, Rebiased};

use crate::error::{GeometryError, Result};
use crate::geometry::{Convergence, Matrix, Metric};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '(' | ')'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// How a classifier updates its class means after each classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adaptation {
    #[default]
    None,
    /// Moves the mean of the expected class.
    Supervised,
    /// Moves the mean of the predicted class.
    Unsupervised,
}

impl fmt::Display for Adaptation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Adaptation::None => "No",
            Adaptation::Supervised => "Supervised",
            Adaptation::Unsupervised => "Unsupervised",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Adaptation {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "no" | "none" => Ok(Adaptation::None),
            "supervised" => Ok(Adaptation::Supervised),
            "unsupervised" => Ok(Adaptation::Unsupervised),
            _ => Err(GeometryError::InvalidInput(format!("unknown adaptation '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClassifierKind {
    #[default]
    #[serde(rename = "mdm")]
    Mdm,
    #[serde(rename = "mdm_rebias")]
    MdmRebias,
    #[serde(rename = "fgmdm_rt")]
    FgMdmRt,
    #[serde(rename = "fgmdm")]
    FgMdm,
    #[serde(rename = "fgmdm_rt_rebias")]
    FgMdmRtRebias,
    #[serde(rename = "fgmdm_rebias")]
    FgMdmRebias,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 6] = [
        ClassifierKind::Mdm,
        ClassifierKind::MdmRebias,
        ClassifierKind::FgMdmRt,
        ClassifierKind::FgMdm,
        ClassifierKind::FgMdmRtRebias,
        ClassifierKind::FgMdmRebias,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::Mdm => "Minimum Distance to Mean (MDM)",
            ClassifierKind::MdmRebias => "Minimum Distance to Mean Rebias (MDM Rebias)",
            ClassifierKind::FgMdmRt => {
                "Minimum Distance to Mean with geodesic filtering (FgMDM) (Real Time adaptation assumed)"
            }
            ClassifierKind::FgMdm => "Minimum Distance to Mean with geodesic filtering (FgMDM)",
            ClassifierKind::FgMdmRtRebias => {
                "Minimum Distance to Mean with geodesic filtering Rebias (FgMDM Rebias) (Real Time adaptation assumed)"
            }
            ClassifierKind::FgMdmRebias => {
                "Minimum Distance to Mean with geodesic filtering Rebias (FgMDM Rebias)"
            }
        }
    }

    /// The kind obtained by wrapping this one in a bias correction.
    pub fn rebiased(self) -> ClassifierKind {
        match self {
            ClassifierKind::Mdm => ClassifierKind::MdmRebias,
            ClassifierKind::FgMdmRt => ClassifierKind::FgMdmRtRebias,
            ClassifierKind::FgMdm => ClassifierKind::FgMdmRebias,
            other => other,
        }
    }

    pub fn is_rebias(&self) -> bool {
        matches!(
            self,
            ClassifierKind::MdmRebias | ClassifierKind::FgMdmRtRebias | ClassifierKind::FgMdmRebias
        )
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ClassifierKind {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        let key = normalize(s);
        let short = match key.as_str() {
            "mdm" => Some(ClassifierKind::Mdm),
            "mdmrebias" => Some(ClassifierKind::MdmRebias),
            "fgmdmrt" => Some(ClassifierKind::FgMdmRt),
            "fgmdm" => Some(ClassifierKind::FgMdm),
            "fgmdmrtrebias" => Some(ClassifierKind::FgMdmRtRebias),
            "fgmdmrebias" => Some(ClassifierKind::FgMdmRebias),
            _ => None,
        };
        short
            .or_else(|| ClassifierKind::ALL.into_iter().find(|k| normalize(k.name()) == key))
            .ok_or_else(|| GeometryError::InvalidInput(format!("unknown classifier '{}'", s)))
    }
}

/// Result of one classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_id: usize,
    /// Distance from the sample to each class mean.
    pub distances: Vec<f64>,
    pub probabilities: Vec<f64>,
}

impl Prediction {
    /// Picks the nearest class. Probabilities are `d_min / d_i` normalized;
    /// when some distances are zero those classes share the whole mass.
    pub fn from_distances(distances: Vec<f64>) -> Result<Self> {
        let (class_id, &d_min) = distances
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| GeometryError::empty("class distances"))?;

        let probabilities = if d_min <= 0.0 {
            let zeros = distances.iter().filter(|d| **d <= 0.0).count() as f64;
            distances
                .iter()
                .map(|d| if *d <= 0.0 { 1.0 / zeros } else { 0.0 })
                .collect()
        } else {
            let raw: Vec<f64> = distances.iter().map(|d| d_min / d).collect();
            let sum: f64 = raw.iter().sum();
            raw.into_iter().map(|p| p / sum).collect()
        };

        Ok(Self {
            class_id,
            distances,
            probabilities,
        })
    }
}

/// Class whose mean should move after classifying a sample, if any.
pub(crate) fn adaptation_target(
    adaptation: Adaptation,
    predicted: usize,
    expected: Option<usize>,
    class_count: usize,
) -> Result<Option<usize>> {
    match adaptation {
        Adaptation::None => Ok(None),
        Adaptation::Unsupervised => Ok(Some(predicted)),
        Adaptation::Supervised => match expected {
            Some(k) if k < class_count => Ok(Some(k)),
            Some(k) => Err(GeometryError::OutOfRange(format!(
                "expected class {} with {} classes",
                k, class_count
            ))),
            None => Err(GeometryError::InvalidInput(
                "supervised adaptation needs the expected class".to_string(),
            )),
        },
    }
}

/// Classifier of square matrices trained from one set of trials per class.
pub trait MatrixClassifier: fmt::Display {
    fn kind(&self) -> ClassifierKind;

    fn class_count(&self) -> usize;

    fn metric(&self) -> Metric;

    fn train(&mut self, datasets: &[Vec<Matrix>]) -> Result<()>;

    fn classify_with(
        &mut self,
        sample: &Matrix,
        adaptation: Adaptation,
        expected: Option<usize>,
    ) -> Result<Prediction>;

    fn classify(&mut self, sample: &Matrix) -> Result<Prediction> {
        self.classify_with(sample, Adaptation::None, None)
    }

    fn is_approx_eq(&self, other: &Self, precision: f64) -> bool
    where
        Self: Sized;
}

/// Any of the provided classifiers, persisted with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Classifier {
    #[serde(rename = "mdm")]
    Mdm(Mdm),
    #[serde(rename = "mdm_rebias")]
    MdmRebias(MdmRebias),
    #[serde(rename = "fgmdm_rt")]
    FgMdmRt(FgMdmRt),
    #[serde(rename = "fgmdm")]
    FgMdm(FgMdm),
    #[serde(rename = "fgmdm_rt_rebias")]
    FgMdmRtRebias(FgMdmRtRebias),
    #[serde(rename = "fgmdm_rebias")]
    FgMdmRebias(FgMdmRebias),
}

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            Classifier::Mdm($c) => $body,
            Classifier::MdmRebias($c) => $body,
            Classifier::FgMdmRt($c) => $body,
            Classifier::FgMdm($c) => $body,
            Classifier::FgMdmRtRebias($c) => $body,
            Classifier::FgMdmRebias($c) => $body,
        }
    };
}

impl Classifier {
    /// Untrained classifier. `convergence` drives every mean it computes.
    pub fn new(kind: ClassifierKind, class_count: usize, metric: Metric, convergence: Convergence) -> Self {
        let mdm = || Mdm::new(class_count, metric).with_convergence(convergence);
        let fgmdm_rt = || FgMdmRt::new(class_count, metric).with_convergence(convergence);
        let fgmdm = || FgMdm::new(class_count, metric).with_convergence(convergence);
        match kind {
            ClassifierKind::Mdm => Classifier::Mdm(mdm()),
            ClassifierKind::MdmRebias => {
                Classifier::MdmRebias(Rebiased::from_inner(mdm()).with_convergence(convergence))
            }
            ClassifierKind::FgMdmRt => Classifier::FgMdmRt(fgmdm_rt()),
            ClassifierKind::FgMdm => Classifier::FgMdm(fgmdm()),
            ClassifierKind::FgMdmRtRebias => {
                Classifier::FgMdmRtRebias(Rebiased::from_inner(fgmdm_rt()).with_convergence(convergence))
            }
            ClassifierKind::FgMdmRebias => {
                Classifier::FgMdmRebias(Rebiased::from_inner(fgmdm()).with_convergence(convergence))
            }
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, c => fmt::Display::fmt(c, f))
    }
}

impl MatrixClassifier for Classifier {
    fn kind(&self) -> ClassifierKind {
        dispatch!(self, c => c.kind())
    }

    fn class_count(&self) -> usize {
        dispatch!(self, c => c.class_count())
    }

    fn metric(&self) -> Metric {
        dispatch!(self, c => c.metric())
    }

    fn train(&mut self, datasets: &[Vec<Matrix>]) -> Result<()> {
        dispatch!(self, c => c.train(datasets))
    }

    fn classify_with(
        &mut self,
        sample: &Matrix,
        adaptation: Adaptation,
        expected: Option<usize>,
    ) -> Result<Prediction> {
        dispatch!(self, c => c.classify_with(sample, adaptation, expected))
    }

    fn is_approx_eq(&self, other: &Self, precision: f64) -> bool {
        match (self, other) {
            (Classifier::Mdm(a), Classifier::Mdm(b)) => a.is_approx_eq(b, precision),
            (Classifier::MdmRebias(a), Classifier::MdmRebias(b)) => a.is_approx_eq(b, precision),
            (Classifier::FgMdmRt(a), Classifier::FgMdmRt(b)) => a.is_approx_eq(b, precision),
            (Classifier::FgMdm(a), Classifier::FgMdm(b)) => a.is_approx_eq(b, precision),
            (Classifier::FgMdmRtRebias(a), Classifier::FgMdmRtRebias(b)) => {
                a.is_approx_eq(b, precision)
            }
            (Classifier::FgMdmRebias(a), Classifier::FgMdmRebias(b)) => a.is_approx_eq(b, precision),
            _ => false,
        }
    }
}
