// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod pipeline;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use artifacts::{Asr, DEFAULT_REJECTION_LIMIT};
pub use classifier::{
    Adaptation, Bias, Classifier, ClassifierKind, FgMdm, FgMdmRebias, FgMdmRt, FgMdmRtRebias,
    MatrixClassifier, Mdm, MdmRebias, Prediction, Rebiased,
};
pub use config::{AsrConfig, ClassifierConfig, Config, OutputConfig};
pub use error::{GeometryError, Result};
pub use geometry::{
    Convergence, CovarianceSettings, Estimator, Matrix, Metric, RowVector, Standardization,
};
pub use io::{ClassDataset, Envelope, JsonStore, MatrixSet, SingleMatrix, TrialSet};
pub use pipeline::{
    Evaluation, EvaluationReport, EvaluationSettings, EvaluationStats, ProgressTracker,
    TrialOutcome,
};
pub use utils::{OperationTimer, PerformanceMetrics, Validator};
