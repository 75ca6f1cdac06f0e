// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod evaluation;
mod progress;

pub use evaluation::{Evaluation, EvaluationReport, EvaluationSettings, TrialOutcome};
pub use progress::{EvaluationStats, ProgressTracker};
