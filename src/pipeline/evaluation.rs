// file: src/pipeline/evaluation.rs
// description: train a classifier on one dataset and score it trial by trial on another

use super::progress::{EvaluationStats, ProgressTracker};
use crate::classifier::{Adaptation, Classifier, ClassifierKind, MatrixClassifier, Prediction};
use crate::config::Config;
use crate::error::{GeometryError, Result};
use crate::geometry::{Convergence, CovarianceSettings, Matrix, Metric};
use crate::io::{ClassDataset, TrialSet};
use crate::utils::{OperationTimer, PerformanceMetrics};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    pub kind: ClassifierKind,
    pub metric: Metric,
    pub adaptation: Adaptation,
    /// When set, trials are raw signals (channels by samples) turned into
    /// covariance matrices before use.
    pub covariance: Option<CovarianceSettings>,
    /// Stopping rule for every mean the classifier computes.
    pub convergence: Convergence,
    pub show_progress: bool,
    pub colored: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::Mdm,
            metric: Metric::Riemann,
            adaptation: Adaptation::None,
            covariance: None,
            convergence: Convergence::default(),
            show_progress: false,
            colored: false,
        }
    }
}

impl EvaluationSettings {
    pub fn from_config(config: &Config, raw_signals: bool) -> Self {
        Self {
            kind: config.classifier.kind,
            metric: config.classifier.metric,
            adaptation: config.classifier.adaptation,
            covariance: raw_signals.then_some(config.covariance),
            convergence: config.solver,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub index: usize,
    pub expected: Option<usize>,
    pub prediction: Option<Prediction>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub classifier: ClassifierKind,
    pub metric: Metric,
    pub adaptation: Adaptation,
    /// Counts indexed by `[expected][predicted]`, labelled trials only.
    pub confusion: Vec<Vec<usize>>,
    pub stats: EvaluationStats,
    pub outcomes: Vec<TrialOutcome>,
    pub performance: PerformanceMetrics,
}

pub struct Evaluation {
    settings: EvaluationSettings,
}

impl Evaluation {
    pub fn new(settings: EvaluationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    /// Raw signals become covariance matrices, matrices pass through.
    pub fn prepare(&self, trials: &[Matrix]) -> Result<Vec<Matrix>> {
        match &self.settings.covariance {
            Some(settings) => trials.iter().map(|t| settings.estimate(t)).collect(),
            None => Ok(trials.to_vec()),
        }
    }

    pub fn train(&self, train: &ClassDataset) -> Result<Classifier> {
        let classes = train
            .classes
            .iter()
            .map(|trials| self.prepare(trials))
            .collect::<Result<Vec<_>>>()?;

        let mut classifier = Classifier::new(
            self.settings.kind,
            classes.len(),
            self.settings.metric,
            self.settings.convergence,
        );
        classifier.train(&classes)?;
        info!(
            "Trained {} on {} classes ({} trials)",
            self.settings.kind,
            classes.len(),
            train.trial_count()
        );
        Ok(classifier)
    }

    pub fn run(&self, train: &ClassDataset, test: &TrialSet) -> Result<EvaluationReport> {
        self.run_with_model(train, test).map(|(_, report)| report)
    }

    /// Same as [`Evaluation::run`], also returning the classifier after all
    /// adaptation steps.
    pub fn run_with_model(
        &self,
        train: &ClassDataset,
        test: &TrialSet,
    ) -> Result<(Classifier, EvaluationReport)> {
        test.validate()?;
        let adaptation = self.settings.adaptation;
        if adaptation == Adaptation::Supervised && test.labels.is_none() {
            return Err(GeometryError::Validation(
                "supervised adaptation requires labelled test trials".to_string(),
            ));
        }

        let timer = OperationTimer::new("evaluation");
        let mut classifier = self.train(train)?;
        timer.checkpoint("classifier trained");

        let trials = self.prepare(&test.trials)?;
        let class_count = classifier.class_count();
        let tracker = if self.settings.show_progress {
            ProgressTracker::with_color(trials.len(), self.settings.colored)
        } else {
            ProgressTracker::hidden(trials.len())
        };

        let mut confusion = vec![vec![0usize; class_count]; class_count];
        let mut outcomes = Vec::with_capacity(trials.len());
        for (index, trial) in trials.iter().enumerate() {
            let expected = test.labels.as_ref().map(|labels| labels[index]);
            match classifier.classify_with(trial, adaptation, expected) {
                Ok(prediction) => {
                    if let Some(row) = expected.and_then(|e| confusion.get_mut(e)) {
                        row[prediction.class_id] += 1;
                    }
                    tracker.inc_classified(expected == Some(prediction.class_id));
                    outcomes.push(TrialOutcome {
                        index,
                        expected,
                        prediction: Some(prediction),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("Trial {} failed: {}", index, e);
                    tracker.inc_failed();
                    outcomes.push(TrialOutcome {
                        index,
                        expected,
                        prediction: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        tracker.finish();

        let stats = tracker.get_stats();
        let performance = timer.finish_with_count(trials.len(), "trials");
        if test.labels.is_some() {
            info!(
                "Accuracy {:.2}% ({} of {}, {} failed)",
                stats.accuracy(),
                stats.correct,
                stats.trials,
                stats.failed
            );
        }

        let report = EvaluationReport {
            classifier: self.settings.kind,
            metric: self.settings.metric,
            adaptation,
            confusion,
            stats,
            outcomes,
            performance,
        };
        Ok((classifier, report))
    }
}
