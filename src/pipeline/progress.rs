// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for classification runs
// reference: uses indicatif for progress bars and tracks classification counts

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStats {
    pub trials: usize,
    pub correct: usize,
    pub failed: usize,
    pub duration_secs: f64,
}

impl EvaluationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Correct predictions over all attempted trials, in percent.
    pub fn accuracy(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        (self.correct as f64 / self.trials as f64) * 100.0
    }

    pub fn trials_per_second(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        self.trials as f64 / self.duration_secs
    }
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    classified: Arc<AtomicUsize>,
    correct: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn with_color(total_trials: usize, colored: bool) -> Self {
        let multi_progress = MultiProgress::new();
        Self::build(multi_progress, total_trials, colored)
    }

    /// Tracker that draws nothing.
    pub fn hidden(total_trials: usize) -> Self {
        let multi_progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        Self::build(multi_progress, total_trials, false)
    }

    fn build(multi_progress: MultiProgress, total_trials: usize, colored: bool) -> Self {
        let main_bar = create_progress_bar(&multi_progress, total_trials as u64, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            classified: Arc::new(AtomicUsize::new(0)),
            correct: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_classified(&self, correct: bool) {
        self.classified.fetch_add(1, Ordering::SeqCst);
        if correct {
            self.correct.fetch_add(1, Ordering::SeqCst);
        }
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Classification complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> EvaluationStats {
        let classified = self.classified.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);

        EvaluationStats {
            trials: classified + failed,
            correct: self.correct.load(Ordering::SeqCst),
            failed,
            duration_secs: self.start_time.elapsed().as_secs_f64(),
        }
    }

    fn update_detail_bar(&self) {
        let classified = self.classified.load(Ordering::SeqCst);
        let correct = self.correct.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);

        let message = format!(
            "Correct: {}/{} | Failed: {}",
            correct, classified, failed
        );

        self.detail_bar.set_message(message);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    let (template, chars) = if colored {
        (
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            "█▓▒░",
        )
    } else {
        (
            "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta}) {msg}",
            "=>-",
        )
    };
    match ProgressStyle::default_bar().template(template) {
        Ok(style) => bar.set_style(style.progress_chars(chars)),
        Err(e) => tracing::warn!("Invalid progress bar template: {}", e),
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    if let Ok(style) = ProgressStyle::default_bar().template("{msg}") {
        bar.set_style(style);
    }
    bar
}
