// file: src/utils/logging.rs
// description: tracing setup and colored terminal lines for geometry results

use crate::classifier::Prediction;
use crate::utils::PerformanceMetrics;
use colored::*;
use std::fmt::Display;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber. `RUST_LOG` overrides the verbosity flag.
pub fn init_logger(colored_output: bool, verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact()
        .with_ansi(colored_output);

    // a subscriber may already be set when embedded in another binary
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// `✓ Saved <what> to <path>`.
pub fn format_saved(what: impl Display, path: &Path) -> String {
    format!("{} Saved {} to {}", "✓".green().bold(), what, path.display().to_string().green())
}

pub fn format_warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg.yellow())
}

/// `label: value` with the label highlighted, used for result summaries.
pub fn format_metric(label: &str, value: impl Display) -> String {
    format!("{} {}", format!("{}:", label).cyan().bold(), value)
}

/// Chosen class of one trial with its probability and distance.
pub fn format_prediction(trial: usize, prediction: &Prediction) -> String {
    let k = prediction.class_id;
    let probability = prediction.probabilities.get(k).copied().unwrap_or(f64::NAN);
    let distance = prediction.distances.get(k).copied().unwrap_or(f64::NAN);
    format_metric(
        &format!("trial {}", trial),
        format!("class {} (p = {:.3}, d = {:.4})", k, probability, distance),
    )
}

/// One confusion matrix row, the diagonal cell in bold.
pub fn format_confusion_row(class: usize, row: &[usize]) -> String {
    let cells: Vec<String> = row
        .iter()
        .enumerate()
        .map(|(j, n)| {
            let cell = format!("{:>5}", n);
            if j == class { cell.bold().to_string() } else { cell }
        })
        .collect();
    format_metric(&format!("class {}", class), cells.join(" "))
}

pub fn format_throughput(metrics: &PerformanceMetrics) -> String {
    format!("{} {}", "ℹ".blue().bold(), metrics.format())
}
