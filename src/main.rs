// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use riemann_geometry::io::json::{self, kinds};
use riemann_geometry::utils::logging::{
    format_confusion_row, format_metric, format_prediction, format_saved, format_throughput, format_warning,
};
use riemann_geometry::{
    Adaptation, Asr, ClassDataset, Classifier, ClassifierKind, Config, Estimator, Evaluation,
    EvaluationSettings, JsonStore, Matrix, MatrixClassifier, Metric, OperationTimer, Validator,
    geometry,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "riemann_geometry")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Riemannian geometry toolkit for covariance matrices", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate one covariance matrix per signal (channels by samples)
    Covariance {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        estimator: Option<String>,
    },

    /// Mean of a matrix set
    Mean {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        metric: Option<String>,
    },

    /// Median of a matrix set
    Median {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        metric: Option<String>,
    },

    /// Distance between two matrices
    Distance {
        a: PathBuf,

        b: PathBuf,

        #[arg(short, long)]
        metric: Option<String>,
    },

    /// Point along the geodesic between two matrices
    Geodesic {
        a: PathBuf,

        b: PathBuf,

        #[arg(long, default_value_t = 0.5)]
        alpha: f64,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        metric: Option<String>,
    },

    /// Tangent space vectors of a matrix set, one row per matrix
    Tangent {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        reference: Option<PathBuf>,
    },

    /// Train a classifier on a class dataset
    Train {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        kind: Option<String>,

        #[arg(short, long)]
        metric: Option<String>,

        /// Inputs are raw signals, estimate covariances first
        #[arg(long)]
        raw: bool,
    },

    /// Classify trials with a saved classifier
    Classify {
        model: PathBuf,

        input: PathBuf,

        #[arg(short, long)]
        adaptation: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the adapted classifier back to the model file
        #[arg(long)]
        update_model: bool,

        #[arg(long)]
        raw: bool,
    },

    /// Train on one dataset and score on labelled test trials
    Evaluate {
        train: PathBuf,

        test: PathBuf,

        #[arg(short, long)]
        kind: Option<String>,

        #[arg(short, long)]
        metric: Option<String>,

        #[arg(short, long)]
        adaptation: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        raw: bool,
    },

    /// Calibrate artifact subspace reconstruction on clean windows
    AsrTrain {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        metric: Option<String>,

        #[arg(long)]
        rejection_limit: Option<f64>,
    },

    /// Clean signal windows with a calibrated reconstruction
    AsrProcess {
        model: PathBuf,

        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        max_channel: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    riemann_geometry::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Riemann Geometry Toolkit");
    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Covariance {
            input,
            output,
            estimator,
        } => cmd_covariance(&config, &input, &output, estimator.as_deref()),
        Commands::Mean {
            input,
            output,
            metric,
        } => cmd_mean(&config, &input, &output, metric.as_deref(), false),
        Commands::Median {
            input,
            output,
            metric,
        } => cmd_mean(&config, &input, &output, metric.as_deref(), true),
        Commands::Distance { a, b, metric } => cmd_distance(&config, &a, &b, metric.as_deref()),
        Commands::Geodesic {
            a,
            b,
            alpha,
            output,
            metric,
        } => cmd_geodesic(&config, &a, &b, alpha, &output, metric.as_deref()),
        Commands::Tangent {
            input,
            output,
            reference,
        } => cmd_tangent(&config, &input, &output, reference.as_deref()),
        Commands::Train {
            input,
            output,
            kind,
            metric,
            raw,
        } => cmd_train(&config, &input, &output, kind.as_deref(), metric.as_deref(), raw),
        Commands::Classify {
            model,
            input,
            adaptation,
            output,
            update_model,
            raw,
        } => cmd_classify(
            &config,
            &model,
            &input,
            adaptation.as_deref(),
            output.as_deref(),
            update_model,
            raw,
        ),
        Commands::Evaluate {
            train,
            test,
            kind,
            metric,
            adaptation,
            output,
            raw,
        } => {
            let mut config = config.clone();
            if let Some(kind) = kind.as_deref() {
                config.classifier.kind = parse_kind(kind)?;
            }
            config.classifier.metric = metric_or(metric.as_deref(), config.classifier.metric)?;
            if let Some(adaptation) = adaptation.as_deref() {
                config.classifier.adaptation = parse_adaptation(adaptation)?;
            }
            let settings = EvaluationSettings {
                show_progress: true,
                colored: cli.color,
                ..EvaluationSettings::from_config(&config, raw)
            };
            cmd_evaluate(&config, settings, &train, &test, output.as_deref())
        }
        Commands::AsrTrain {
            input,
            output,
            metric,
            rejection_limit,
        } => cmd_asr_train(&config, &input, &output, metric.as_deref(), rejection_limit),
        Commands::AsrProcess {
            model,
            input,
            output,
            max_channel,
        } => cmd_asr_process(&config, &model, &input, &output, max_channel),
    }
}

fn metric_or(arg: Option<&str>, default: Metric) -> Result<Metric> {
    match arg {
        Some(name) => name
            .parse()
            .with_context(|| format!("Invalid metric: {}", name)),
        None => Ok(default),
    }
}

fn parse_kind(name: &str) -> Result<ClassifierKind> {
    name.parse()
        .with_context(|| format!("Invalid classifier kind: {}", name))
}

fn parse_adaptation(name: &str) -> Result<Adaptation> {
    name.parse()
        .with_context(|| format!("Invalid adaptation: {}", name))
}

fn read_set(path: &Path) -> Result<Vec<Matrix>> {
    Validator::validate_json_extension(path)?;
    let set = json::read_matrix_set(path)
        .with_context(|| format!("Failed to read matrix set {}", path.display()))?;
    Ok(set.matrices)
}

fn read_one(path: &Path) -> Result<Matrix> {
    Validator::validate_json_extension(path)?;
    json::read_matrix(path).with_context(|| format!("Failed to read matrix {}", path.display()))
}

fn cmd_covariance(config: &Config, input: &Path, output: &Path, estimator: Option<&str>) -> Result<()> {
    let mut settings = config.covariance;
    if let Some(name) = estimator {
        settings.estimator = name
            .parse::<Estimator>()
            .with_context(|| format!("Invalid estimator: {}", name))?;
    }
    info!(
        "Estimating covariances with {} ({} standardization)",
        settings.estimator, settings.standardization
    );

    let signals = read_set(input)?;
    let timer = OperationTimer::new("covariance");
    let covs = signals
        .iter()
        .map(|s| settings.estimate(s))
        .collect::<riemann_geometry::Result<Vec<_>>>()
        .context("Covariance estimation failed")?;
    let metrics = timer.finish_with_count(covs.len(), "signals");

    json::write_matrix_set(output, covs, config.output.pretty)?;
    println!("{}", format_saved(format!("{} covariances", metrics.count), output));
    println!("{}", format_throughput(&metrics));
    Ok(())
}

fn cmd_mean(config: &Config, input: &Path, output: &Path, metric: Option<&str>, median: bool) -> Result<()> {
    let metric = metric_or(metric, config.classifier.metric)?;
    let matrices = read_set(input)?;
    let label = if median { "median" } else { "mean" };
    info!("Computing {} {} of {} matrices", metric, label, matrices.len());

    let result = if median {
        geometry::median_with(&matrices, metric, &config.solver)
    } else {
        geometry::mean_with(&matrices, metric, &config.solver)
    }
    .with_context(|| format!("Failed to compute the {}", label))?;

    json::write_matrix(output, &result, config.output.pretty)?;
    println!("{}", format_saved(label, output));
    Ok(())
}

fn cmd_distance(config: &Config, a: &Path, b: &Path, metric: Option<&str>) -> Result<()> {
    let metric = metric_or(metric, config.classifier.metric)?;
    let d = geometry::distance(&read_one(a)?, &read_one(b)?, metric).context("Distance failed")?;
    println!("{}", format_metric(&format!("{} distance", metric), d));
    Ok(())
}

fn cmd_geodesic(
    config: &Config,
    a: &Path,
    b: &Path,
    alpha: f64,
    output: &Path,
    metric: Option<&str>,
) -> Result<()> {
    let metric = metric_or(metric, config.classifier.metric)?;
    let point = geometry::geodesic(&read_one(a)?, &read_one(b)?, metric, alpha)
        .context("Geodesic failed")?;
    json::write_matrix(output, &point, config.output.pretty)?;
    println!("{}", format_saved("geodesic point", output));
    Ok(())
}

fn cmd_tangent(config: &Config, input: &Path, output: &Path, reference: Option<&Path>) -> Result<()> {
    let matrices = read_set(input)?;
    let reference = reference.map(read_one).transpose()?;
    let features = geometry::featurization::tangent_space_rows(&matrices, reference.as_ref())
        .context("Tangent space mapping failed")?;
    json::write_matrix(output, &features, config.output.pretty)?;
    println!(
        "{}",
        format_saved(format!("{}x{} features", features.nrows(), features.ncols()), output)
    );
    Ok(())
}

fn load_dataset(path: &Path) -> Result<ClassDataset> {
    Validator::validate_json_extension(path)?;
    json::read_class_dataset(path).with_context(|| format!("Failed to read dataset {}", path.display()))
}

fn cmd_train(
    config: &Config,
    input: &Path,
    output: &Path,
    kind: Option<&str>,
    metric: Option<&str>,
    raw: bool,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(kind) = kind {
        config.classifier.kind = parse_kind(kind)?;
    }
    config.classifier.metric = metric_or(metric, config.classifier.metric)?;

    let dataset = load_dataset(input)?;
    let evaluation = Evaluation::new(EvaluationSettings::from_config(&config, raw));
    let classifier = evaluation.train(&dataset).context("Training failed")?;

    json::save_to(output, kinds::CLASSIFIER, &classifier, config.output.pretty)?;
    println!("{}", format_saved(classifier.kind(), output));
    Ok(())
}

fn cmd_classify(
    config: &Config,
    model: &Path,
    input: &Path,
    adaptation: Option<&str>,
    output: Option<&Path>,
    update_model: bool,
    raw: bool,
) -> Result<()> {
    let adaptation = match adaptation {
        Some(name) => parse_adaptation(name)?,
        None => config.classifier.adaptation,
    };
    let mut classifier: Classifier = JsonStore::load(model, kinds::CLASSIFIER)
        .with_context(|| format!("Failed to load classifier {}", model.display()))?;
    let trials = json::read_trial_set(input)
        .with_context(|| format!("Failed to read trials {}", input.display()))?;
    let covs = if raw {
        trials
            .trials
            .iter()
            .map(|t| config.covariance.estimate(t))
            .collect::<riemann_geometry::Result<Vec<_>>>()?
    } else {
        trials.trials.clone()
    };

    info!("Classifying {} trials with {} ({} adaptation)", covs.len(), classifier.kind(), adaptation);
    let mut predictions = Vec::with_capacity(covs.len());
    for (i, cov) in covs.iter().enumerate() {
        let expected = trials.labels.as_ref().map(|l| l[i]);
        let prediction = classifier
            .classify_with(cov, adaptation, expected)
            .with_context(|| format!("Failed to classify trial {}", i))?;
        println!("{}", format_prediction(i, &prediction));
        predictions.push(prediction);
    }

    if let Some(output) = output {
        json::save_to(output, kinds::PREDICTIONS, &predictions, config.output.pretty)?;
        println!("{}", format_saved("predictions", output));
    }
    if update_model {
        if adaptation == Adaptation::None && !classifier.kind().is_rebias() {
            println!("{}", format_warning("No adaptation requested, model unchanged"));
            return Ok(());
        }
        json::save_to(model, kinds::CLASSIFIER, &classifier, config.output.pretty)?;
    }
    Ok(())
}

fn cmd_evaluate(
    config: &Config,
    settings: EvaluationSettings,
    train: &Path,
    test: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let dataset = load_dataset(train)?;
    let trials = json::read_trial_set(test)
        .with_context(|| format!("Failed to read trials {}", test.display()))?;

    let report = Evaluation::new(settings)
        .run(&dataset, &trials)
        .context("Evaluation failed")?;

    println!("{}", format_metric("Classifier", report.classifier));
    println!("{}", format_metric("Metric", report.metric));
    println!("{}", format_metric("Adaptation", report.adaptation));
    println!("{}", format_metric("Accuracy", format!("{:.2}%", report.stats.accuracy())));
    if report.stats.failed > 0 {
        println!("{}", format_warning(&format!("{} trials failed", report.stats.failed)));
    }
    for (k, row) in report.confusion.iter().enumerate() {
        println!("{}", format_confusion_row(k, row));
    }

    if let Some(output) = output {
        json::save_to(output, kinds::EVALUATION_REPORT, &report, config.output.pretty)?;
        println!("{}", format_saved("report", output));
    }
    Ok(())
}

fn cmd_asr_train(
    config: &Config,
    input: &Path,
    output: &Path,
    metric: Option<&str>,
    rejection_limit: Option<f64>,
) -> Result<()> {
    let metric = metric_or(metric, config.asr.metric)?;
    let rejection_limit = rejection_limit.unwrap_or(config.asr.rejection_limit);
    let windows = read_set(input)?;

    let timer = OperationTimer::new("asr calibration");
    let mut asr = Asr::new(metric);
    asr.set_max_channel(config.asr.max_channel);
    asr.train(&windows, rejection_limit).context("ASR calibration failed")?;
    timer.finish_with_count(windows.len(), "windows");

    json::save_to(output, kinds::ASR, &asr, config.output.pretty)?;
    println!("{}", format_saved("ASR model", output));
    Ok(())
}

fn cmd_asr_process(
    config: &Config,
    model: &Path,
    input: &Path,
    output: &Path,
    max_channel: Option<f64>,
) -> Result<()> {
    let mut asr: Asr = JsonStore::load(model, kinds::ASR)
        .with_context(|| format!("Failed to load ASR model {}", model.display()))?;
    if let Some(max) = max_channel {
        asr.set_max_channel(max);
    }
    let windows = read_set(input)?;

    let timer = OperationTimer::new("asr processing");
    let mut cleaned = Vec::with_capacity(windows.len());
    let mut reconstructed = 0usize;
    for (i, window) in windows.iter().enumerate() {
        cleaned.push(
            asr.process(window)
                .with_context(|| format!("Failed to process window {}", i))?,
        );
        if !asr.is_trivial() {
            reconstructed += 1;
        }
    }
    timer.finish_with_count(windows.len(), "windows");

    json::write_matrix_set(output, cleaned, config.output.pretty)?;
    println!("{}", format_metric("Reconstructed windows", format!("{}/{}", reconstructed, windows.len())));
    println!("{}", format_saved("cleaned windows", output));
    Ok(())
}
