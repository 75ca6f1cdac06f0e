// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::artifacts::DEFAULT_REJECTION_LIMIT;
use crate::classifier::{Adaptation, ClassifierKind};
use crate::error::{GeometryError, Result};
use crate::geometry::{Convergence, CovarianceSettings, Metric};
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "RIEMANN_GEOMETRY";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub covariance: CovarianceSettings,
    #[serde(default)]
    pub solver: Convergence,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub asr: AsrConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    pub metric: Metric,
    pub adaptation: Adaptation,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AsrConfig {
    pub metric: Metric,
    pub rejection_limit: f64,
    pub max_channel: f64,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Euclidean,
            rejection_limit: DEFAULT_REJECTION_LIMIT,
            max_channel: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./output"),
            pretty: true,
        }
    }
}

impl Config {
    /// TOML file (optional) overlaid by `RIEMANN_GEOMETRY__SECTION__KEY` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| GeometryError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| GeometryError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.solver.max_iterations == 0 {
            return Err(GeometryError::Config(
                "max_iterations must be greater than 0".to_string(),
            ));
        }

        if self.solver.epsilon.is_nan() || self.solver.epsilon <= 0.0 {
            return Err(GeometryError::Config("epsilon must be positive".to_string()));
        }

        if !Validator::in_range(self.covariance.shrinkage, 0.0, 1.0) {
            return Err(GeometryError::Config(format!(
                "shrinkage {} not in [0, 1]",
                self.covariance.shrinkage
            )));
        }

        if !Validator::in_range(self.asr.max_channel, 0.0, 1.0) {
            return Err(GeometryError::Config(format!(
                "asr max_channel {} not in [0, 1]",
                self.asr.max_channel
            )));
        }

        if self.asr.rejection_limit.is_nan() || self.asr.rejection_limit <= 0.0 {
            return Err(GeometryError::Config(
                "asr rejection_limit must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Estimator;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.classifier.kind, ClassifierKind::Mdm);
        assert_eq!(config.asr.metric, Metric::Euclidean);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[covariance]
estimator = "oas"
standardization = "standard_scale"

[solver]
epsilon = 1e-6
max_iterations = 200

[classifier]
kind = "fgmdm_rt_rebias"
metric = "log_euclidean"
adaptation = "unsupervised"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.covariance.estimator, Estimator::Oas);
        assert_eq!(config.solver.max_iterations, 200);
        assert_eq!(config.classifier.kind, ClassifierKind::FgMdmRtRebias);
        assert_eq!(config.classifier.metric, Metric::LogEuclidean);
        assert_eq!(config.classifier.adaptation, Adaptation::Unsupervised);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default_config();
        config.solver.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.covariance.shrinkage = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.asr.max_channel = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.asr.rejection_limit = 0.0;
        assert!(config.validate().is_err());
    }
}
