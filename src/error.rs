// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use crate::geometry::Metric;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeometryError>;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Size mismatch in {context}: expected {expected:?}, found {found:?}")]
    SizeMismatch {
        context: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Matrix is not square ({rows}x{cols}) in {context}")]
    NotSquare {
        context: String,
        rows: usize,
        cols: usize,
    },

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Metric {metric} is not supported by {operation}")]
    UnsupportedMetric { metric: Metric, operation: String },

    #[error("Covariance estimator not supported: {0}")]
    UnsupportedEstimator(String),

    #[error("Matrix is not positive definite: {0}")]
    NotPositiveDefinite(String),

    #[error("Matrix is singular: {0}")]
    Singular(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Convergence failure: {0}")]
    ConvergenceFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GeometryError {
    pub fn unsupported(metric: Metric, operation: &str) -> Self {
        Self::UnsupportedMetric {
            metric,
            operation: operation.to_string(),
        }
    }

    pub fn empty(context: &str) -> Self {
        Self::EmptyInput(context.to_string())
    }

    pub fn size_mismatch(context: &str, expected: (usize, usize), found: (usize, usize)) -> Self {
        Self::SizeMismatch {
            context: context.to_string(),
            expected,
            found,
        }
    }

    pub fn not_square(context: &str, rows: usize, cols: usize) -> Self {
        Self::NotSquare {
            context: context.to_string(),
            rows,
            cols,
        }
    }
}
