//! Error taxonomy for the scoring core
//!
//! Aligner and threshold-selector errors are fatal to the current request.
//! Scorer errors carry the failing row so batch callers can isolate them.

use thiserror::Error;

/// Errors raised by a model backend while producing probabilities.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("expected {expected} features per row, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("model produced {got} probabilities for {expected} rows")]
    OutputCount { expected: usize, got: usize },

    #[error("model produced a non-finite probability ({0})")]
    NonFinite(f64),

    #[error("{0}")]
    Backend(String),
}

/// Errors surfaced by the scoring core
#[derive(Error, Debug)]
pub enum ScoreError {
    /// The target schema or configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input does not have the shape an operation requires
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// The underlying model call failed
    #[error("Model invocation failed{}: {source}", row_suffix(.row))]
    ModelInvocation {
        row: Option<usize>,
        #[source]
        source: ModelError,
    },

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScoreError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Self::DataShape(msg.into())
    }
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" for row {r}")).unwrap_or_default()
}

pub type ScoreResult<T> = Result<T, ScoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_model_invocation_keeps_cause() {
        let err = ScoreError::ModelInvocation {
            row: Some(3),
            source: ModelError::FeatureCount { expected: 4, got: 2 },
        };
        assert_eq!(
            err.to_string(),
            "Model invocation failed for row 3: expected 4 features per row, got 2"
        );
        let cause = err.source().expect("cause");
        assert_eq!(cause.to_string(), "expected 4 features per row, got 2");
    }

    #[test]
    fn test_model_invocation_without_row() {
        let err = ScoreError::ModelInvocation {
            row: None,
            source: ModelError::NonFinite(f64::NAN),
        };
        assert!(err.to_string().starts_with("Model invocation failed: "));
    }
}
