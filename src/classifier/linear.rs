//! Logistic regression classifier
//!
//! `p = sigmoid(intercept + Σ coefficients[i] * x[i])`, stored as JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{check_probabilities, check_row_widths, sigmoid, ProbabilisticClassifier};
use crate::error::{ModelError, ScoreError, ScoreResult};
use crate::models::FeatureVector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearClassifier {
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    /// Load pre-trained weights from a JSON file
    pub fn load(path: &Path) -> ScoreResult<Self> {
        let content = super::read_artifact(path)?;
        serde_json::from_str(&content).map_err(|e| {
            ScoreError::config(format!("invalid linear model JSON {}: {e}", path.display()))
        })
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Weights must line up one-to-one with the expected features
    pub(crate) fn check_width(&self, width: usize) -> ScoreResult<()> {
        if self.coefficients.len() != width {
            return Err(ScoreError::config(format!(
                "linear model has {} coefficients but {} expected features",
                self.coefficients.len(),
                width
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ScoreError::config("linear model weights must be finite"));
        }
        Ok(())
    }

    /// Log-odds before the sigmoid
    pub fn decision_function(&self, row: &FeatureVector) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row.values())
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl ProbabilisticClassifier for LinearClassifier {
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        check_row_widths(rows, self.coefficients.len())?;
        let probs = rows
            .iter()
            .map(|r| sigmoid(self.decision_function(r)))
            .collect();
        check_probabilities(rows.len(), probs)
    }
}
