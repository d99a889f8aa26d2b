//! Scorer
//!
//! Turns aligned feature vectors into probabilities and thresholded
//! decisions. A model failure on one record never takes down a batch: the
//! batch is tried in one call first, and only if that fails is each record
//! scored on its own so the failing rows can be reported separately.

use serde::Serialize;
use tracing::{debug, warn};

use crate::classifier::ProbabilisticClassifier;
use crate::error::{ModelError, ScoreError, ScoreResult};
use crate::models::{FeatureSchema, FeatureVector, ScoredRecord, Threshold};

/// A record the model could not score
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    /// Zero-based position in the submitted batch
    pub row: usize,
    pub reason: String,
}

/// Scored records plus isolated failures, both in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// `(row index, record)` pairs for every record that scored
    pub scored: Vec<(usize, ScoredRecord)>,
    pub failures: Vec<RowFailure>,
}

impl BatchOutcome {
    pub fn records(&self) -> impl Iterator<Item = &ScoredRecord> {
        self.scored.iter().map(|(_, r)| r)
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.records().map(|r| r.probability).collect()
    }

    pub fn features(&self) -> Vec<FeatureVector> {
        self.records().map(|r| r.features.clone()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies a threshold to a black-box classifier's probabilities
pub struct Scorer<'a> {
    model: &'a dyn ProbabilisticClassifier,
    schema: &'a FeatureSchema,
}

impl<'a> Scorer<'a> {
    pub fn new(model: &'a dyn ProbabilisticClassifier, schema: &'a FeatureSchema) -> Self {
        Self { model, schema }
    }

    fn guard(&self, features: &FeatureVector) -> ScoreResult<()> {
        if !features.schema().same_as(self.schema) {
            return Err(ScoreError::shape(format!(
                "feature vector columns do not match the model's {} expected features",
                self.schema.len()
            )));
        }
        Ok(())
    }

    /// Score one record with a single model call
    pub fn score(&self, features: &FeatureVector, threshold: Threshold) -> ScoreResult<ScoredRecord> {
        self.guard(features)?;
        let probs = self
            .model
            .predict_proba(std::slice::from_ref(features))
            .map_err(|source| ScoreError::ModelInvocation { row: None, source })?;
        let probability = single(probs).map_err(|source| ScoreError::ModelInvocation {
            row: None,
            source,
        })?;
        Ok(ScoredRecord {
            features: features.clone(),
            probability,
            decision: threshold.decide(probability),
        })
    }

    /// Score a batch, isolating records whose model call fails.
    ///
    /// A schema mismatch is a shape error for the whole request, since it
    /// means alignment was skipped.
    pub fn score_batch(
        &self,
        rows: &[FeatureVector],
        threshold: Threshold,
    ) -> ScoreResult<BatchOutcome> {
        for row in rows {
            self.guard(row)?;
        }
        if rows.is_empty() {
            return Ok(BatchOutcome::default());
        }

        match self.model.predict_proba(rows) {
            Ok(probs) if probs.len() == rows.len() => {
                debug!("scored {} rows in one model call", rows.len());
                let scored = rows
                    .iter()
                    .zip(probs)
                    .enumerate()
                    .map(|(i, (features, probability))| {
                        (
                            i,
                            ScoredRecord {
                                features: features.clone(),
                                probability,
                                decision: threshold.decide(probability),
                            },
                        )
                    })
                    .collect();
                Ok(BatchOutcome {
                    scored,
                    failures: Vec::new(),
                })
            }
            Ok(probs) => {
                warn!(
                    "model returned {} probabilities for {} rows, scoring rows individually",
                    probs.len(),
                    rows.len()
                );
                Ok(self.score_each(rows, threshold))
            }
            Err(e) => {
                warn!("batch model call failed ({}), scoring rows individually", e);
                Ok(self.score_each(rows, threshold))
            }
        }
    }

    fn score_each(&self, rows: &[FeatureVector], threshold: Threshold) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (i, row) in rows.iter().enumerate() {
            match self.score(row, threshold) {
                Ok(record) => outcome.scored.push((i, record)),
                Err(e) => {
                    let e = with_row(e, i);
                    warn!("{}", e);
                    outcome.failures.push(RowFailure {
                        row: i,
                        reason: e.to_string(),
                    });
                }
            }
        }
        outcome
    }
}

fn single(probs: Vec<f64>) -> Result<f64, ModelError> {
    match probs.as_slice() {
        [p] => Ok(*p),
        _ => Err(ModelError::OutputCount {
            expected: 1,
            got: probs.len(),
        }),
    }
}

fn with_row(err: ScoreError, row: usize) -> ScoreError {
    match err {
        ScoreError::ModelInvocation { source, .. } => ScoreError::ModelInvocation {
            row: Some(row),
            source,
        },
        other => other,
    }
}
