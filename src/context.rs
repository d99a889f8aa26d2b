//! Scoring context and request flows
//!
//! A [`ScoringContext`] is built once at startup from configuration and then
//! only read. Every request gets its own aligned vectors, outcome and
//! report; the loaded model is shared behind an [`Arc`].

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::align::FeatureAligner;
use crate::classifier::{explain, Explanation, FeatureImportance, LoadedModel, ModelCapability};
use crate::config::AppConfig;
use crate::error::{ScoreError, ScoreResult};
use crate::ingest::Upload;
use crate::models::{OutcomeLabels, RawRecord, ScoredRecord, Threshold};
use crate::scorer::{BatchOutcome, Scorer};
use crate::summary::BatchSummary;
use crate::thresholds::{Availability, ThresholdSelector, ThresholdSuggestions};

/// Everything a request needs, fixed after construction
pub struct ScoringContext {
    model: Arc<LoadedModel>,
    aligner: FeatureAligner,
    threshold: Threshold,
    labels: OutcomeLabels,
    selector: ThresholdSelector,
    importance: Vec<FeatureImportance>,
}

/// Result of scoring an uploaded batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub threshold: Threshold,
    pub labels: OutcomeLabels,
    pub capability: ModelCapability,
    pub summary: BatchSummary,
    pub outcome: BatchOutcome,
    pub suggestions: ThresholdSuggestions,
    pub explanation: Availability<Explanation>,
}

/// Negative/positive probabilities for one prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confidence {
    pub negative: f64,
    pub positive: f64,
}

/// Result of a single form-style prediction
#[derive(Debug, Clone, Serialize)]
pub struct SingleReport {
    pub threshold: Threshold,
    pub labels: OutcomeLabels,
    pub prediction: String,
    pub record: ScoredRecord,
    pub confidence: Confidence,
}

/// Threshold suggestions for an upload, without the rest of the batch report
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdReport {
    pub rows: usize,
    pub scored: usize,
    pub suggestions: ThresholdSuggestions,
}

impl ScoringContext {
    pub fn new(model: Arc<LoadedModel>) -> Self {
        let aligner = FeatureAligner::new(model.schema().clone());
        Self {
            model,
            aligner,
            threshold: Threshold::DEFAULT,
            labels: OutcomeLabels::default(),
            selector: ThresholdSelector::default(),
            importance: Vec::new(),
        }
    }

    /// Load the configured model and apply every scoring setting
    pub fn from_config(config: &AppConfig) -> ScoreResult<Self> {
        config.validate()?;
        let model = LoadedModel::load(&config.model_source()?)?;
        Ok(Self::new(Arc::new(model))
            .with_threshold(config.threshold()?)
            .with_labels(config.labels())
            .with_selector(config.selector()?)
            .with_importance(config.importance.clone()))
    }

    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_labels(mut self, labels: OutcomeLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_selector(mut self, selector: ThresholdSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_importance(mut self, importance: Vec<FeatureImportance>) -> Self {
        self.importance = importance;
        self
    }

    pub fn model(&self) -> &LoadedModel {
        &self.model
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn labels(&self) -> &OutcomeLabels {
        &self.labels
    }

    fn scorer(&self) -> Scorer<'_> {
        Scorer::new(self.model.as_ref(), self.model.schema())
    }

    fn score_upload(&self, upload: &Upload, threshold: Threshold) -> ScoreResult<BatchOutcome> {
        if upload.is_empty() {
            return Err(ScoreError::Input("no rows to score".into()));
        }
        if let Some(labels) = &upload.labels {
            if labels.len() != upload.len() {
                return Err(ScoreError::shape(format!(
                    "{} labels for {} rows",
                    labels.len(),
                    upload.len()
                )));
            }
        }
        let rows = self.aligner.align_batch(&upload.records)?;
        let outcome = self.scorer().score_batch(&rows, threshold)?;
        if !outcome.is_complete() {
            warn!(
                "{} of {} rows could not be scored",
                outcome.failures.len(),
                rows.len()
            );
        }
        Ok(outcome)
    }

    fn suggest(&self, upload: &Upload, outcome: &BatchOutcome) -> ScoreResult<ThresholdSuggestions> {
        let probabilities = outcome.probabilities();
        // ground truth restricted to the rows that actually scored
        let labels: Option<Vec<bool>> = upload
            .labels
            .as_ref()
            .map(|all| outcome.scored.iter().map(|(i, _)| all[*i]).collect());
        if labels.is_none() {
            debug!("no ground truth, ROC runs on pseudo labels");
        }
        self.selector.suggest(&probabilities, labels.as_deref())
    }

    /// Batch flow: align, score, summarize, suggest thresholds, explain
    pub fn score_batch(
        &self,
        upload: &Upload,
        threshold: Option<Threshold>,
    ) -> ScoreResult<BatchReport> {
        let threshold = threshold.unwrap_or(self.threshold);
        info!("Scoring {} rows at threshold {}", upload.len(), threshold);

        let outcome = self.score_upload(upload, threshold)?;
        let summary = BatchSummary::from_outcome(&outcome);
        let suggestions = self.suggest(upload, &outcome)?;
        let explanation = match explain(&self.model, &outcome.features(), &self.importance) {
            Ok(e) => e,
            Err(e) => {
                warn!("explanation failed: {}", e);
                Availability::unavailable(e.to_string())
            }
        };

        Ok(BatchReport {
            threshold,
            labels: self.labels.clone(),
            capability: self.model.capability(),
            summary,
            outcome,
            suggestions,
            explanation,
        })
    }

    /// Threshold suggestions only
    pub fn suggest_thresholds(&self, upload: &Upload) -> ScoreResult<ThresholdReport> {
        let outcome = self.score_upload(upload, self.threshold)?;
        let suggestions = self.suggest(upload, &outcome)?;
        Ok(ThresholdReport {
            rows: upload.len(),
            scored: outcome.scored.len(),
            suggestions,
        })
    }

    /// Single flow: one record in, one decision with its confidence out
    pub fn predict(
        &self,
        record: &RawRecord,
        threshold: Option<Threshold>,
    ) -> ScoreResult<SingleReport> {
        let threshold = threshold.unwrap_or(self.threshold);
        let features = self.aligner.align_one(record)?;
        let record = self.scorer().score(&features, threshold)?;
        let (negative, positive) = record.confidence();
        Ok(SingleReport {
            threshold,
            labels: self.labels.clone(),
            prediction: self.labels.label(record.decision).to_string(),
            record,
            confidence: Confidence { negative, positive },
        })
    }
}
