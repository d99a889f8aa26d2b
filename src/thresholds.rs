//! Decision threshold selection
//!
//! Two independent strategies:
//! - ROC / Youden's J: maximise TPR - FPR over the ROC curve. Works on true
//!   labels when available, otherwise on pseudo labels obtained by
//!   thresholding the probabilities themselves.
//! - Recall sweep: walk a fixed grid of candidate thresholds and keep the one
//!   with the highest recall. Needs ground truth; without it the strategy is
//!   reported as unavailable rather than failing.

use serde::Serialize;
use tracing::warn;

use crate::error::{ScoreError, ScoreResult};
use crate::models::Threshold;

/// Result of an optional computation that may not apply to a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Availability<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Availability<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Availability::Unavailable(reason.into())
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Availability::Available(v) => Some(v),
            Availability::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }
}

/// One point of an ROC curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    /// Scores >= threshold are predicted positive; the first point uses +inf
    pub threshold: f64,
    pub tpr: f64,
    pub fpr: f64,
}

impl RocPoint {
    pub fn youden_j(&self) -> f64 {
        self.tpr - self.fpr
    }
}

/// ROC curve with thresholds in descending order, starting at (0, 0)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
}

impl RocCurve {
    /// Build the curve; `None` when either class is absent
    pub fn compute(scores: &[f64], labels: &[bool]) -> Option<Self> {
        let positives = labels.iter().filter(|&&l| l).count();
        let negatives = labels.len() - positives;
        if positives == 0 || negatives == 0 || scores.len() != labels.len() {
            return None;
        }

        let mut pairs: Vec<(f64, bool)> = scores.iter().copied().zip(labels.iter().copied()).collect();
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut points = vec![RocPoint {
            threshold: f64::INFINITY,
            tpr: 0.0,
            fpr: 0.0,
        }];
        let (mut tp, mut fp) = (0usize, 0usize);
        for (i, &(score, label)) in pairs.iter().enumerate() {
            if label {
                tp += 1;
            } else {
                fp += 1;
            }
            let last_of_group = pairs.get(i + 1).map_or(true, |next| next.0 != score);
            if last_of_group {
                points.push(RocPoint {
                    threshold: score,
                    tpr: tp as f64 / positives as f64,
                    fpr: fp as f64 / negatives as f64,
                });
            }
        }

        Some(Self { points })
    }

    /// Point with maximal Youden's J; ties go to the lowest threshold
    pub fn best_youden(&self) -> Option<&RocPoint> {
        let mut best: Option<&RocPoint> = None;
        for point in self.points.iter().rev() {
            if best.map_or(true, |b| point.youden_j() > b.youden_j()) {
                best = Some(point);
            }
        }
        best
    }
}

/// Pseudo labels for ROC tuning when ground truth is absent
pub fn pseudo_labels(probabilities: &[f64], cutoff: f64) -> Vec<bool> {
    probabilities.iter().map(|&p| p > cutoff).collect()
}

fn check_inputs(probabilities: &[f64], labels: &[bool]) -> ScoreResult<()> {
    if probabilities.len() != labels.len() {
        return Err(ScoreError::shape(format!(
            "{} probabilities but {} labels",
            probabilities.len(),
            labels.len()
        )));
    }
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
        return Err(ScoreError::shape(format!("non-finite probability {bad}")));
    }
    Ok(())
}

/// Threshold maximising Youden's J on the ROC curve of `labels` vs
/// `probabilities`, clamped to [0, 1].
///
/// The value is an ROC point threshold, so it counts `p >= t` as positive.
/// The [`Scorer`](crate::scorer::Scorer) uses `p > t`, which means a row
/// scoring exactly the suggested value is classified negative there.
///
/// A degenerate curve (one class only, or no input) falls back to the
/// default threshold instead of failing.
pub fn suggest_roc_threshold(probabilities: &[f64], labels: &[bool]) -> ScoreResult<f64> {
    check_inputs(probabilities, labels)?;

    let Some(curve) = RocCurve::compute(probabilities, labels) else {
        warn!("ROC curve is degenerate (single class), using default threshold");
        return Ok(Threshold::DEFAULT.value());
    };
    let best = curve
        .best_youden()
        .map(|p| p.threshold)
        .unwrap_or(Threshold::DEFAULT.value());
    Ok(best.clamp(0.0, 1.0))
}

/// Upper bound on recall sweep candidates
pub const MAX_GRID_POINTS: usize = 100_000;

/// Candidate thresholds for the recall sweep, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdGrid {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Default for ThresholdGrid {
    fn default() -> Self {
        Self {
            start: 0.10,
            end: 0.90,
            step: 0.01,
        }
    }
}

impl ThresholdGrid {
    pub fn new(start: f64, end: f64, step: f64) -> ScoreResult<Self> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(start) || !in_range(end) || start > end {
            return Err(ScoreError::config(format!(
                "threshold grid [{start}, {end}] must lie within [0, 1] with start <= end"
            )));
        }
        if !(step > 0.0) {
            return Err(ScoreError::config(format!(
                "threshold grid step must be positive, got {step}"
            )));
        }
        let steps = (end - start) / step;
        if steps >= MAX_GRID_POINTS as f64 {
            return Err(ScoreError::config(format!(
                "threshold grid step {step} gives more than {MAX_GRID_POINTS} candidates"
            )));
        }
        Ok(Self { start, end, step })
    }

    /// Grid points computed by index so they do not accumulate drift
    pub fn points(&self) -> Vec<f64> {
        let steps = ((self.end - self.start) / self.step + 1e-9).floor() as usize;
        (0..=steps)
            .map(|i| {
                let t = self.start + i as f64 * self.step;
                (t * 1e9).round() / 1e9
            })
            .collect()
    }
}

/// Recall (TP / all actual positives) when predicting `p > threshold`
pub fn recall_at(probabilities: &[f64], labels: &[bool], threshold: f64) -> f64 {
    let mut tp = 0usize;
    let mut positives = 0usize;
    for (&p, &label) in probabilities.iter().zip(labels.iter()) {
        if label {
            positives += 1;
            if p > threshold {
                tp += 1;
            }
        }
    }
    if positives == 0 {
        0.0
    } else {
        tp as f64 / positives as f64
    }
}

/// Best grid point found by the recall sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecallSuggestion {
    pub threshold: f64,
    pub recall: f64,
}

/// Sweep `grid` and return the first threshold reaching maximum recall.
///
/// Unavailable (not an error) when `true_labels` is `None` or holds no
/// positive example.
pub fn suggest_recall_threshold(
    probabilities: &[f64],
    true_labels: Option<&[bool]>,
    grid: &ThresholdGrid,
) -> ScoreResult<Availability<RecallSuggestion>> {
    let Some(labels) = true_labels else {
        return Ok(Availability::unavailable("ground-truth labels not provided"));
    };
    check_inputs(probabilities, labels)?;
    if !labels.iter().any(|&l| l) {
        return Ok(Availability::unavailable("no positive ground-truth labels"));
    }

    let mut best: Option<RecallSuggestion> = None;
    for threshold in grid.points() {
        let recall = recall_at(probabilities, labels, threshold);
        if best.map_or(true, |b| recall > b.recall) {
            best = Some(RecallSuggestion { threshold, recall });
        }
    }

    Ok(match best {
        Some(s) => Availability::Available(s),
        None => Availability::unavailable("threshold grid is empty"),
    })
}

/// Where the ROC labels came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    GroundTruth,
    Pseudo,
}

/// Both suggestions for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSuggestions {
    pub roc_threshold: f64,
    pub roc_labels: LabelSource,
    pub recall: Availability<RecallSuggestion>,
}

/// Threshold selection settings shared by every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSelector {
    pub grid: ThresholdGrid,
    pub pseudo_label_cutoff: f64,
}

impl Default for ThresholdSelector {
    fn default() -> Self {
        Self {
            grid: ThresholdGrid::default(),
            pseudo_label_cutoff: 0.5,
        }
    }
}

impl ThresholdSelector {
    /// Run both strategies; ground truth, when present, drives both
    pub fn suggest(
        &self,
        probabilities: &[f64],
        true_labels: Option<&[bool]>,
    ) -> ScoreResult<ThresholdSuggestions> {
        let (roc_threshold, roc_labels) = match true_labels {
            Some(labels) => (
                suggest_roc_threshold(probabilities, labels)?,
                LabelSource::GroundTruth,
            ),
            None => {
                let pseudo = pseudo_labels(probabilities, self.pseudo_label_cutoff);
                (
                    suggest_roc_threshold(probabilities, &pseudo)?,
                    LabelSource::Pseudo,
                )
            }
        };
        let recall = suggest_recall_threshold(probabilities, true_labels, &self.grid)?;

        Ok(ThresholdSuggestions {
            roc_threshold,
            roc_labels,
            recall,
        })
    }
}
