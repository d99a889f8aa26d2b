//! Batch summary statistics

use serde::Serialize;

use crate::scorer::BatchOutcome;

/// Number of histogram bins over [0, 1]
pub const HISTOGRAM_BINS: usize = 10;

/// One histogram bin; `upper` is exclusive except for the last bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Summary of a scored batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Rows submitted, including failures
    pub total: usize,
    pub positives: usize,
    pub negatives: usize,
    pub failed: usize,
    pub mean_probability: Option<f64>,
    pub histogram: Vec<HistogramBin>,
}

impl BatchSummary {
    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        let mut positives = 0;
        let mut negatives = 0;
        for record in outcome.records() {
            if record.decision.is_positive() {
                positives += 1;
            } else {
                negatives += 1;
            }
        }

        let probs = outcome.probabilities();
        let mean_probability = if probs.is_empty() {
            None
        } else {
            Some(probs.iter().sum::<f64>() / probs.len() as f64)
        };

        Self {
            total: outcome.scored.len() + outcome.failures.len(),
            positives,
            negatives,
            failed: outcome.failures.len(),
            mean_probability,
            histogram: histogram(&probs),
        }
    }

    /// Share of scored rows decided positive
    pub fn positive_rate(&self) -> Option<f64> {
        let scored = self.positives + self.negatives;
        if scored == 0 {
            None
        } else {
            Some(self.positives as f64 / scored as f64)
        }
    }
}

/// Equal-width histogram of probabilities on [0, 1]
pub fn histogram(probabilities: &[f64]) -> Vec<HistogramBin> {
    let width = 1.0 / HISTOGRAM_BINS as f64;
    let mut bins: Vec<HistogramBin> = (0..HISTOGRAM_BINS)
        .map(|i| HistogramBin {
            lower: i as f64 * width,
            upper: if i + 1 == HISTOGRAM_BINS {
                1.0
            } else {
                (i + 1) as f64 * width
            },
            count: 0,
        })
        .collect();

    for &p in probabilities {
        let p = p.clamp(0.0, 1.0);
        let idx = ((p * HISTOGRAM_BINS as f64).floor() as usize).min(HISTOGRAM_BINS - 1);
        bins[idx].count += 1;
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureSchema, FeatureVector, ScoredRecord, Threshold};
    use crate::scorer::RowFailure;

    fn outcome(probs: &[f64]) -> BatchOutcome {
        let schema = FeatureSchema::new(["p"]).unwrap();
        let scored = probs
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                (
                    i,
                    ScoredRecord {
                        features: FeatureVector::new(schema.clone(), vec![p]).unwrap(),
                        probability: p,
                        decision: Threshold::DEFAULT.decide(p),
                    },
                )
            })
            .collect();
        BatchOutcome {
            scored,
            failures: vec![RowFailure {
                row: probs.len(),
                reason: "boom".into(),
            }],
        }
    }

    #[test]
    fn test_counts_and_mean() {
        let summary = BatchSummary::from_outcome(&outcome(&[0.1, 0.4, 0.6, 0.9]));
        assert_eq!(summary.total, 5);
        assert_eq!(summary.positives, 2);
        assert_eq!(summary.negatives, 2);
        assert_eq!(summary.failed, 1);
        assert!((summary.mean_probability.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(summary.positive_rate(), Some(0.5));
    }

    #[test]
    fn test_histogram_edges() {
        let bins = histogram(&[0.0, 0.05, 0.1, 0.95, 1.0]);
        assert_eq!(bins.len(), HISTOGRAM_BINS);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 1);
        // 1.0 lands in the closed last bin
        assert_eq!(bins[9].count, 2);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
    }

    #[test]
    fn test_empty_outcome() {
        let summary = BatchSummary::from_outcome(&BatchOutcome::default());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.mean_probability, None);
        assert_eq!(summary.positive_rate(), None);
    }
}
