//! GBDT model wrapper
//!
//! Wraps the `gbdt` crate to provide:
//! - Model loading from gbdt-rs JSON or XGBoost dump files
//! - Batch inference over aligned [`FeatureVector`]s
//!
//! Models are expected to be trained with the `LogLikelyhood` loss (or
//! exported from XGBoost with `binary:logistic`), so predictions are
//! positive-class probabilities.
//!
//! Note: the gbdt crate internally uses `f32` (`ValueType`), while feature
//! vectors store `f64`. Conversions happen transparently at the crate
//! boundary.

use std::path::Path;

use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;

use super::{check_probabilities, check_row_widths, ProbabilisticClassifier};
use crate::error::{ModelError, ScoreError, ScoreResult};
use crate::models::FeatureVector;

#[inline]
fn features_to_f32(features: &FeatureVector) -> Vec<f32> {
    features.values().iter().map(|&v| v as f32).collect()
}

/// Tree ensemble classifier backed by `gbdt::gradient_boost::GBDT`.
///
/// `width` is the number of features the model was trained on; rows of any
/// other width are rejected before they reach the trees.
pub struct GbdtClassifier {
    model: GBDT,
    width: usize,
}

impl GbdtClassifier {
    /// Load a model from the gbdt-rs native JSON format on disk.
    pub fn load(path: &Path, width: usize) -> ScoreResult<Self> {
        let path_str = model_path(path)?;
        let model = GBDT::load_model(path_str)
            .map_err(|e| ScoreError::config(format!("failed to load GBDT model: {e}")))?;
        Ok(Self { model, width })
    }

    /// Load a model from an XGBoost JSON dump file on disk.
    ///
    /// Uses `binary:logistic` as the objective (sigmoid output).
    pub fn load_xgboost(path: &Path, width: usize) -> ScoreResult<Self> {
        let path_str = model_path(path)?;
        let model = GBDT::from_xgboost_dump(path_str, "binary:logistic")
            .map_err(|e| ScoreError::config(format!("failed to load XGBoost dump: {e}")))?;
        Ok(Self { model, width })
    }

    /// Wrap an already-trained `GBDT` instance.
    pub fn from_trained(model: GBDT, width: usize) -> Self {
        Self { model, width }
    }
}

impl ProbabilisticClassifier for GbdtClassifier {
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        check_row_widths(rows, self.width)?;

        let data: Vec<Data> = rows
            .iter()
            .map(|f| Data::new_test_data(features_to_f32(f), None))
            .collect();
        let preds = self.model.predict(&data);

        check_probabilities(rows.len(), preds.into_iter().map(f64::from).collect())
    }
}

fn model_path(path: &Path) -> ScoreResult<&str> {
    path.to_str()
        .ok_or_else(|| ScoreError::config("invalid UTF-8 in model path"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::FeatureSchema;
    use gbdt::config::Config;

    pub(crate) const WIDTH: usize = 4;

    /// Train a small model; label 1.0 = positive, -1.0 = negative.
    pub(crate) fn train_small(rows: &[Vec<f32>], labels: &[f32]) -> GBDT {
        let mut cfg = Config::new();
        cfg.set_feature_size(rows[0].len());
        cfg.set_max_depth(3);
        cfg.set_iterations(10);
        cfg.set_shrinkage(0.3);
        cfg.set_loss("LogLikelyhood");
        cfg.set_debug(false);
        cfg.set_training_optimization_level(2);
        cfg.set_min_leaf_size(1);

        let mut gbdt = GBDT::new(&cfg);
        let mut training: Vec<Data> = rows
            .iter()
            .zip(labels.iter())
            .map(|(r, &l)| Data::new_training_data(r.clone(), 1.0, l, None))
            .collect();
        gbdt.fit(&mut training);
        gbdt
    }

    /// Rows whose first feature separates the two classes.
    pub(crate) fn synthetic() -> (Vec<Vec<f32>>, Vec<f32>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let x = i as f32 / 20.0;
            rows.push(vec![x, 0.5, (i % 3) as f32, 1.0 - x]);
            labels.push(if x > 0.5 { 1.0 } else { -1.0 });
        }
        (rows, labels)
    }

    pub(crate) fn schema() -> FeatureSchema {
        FeatureSchema::new(["x", "constant", "noise", "mirror"]).unwrap()
    }

    pub(crate) fn trained_classifier() -> GbdtClassifier {
        let (rows, labels) = synthetic();
        GbdtClassifier::from_trained(train_small(&rows, &labels), WIDTH)
    }

    fn vector(values: Vec<f64>) -> FeatureVector {
        FeatureVector::new(schema(), values).unwrap()
    }

    #[test]
    fn test_predictions_are_probabilities() {
        let classifier = trained_classifier();
        let rows = vec![vector(vec![0.9, 0.5, 1.0, 0.1]), vector(vec![0.1, 0.5, 2.0, 0.9])];
        let probs = classifier.predict_proba(&rows).unwrap();
        assert_eq!(probs.len(), 2);
        for p in probs {
            assert!((0.0..=1.0).contains(&p), "probability out of range: {p}");
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let classifier = trained_classifier();
        let a = vector(vec![0.8, 0.5, 0.0, 0.2]);
        let b = vector(vec![0.2, 0.5, 1.0, 0.8]);
        let batch = classifier.predict_proba(&[a.clone(), b.clone()]).unwrap();
        let single_a = classifier.predict_proba(&[a]).unwrap()[0];
        let single_b = classifier.predict_proba(&[b]).unwrap()[0];
        assert!((batch[0] - single_a).abs() < 1e-6);
        assert!((batch[1] - single_b).abs() < 1e-6);
    }

    #[test]
    fn test_width_mismatch_is_model_error() {
        let (rows, labels) = synthetic();
        let classifier = GbdtClassifier::from_trained(train_small(&rows, &labels), 6);
        let err = classifier
            .predict_proba(&[vector(vec![0.5, 0.5, 0.5, 0.5])])
            .unwrap_err();
        assert_eq!(err, ModelError::FeatureCount { expected: 6, got: 4 });
    }

    #[test]
    fn test_load_from_disk_matches_trained() {
        let (rows, labels) = synthetic();
        let model = train_small(&rows, &labels);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();

        let original = GbdtClassifier::from_trained(model, WIDTH);
        let loaded = GbdtClassifier::load(&path, WIDTH).unwrap();

        let row = [vector(vec![0.7, 0.5, 2.0, 0.3])];
        let a = original.predict_proba(&row).unwrap()[0];
        let b = loaded.predict_proba(&row).unwrap()[0];
        assert!((a - b).abs() < 1e-6, "loaded model should match: {a} vs {b}");
    }

    #[test]
    fn test_load_missing_file_is_configuration_error() {
        let result = GbdtClassifier::load(Path::new("/nonexistent/model.json"), WIDTH);
        assert!(matches!(result, Err(ScoreError::Configuration(_))));
    }

    #[test]
    fn test_empty_batch() {
        let classifier = trained_classifier();
        assert!(classifier.predict_proba(&[]).unwrap().is_empty());
    }
}
