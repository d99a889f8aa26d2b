//! Library-level pipeline tests: align, score, and threshold selection

use riskgate::classifier::ProbabilisticClassifier;
use riskgate::thresholds::{recall_at, ThresholdGrid};
use riskgate::{
    align, suggest_recall_threshold, suggest_roc_threshold, Decision, FeatureAligner,
    FeatureSchema, FeatureVector, ModelError, RawRecord, RawValue, ScoreError, Scorer, Threshold,
};

/// Uses the `p` feature as the positive-class probability
struct Passthrough;

impl ProbabilisticClassifier for Passthrough {
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        Ok(rows.iter().map(|r| r.get("p").unwrap_or(0.0)).collect())
    }
}

fn record(pairs: &[(&str, RawValue)]) -> RawRecord {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_align_scenario() {
    let raw = record(&[("AGE", RawValue::from(70)), ("GENDER", RawValue::from("Male"))]);
    let aligned = align(&[raw], &["AGE", "GENDER_Male", "SMOKING"]).unwrap();
    let values: Vec<(&str, f64)> = aligned[0].iter().collect();
    assert_eq!(
        values,
        vec![("AGE", 70.0), ("GENDER_Male", 1.0), ("SMOKING", 0.0)]
    );
}

#[test]
fn test_missing_expected_features_are_zero_and_order_matches() {
    let expected = ["Z_LAST", "SMOKING", "AGE", "ANXIETY"];
    let records = vec![
        record(&[("AGE", RawValue::from(50)), ("EXTRA", RawValue::from(9))]),
        record(&[("SMOKING", RawValue::from(1)), ("AGE", RawValue::from(60))]),
    ];
    let aligned = align(&records, &expected).unwrap();
    for vector in &aligned {
        let names: Vec<&str> = vector.schema().names().collect();
        assert_eq!(names, expected);
        assert_eq!(vector.get("Z_LAST"), Some(0.0));
        assert_eq!(vector.get("ANXIETY"), Some(0.0));
        assert_eq!(vector.get("EXTRA"), None);
    }
}

#[test]
fn test_align_without_schema_is_configuration_error() {
    let expected: [&str; 0] = [];
    let raw = record(&[("AGE", RawValue::from(70))]);
    assert!(matches!(
        align(&[raw], &expected),
        Err(ScoreError::Configuration(_))
    ));
}

#[test]
fn test_decisions_scenario() {
    let schema = FeatureSchema::new(["p"]).unwrap();
    let aligner = FeatureAligner::new(schema.clone());
    let records: Vec<RawRecord> = [0.1, 0.4, 0.6, 0.9]
        .iter()
        .map(|&p| record(&[("p", RawValue::from(p))]))
        .collect();
    let rows = aligner.align_batch(&records).unwrap();

    let outcome = Scorer::new(&Passthrough, &schema)
        .score_batch(&rows, Threshold::new(0.5).unwrap())
        .unwrap();
    let decisions: Vec<u8> = outcome.records().map(|r| r.decision.as_u8()).collect();
    assert_eq!(decisions, vec![0, 0, 1, 1]);
}

#[test]
fn test_probability_at_threshold_is_negative() {
    let schema = FeatureSchema::new(["p"]).unwrap();
    let row = FeatureVector::new(schema.clone(), vec![0.5]).unwrap();
    let scored = Scorer::new(&Passthrough, &schema)
        .score(&row, Threshold::DEFAULT)
        .unwrap();
    assert_eq!(scored.decision, Decision::Negative);
}

#[test]
fn test_roc_threshold_in_unit_interval() {
    let probs = [0.05, 0.2, 0.35, 0.5, 0.65, 0.8, 0.95];
    let labels = [false, false, true, false, true, true, true];
    let t = suggest_roc_threshold(&probs, &labels).unwrap();
    assert!((0.0..=1.0).contains(&t));

    // Uniform probabilities give a degenerate curve but must not fail
    let uniform = [0.5; 6];
    let pseudo: Vec<bool> = uniform.iter().map(|&p| p > 0.5).collect();
    let t = suggest_roc_threshold(&uniform, &pseudo).unwrap();
    assert!((0.0..=1.0).contains(&t));
}

#[test]
fn test_recall_scenario() {
    let probs = [0.9, 0.3, 0.2, 0.6];
    let labels = [true, true, false, false];
    let grid = ThresholdGrid::default();
    let suggestion = suggest_recall_threshold(&probs, Some(&labels), &grid).unwrap();
    let best = suggestion.as_option().expect("labels present");
    assert_eq!(best.recall, 1.0);
    assert!(best.threshold <= 0.25);
    assert_eq!(best.threshold, 0.10);
    // predictions at 0.25 are [1, 1, 0, 1]
    assert_eq!(recall_at(&probs, &labels, 0.25), 1.0);
}

#[test]
fn test_recall_is_maximal_over_grid() {
    let probs = [0.12, 0.33, 0.47, 0.58, 0.61, 0.77, 0.84, 0.93];
    let labels = [false, true, false, true, true, false, true, true];
    let grid = ThresholdGrid::default();
    let suggestion = suggest_recall_threshold(&probs, Some(&labels), &grid).unwrap();
    let best = suggestion.as_option().unwrap();
    for t in grid.points() {
        assert!(best.recall >= recall_at(&probs, &labels, t));
    }
    assert_eq!(best.recall, recall_at(&probs, &labels, best.threshold));
}

#[test]
fn test_recall_unavailable_without_labels() {
    let probs = [0.2, 0.8];
    let suggestion = suggest_recall_threshold(&probs, None, &ThresholdGrid::default()).unwrap();
    assert!(!suggestion.is_available());
}
