//! Feature importance for scored batches
//!
//! Strategy follows the capability tag assigned at load time:
//! - tree-based: occlusion (zero one feature, measure mean |Δp|)
//! - linear: mean |coefficient * value|, the log-odds contribution against
//!   the all-zero baseline
//! - anything else: the precomputed table from configuration, if any

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Backend, LoadedModel, ModelCapability, ProbabilisticClassifier};
use crate::error::{ScoreError, ScoreResult};
use crate::models::FeatureVector;
use crate::thresholds::Availability;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    #[serde(alias = "score")]
    pub importance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceSource {
    Occlusion,
    LinearContribution,
    Precomputed,
}

impl fmt::Display for ImportanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportanceSource::Occlusion => write!(f, "occlusion"),
            ImportanceSource::LinearContribution => write!(f, "linear contribution"),
            ImportanceSource::Precomputed => write!(f, "precomputed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub source: ImportanceSource,
    /// Sorted by importance, highest first
    pub importances: Vec<FeatureImportance>,
}

impl Explanation {
    fn new(source: ImportanceSource, mut importances: Vec<FeatureImportance>) -> Self {
        importances.sort_by(|a, b| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| a.feature.cmp(&b.feature))
        });
        Self {
            source,
            importances,
        }
    }

    pub fn top(&self, n: usize) -> &[FeatureImportance] {
        &self.importances[..n.min(self.importances.len())]
    }
}

/// Explain a batch of aligned rows
pub fn explain(
    model: &LoadedModel,
    rows: &[FeatureVector],
    precomputed: &[FeatureImportance],
) -> ScoreResult<Availability<Explanation>> {
    match (model.capability(), model.backend()) {
        (ModelCapability::TreeBased, _) => {
            if rows.is_empty() {
                return Ok(Availability::unavailable("no rows to explain"));
            }
            occlusion(model, rows).map(Availability::Available)
        }
        (ModelCapability::LinearBased, Backend::Linear(linear)) => {
            if rows.is_empty() {
                return Ok(Availability::unavailable("no rows to explain"));
            }
            Ok(Availability::Available(linear_contribution(
                model,
                linear.coefficients(),
                rows,
            )))
        }
        _ if !precomputed.is_empty() => Ok(Availability::Available(Explanation::new(
            ImportanceSource::Precomputed,
            precomputed.to_vec(),
        ))),
        _ => Ok(Availability::unavailable(format!(
            "{} model has no built-in explanation and no precomputed importance is configured",
            model.capability()
        ))),
    }
}

fn occlusion(model: &LoadedModel, rows: &[FeatureVector]) -> ScoreResult<Explanation> {
    let invoke = |batch: &[FeatureVector]| {
        model
            .predict_proba(batch)
            .map_err(|source| ScoreError::ModelInvocation { row: None, source })
    };

    let baseline = invoke(rows)?;
    let mut importances = Vec::with_capacity(model.schema().len());
    for (index, feature) in model.schema().names().enumerate() {
        let occluded: Vec<FeatureVector> = rows.iter().map(|r| r.with_value(index, 0.0)).collect();
        let perturbed = invoke(&occluded)?;
        let delta = baseline
            .iter()
            .zip(&perturbed)
            .map(|(a, b)| (a - b).abs())
            .sum::<f64>()
            / rows.len() as f64;
        importances.push(FeatureImportance {
            feature: feature.to_string(),
            importance: delta,
        });
    }
    Ok(Explanation::new(ImportanceSource::Occlusion, importances))
}

fn linear_contribution(
    model: &LoadedModel,
    coefficients: &[f64],
    rows: &[FeatureVector],
) -> Explanation {
    let importances = model
        .schema()
        .names()
        .enumerate()
        .map(|(index, feature)| {
            let weight = coefficients.get(index).copied().unwrap_or(0.0);
            let total: f64 = rows
                .iter()
                .map(|r| (weight * r.values()[index]).abs())
                .sum();
            FeatureImportance {
                feature: feature.to_string(),
                importance: total / rows.len() as f64,
            }
        })
        .collect();
    Explanation::new(ImportanceSource::LinearContribution, importances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::gbdt_model::tests as fixtures;
    use crate::classifier::tests::linear_model;
    use crate::classifier::{GbdtClassifier, ModelBundle};

    #[test]
    fn test_linear_contribution_ranking() {
        let model = linear_model();
        // AGE=70 -> 3.5, GENDER_Male=1 -> 0.5, SMOKING=1 -> 1.5
        let row = FeatureVector::new(model.schema().clone(), vec![70.0, 1.0, 1.0]).unwrap();
        let out = explain(&model, &[row], &[]).unwrap();
        let explanation = out.as_option().unwrap();
        assert_eq!(explanation.source, ImportanceSource::LinearContribution);
        let names: Vec<&str> = explanation.importances.iter().map(|i| i.feature.as_str()).collect();
        assert_eq!(names, vec!["AGE", "SMOKING", "GENDER_Male"]);
        assert!((explanation.importances[0].importance - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_occlusion_for_tree_model() {
        let classifier = GbdtClassifier::from_trained(
            {
                let (rows, labels) = fixtures::synthetic();
                fixtures::train_small(&rows, &labels)
            },
            fixtures::WIDTH,
        );
        let model = LoadedModel::new(Backend::Gbdt(classifier), fixtures::schema());
        let rows: Vec<FeatureVector> = (0..5)
            .map(|i| {
                let x = 0.2 * i as f64;
                FeatureVector::new(fixtures::schema(), vec![x, 0.5, 1.0, 1.0 - x]).unwrap()
            })
            .collect();
        let out = explain(&model, &rows, &[]).unwrap();
        let explanation = out.as_option().unwrap();
        assert_eq!(explanation.source, ImportanceSource::Occlusion);
        assert_eq!(explanation.importances.len(), fixtures::WIDTH);
        assert!(explanation.importances.iter().all(|i| i.importance >= 0.0));
    }

    #[test]
    fn test_unsupported_uses_precomputed() {
        let json = r#"{
            "features": ["A", "B"],
            "model": {"type": "soft_voting", "members": [
                {"name": "lr", "model": {"type": "linear", "intercept": 0.0, "coefficients": [1.0, 1.0]}}
            ]}
        }"#;
        let bundle: ModelBundle = serde_json::from_str(json).unwrap();
        let model = LoadedModel::from_bundle(bundle).unwrap();
        let row = FeatureVector::new(model.schema().clone(), vec![1.0, 1.0]).unwrap();

        let none = explain(&model, &[row.clone()], &[]).unwrap();
        assert!(!none.is_available());

        let table = vec![
            FeatureImportance {
                feature: "B".into(),
                importance: 0.01,
            },
            FeatureImportance {
                feature: "A".into(),
                importance: 0.06,
            },
        ];
        let out = explain(&model, &[row], &table).unwrap();
        let explanation = out.as_option().unwrap();
        assert_eq!(explanation.source, ImportanceSource::Precomputed);
        assert_eq!(explanation.importances[0].feature, "A");
        assert_eq!(explanation.top(1).len(), 1);
    }
}
