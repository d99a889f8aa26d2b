//! Soft-voting ensemble
//!
//! Weighted mean of member probabilities, like a voting classifier with
//! `voting="soft"` over e.g. a random forest, a logistic regression and an SVC.

use super::{check_probabilities, Backend, ProbabilisticClassifier};
use crate::error::{ModelError, ScoreError, ScoreResult};
use crate::models::FeatureVector;

pub struct EnsembleMember {
    pub name: String,
    pub weight: f64,
    pub model: Backend,
}

pub struct VotingEnsemble {
    members: Vec<EnsembleMember>,
    total_weight: f64,
}

impl VotingEnsemble {
    pub fn new(members: Vec<EnsembleMember>) -> ScoreResult<Self> {
        if members.is_empty() {
            return Err(ScoreError::config("voting ensemble has no members"));
        }
        if let Some(m) = members
            .iter()
            .find(|m| !m.weight.is_finite() || m.weight < 0.0)
        {
            return Err(ScoreError::config(format!(
                "ensemble member '{}' has invalid weight {}",
                m.name, m.weight
            )));
        }
        let total_weight: f64 = members.iter().map(|m| m.weight).sum();
        if total_weight <= 0.0 {
            return Err(ScoreError::config("ensemble weights sum to zero"));
        }
        Ok(Self {
            members,
            total_weight,
        })
    }
}

impl ProbabilisticClassifier for VotingEnsemble {
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        let mut acc = vec![0.0; rows.len()];
        for member in &self.members {
            let probs = member.model.predict_proba(rows).map_err(|e| match e {
                ModelError::Backend(msg) => {
                    ModelError::Backend(format!("member '{}': {msg}", member.name))
                }
                other => other,
            })?;
            let probs = check_probabilities(rows.len(), probs)?;
            for (slot, p) in acc.iter_mut().zip(probs) {
                *slot += member.weight * p;
            }
        }
        check_probabilities(
            rows.len(),
            acc.into_iter().map(|s| s / self.total_weight).collect(),
        )
    }
}
