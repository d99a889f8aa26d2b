//! `riskgate.toml` sections
//!
//! ```toml
//! [model]
//! path = "model.json"
//! format = "bundle"            # bundle | gbdt | xgboost | linear
//! # features_path = "features.json"
//!
//! [scoring]
//! threshold = 0.5
//! label_column = "LUNG_CANCER"
//! positive_label = "Lung Cancer"
//! negative_label = "No Lung Cancer"
//!
//! [thresholds]
//! grid_start = 0.10
//! grid_end = 0.90
//! grid_step = 0.01
//! pseudo_label_cutoff = 0.5
//!
//! [[importance]]
//! feature = "SYMPTOM_SCORE"
//! score = 0.0629
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classifier::{FeatureImportance, ModelFormat, ModelSource};
use crate::error::{ScoreError, ScoreResult};
use crate::models::{OutcomeLabels, Threshold};
use crate::thresholds::{ThresholdGrid, ThresholdSelector};

/// Environment variable overriding `[model].path`
pub const ENV_MODEL: &str = "RISKGATE_MODEL";
/// Environment variable overriding `[scoring].threshold`
pub const ENV_THRESHOLD: &str = "RISKGATE_THRESHOLD";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub scoring: ScoringSection,
    #[serde(default)]
    pub thresholds: ThresholdSection,
    /// Precomputed importance, shown when the model has no built-in explanation
    #[serde(default)]
    pub importance: Vec<FeatureImportance>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSection {
    pub path: Option<PathBuf>,
    pub format: ModelFormat,
    pub features_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringSection {
    pub threshold: f64,
    /// Ground-truth column split off uploaded CSVs when present
    pub label_column: Option<String>,
    pub positive_label: String,
    pub negative_label: String,
}

impl Default for ScoringSection {
    fn default() -> Self {
        let labels = OutcomeLabels::default();
        Self {
            threshold: Threshold::DEFAULT.value(),
            label_column: None,
            positive_label: labels.positive,
            negative_label: labels.negative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdSection {
    pub grid_start: f64,
    pub grid_end: f64,
    pub grid_step: f64,
    pub pseudo_label_cutoff: f64,
}

impl Default for ThresholdSection {
    fn default() -> Self {
        let selector = ThresholdSelector::default();
        Self {
            grid_start: selector.grid.start,
            grid_end: selector.grid.end,
            grid_step: selector.grid.step,
            pseudo_label_cutoff: selector.pseudo_label_cutoff,
        }
    }
}

impl AppConfig {
    /// Parse TOML text
    pub fn from_toml(content: &str) -> ScoreResult<Self> {
        toml::from_str(content).map_err(|e| ScoreError::config(format!("invalid config: {e}")))
    }

    /// Make relative model paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(path) = self.model.path.as_mut() {
            resolve(path);
        }
        if let Some(path) = self.model.features_path.as_mut() {
            resolve(path);
        }
    }

    /// Apply `RISKGATE_*` overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> ScoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.model.path = Some(PathBuf::from(model));
        }
        if let Some(raw) = lookup(ENV_THRESHOLD).filter(|v| !v.trim().is_empty()) {
            self.scoring.threshold = raw.trim().parse().map_err(|_| {
                ScoreError::config(format!("{ENV_THRESHOLD}='{raw}' is not a number"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ScoreResult<()> {
        self.threshold()?;
        self.selector()?;
        if let Some(entry) = self.importance.iter().find(|i| !i.importance.is_finite()) {
            return Err(ScoreError::config(format!(
                "importance for '{}' must be finite",
                entry.feature
            )));
        }
        if self.scoring.label_column.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ScoreError::config("label_column must not be blank"));
        }
        Ok(())
    }

    pub fn threshold(&self) -> ScoreResult<Threshold> {
        Threshold::new(self.scoring.threshold)
    }

    pub fn selector(&self) -> ScoreResult<ThresholdSelector> {
        let t = &self.thresholds;
        let grid = ThresholdGrid::new(t.grid_start, t.grid_end, t.grid_step)?;
        if !(0.0..=1.0).contains(&t.pseudo_label_cutoff) {
            return Err(ScoreError::config(format!(
                "pseudo_label_cutoff {} is outside [0, 1]",
                t.pseudo_label_cutoff
            )));
        }
        Ok(ThresholdSelector {
            grid,
            pseudo_label_cutoff: t.pseudo_label_cutoff,
        })
    }

    pub fn labels(&self) -> OutcomeLabels {
        OutcomeLabels {
            positive: self.scoring.positive_label.clone(),
            negative: self.scoring.negative_label.clone(),
        }
    }

    pub fn model_source(&self) -> ScoreResult<ModelSource> {
        let path = self.model.path.clone().ok_or_else(|| {
            ScoreError::config(format!(
                "no model configured; set [model].path in riskgate.toml or {ENV_MODEL}"
            ))
        })?;
        Ok(ModelSource {
            path,
            format: self.model.format,
            features_path: self.model.features_path.clone(),
        })
    }
}
