//! Pre-trained probabilistic classifiers
//!
//! The scoring core only ever talks to [`ProbabilisticClassifier`]. Concrete
//! backends are loaded once at startup from a model artifact and never
//! mutated afterwards, so a [`LoadedModel`] can be shared across requests.
//!
//! Each loaded model is tagged with a [`ModelCapability`] at load time;
//! explanation dispatches on that tag instead of inspecting the model later.

pub mod ensemble;
pub mod explain;
pub mod gbdt_model;
pub mod linear;

pub use ensemble::{EnsembleMember, VotingEnsemble};
pub use explain::{explain, Explanation, FeatureImportance, ImportanceSource};
pub use gbdt_model::GbdtClassifier;
pub use linear::LinearClassifier;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ModelError, ScoreError, ScoreResult};
use crate::models::{FeatureSchema, FeatureVector};

/// A black-box binary classifier returning positive-class probabilities
pub trait ProbabilisticClassifier: Send + Sync {
    /// One probability per row, in row order
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError>;
}

/// Which explanation strategy a model supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelCapability {
    TreeBased,
    LinearBased,
    Unsupported,
}

impl fmt::Display for ModelCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelCapability::TreeBased => write!(f, "tree-based"),
            ModelCapability::LinearBased => write!(f, "linear"),
            ModelCapability::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A concrete model backend
pub enum Backend {
    Gbdt(GbdtClassifier),
    Linear(LinearClassifier),
    SoftVoting(VotingEnsemble),
}

impl Backend {
    pub fn capability(&self) -> ModelCapability {
        match self {
            Backend::Gbdt(_) => ModelCapability::TreeBased,
            Backend::Linear(_) => ModelCapability::LinearBased,
            Backend::SoftVoting(_) => ModelCapability::Unsupported,
        }
    }

    fn from_spec(spec: ModelSpec, width: usize) -> ScoreResult<Self> {
        Ok(match spec {
            ModelSpec::Gbdt { model } => Backend::Gbdt(GbdtClassifier::from_trained(model, width)),
            ModelSpec::Linear(linear) => {
                linear.check_width(width)?;
                Backend::Linear(linear)
            }
            ModelSpec::SoftVoting { members } => {
                let members = members
                    .into_iter()
                    .map(|m| {
                        Ok(EnsembleMember {
                            name: m.name,
                            weight: m.weight.unwrap_or(1.0),
                            model: Backend::from_spec(m.model, width)?,
                        })
                    })
                    .collect::<ScoreResult<Vec<_>>>()?;
                Backend::SoftVoting(VotingEnsemble::new(members)?)
            }
        })
    }
}

impl ProbabilisticClassifier for Backend {
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        match self {
            Backend::Gbdt(m) => m.predict_proba(rows),
            Backend::Linear(m) => m.predict_proba(rows),
            Backend::SoftVoting(m) => m.predict_proba(rows),
        }
    }
}

/// Serialized model description inside a bundle
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    Gbdt { model: gbdt::gradient_boost::GBDT },
    Linear(LinearClassifier),
    SoftVoting { members: Vec<MemberSpec> },
}

/// One member of a soft-voting ensemble
#[derive(Serialize, Deserialize)]
pub struct MemberSpec {
    pub name: String,
    #[serde(default)]
    pub weight: Option<f64>,
    pub model: ModelSpec,
}

/// Self-describing artifact: expected features plus the model
#[derive(Serialize, Deserialize)]
pub struct ModelBundle {
    pub features: Vec<String>,
    pub model: ModelSpec,
}

/// On-disk artifact formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// JSON bundle carrying its own feature list
    #[default]
    Bundle,
    /// gbdt-rs native JSON
    Gbdt,
    /// XGBoost JSON dump (binary:logistic)
    Xgboost,
    /// Logistic regression weights as JSON
    Linear,
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFormat::Bundle => write!(f, "bundle"),
            ModelFormat::Gbdt => write!(f, "gbdt"),
            ModelFormat::Xgboost => write!(f, "xgboost"),
            ModelFormat::Linear => write!(f, "linear"),
        }
    }
}

/// Where to find a model artifact and its expected-feature list
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSource {
    pub path: PathBuf,
    pub format: ModelFormat,
    pub features_path: Option<PathBuf>,
}

/// A model ready for scoring: backend, expected schema, capability tag
pub struct LoadedModel {
    backend: Backend,
    schema: FeatureSchema,
    capability: ModelCapability,
}

impl LoadedModel {
    pub fn new(backend: Backend, schema: FeatureSchema) -> Self {
        let capability = backend.capability();
        Self {
            backend,
            schema,
            capability,
        }
    }

    /// Build from an in-memory bundle
    pub fn from_bundle(bundle: ModelBundle) -> ScoreResult<Self> {
        let schema = FeatureSchema::new(bundle.features)?;
        let backend = Backend::from_spec(bundle.model, schema.len())?;
        Ok(Self::new(backend, schema))
    }

    /// Load an artifact from disk
    pub fn load(source: &ModelSource) -> ScoreResult<Self> {
        debug!(
            "Loading {} model from {}",
            source.format,
            source.path.display()
        );
        let model = match source.format {
            ModelFormat::Bundle => {
                let content = read_artifact(&source.path)?;
                let bundle: ModelBundle = serde_json::from_str(&content).map_err(|e| {
                    ScoreError::config(format!(
                        "failed to parse model bundle {}: {e}",
                        source.path.display()
                    ))
                })?;
                Self::from_bundle(bundle)?
            }
            ModelFormat::Gbdt | ModelFormat::Xgboost | ModelFormat::Linear => {
                let features_path = source.features_path.as_deref().ok_or_else(|| {
                    ScoreError::config(format!(
                        "{} models need a features_path listing the expected features",
                        source.format
                    ))
                })?;
                let schema = FeatureSchema::new(read_feature_list(features_path)?)?;
                let width = schema.len();
                let backend = match source.format {
                    ModelFormat::Xgboost => {
                        Backend::Gbdt(GbdtClassifier::load_xgboost(&source.path, width)?)
                    }
                    ModelFormat::Linear => {
                        let linear = LinearClassifier::load(&source.path)?;
                        linear.check_width(width)?;
                        Backend::Linear(linear)
                    }
                    _ => Backend::Gbdt(GbdtClassifier::load(&source.path, width)?),
                };
                Self::new(backend, schema)
            }
        };

        info!(
            "Loaded {} model ({}, {} features)",
            source.format,
            model.capability,
            model.schema.len()
        );
        Ok(model)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn capability(&self) -> ModelCapability {
        self.capability
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }
}

impl ProbabilisticClassifier for LoadedModel {
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        self.backend.predict_proba(rows)
    }
}

fn read_artifact(path: &Path) -> ScoreResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ScoreError::config(format!("cannot read model artifact {}: {e}", path.display()))
    })
}

/// Read an expected-feature list: a JSON array of strings, or one name per line
pub fn read_feature_list(path: &Path) -> ScoreResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ScoreError::config(format!("cannot read feature list {}: {e}", path.display()))
    })?;
    parse_feature_list(&content)
}

fn parse_feature_list(content: &str) -> ScoreResult<Vec<String>> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content)
            .map_err(|e| ScoreError::config(format!("invalid feature list JSON: {e}")));
    }
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Numerically stable logistic function
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Shared output validation for backends
pub(crate) fn check_probabilities(rows: usize, probs: Vec<f64>) -> Result<Vec<f64>, ModelError> {
    if probs.len() != rows {
        return Err(ModelError::OutputCount {
            expected: rows,
            got: probs.len(),
        });
    }
    if let Some(&bad) = probs.iter().find(|p| !p.is_finite()) {
        return Err(ModelError::NonFinite(bad));
    }
    Ok(probs.into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
}

pub(crate) fn check_row_widths(rows: &[FeatureVector], width: usize) -> Result<(), ModelError> {
    match rows.iter().find(|r| r.values().len() != width) {
        Some(row) => Err(ModelError::FeatureCount {
            expected: width,
            got: row.values().len(),
        }),
        None => Ok(()),
    }
}
