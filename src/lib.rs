//! Riskgate - scoring core for pre-trained binary classifiers
//!
//! Raw records go through three steps:
//! - [`align`] reshapes them to the exact feature list a model expects
//! - [`scorer`] calls the model and applies a decision threshold
//! - [`thresholds`] suggests better thresholds from ROC or a recall sweep
//!
//! [`context::ScoringContext`] ties these together for the batch (CSV
//! upload) and single (form input) request flows.

pub mod align;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod models;
pub mod reporters;
pub mod scorer;
pub mod summary;
pub mod thresholds;

pub use align::{align, FeatureAligner};
pub use classifier::{LoadedModel, ModelCapability, ProbabilisticClassifier};
pub use context::ScoringContext;
pub use error::{ModelError, ScoreError, ScoreResult};
pub use models::{Decision, FeatureSchema, FeatureVector, RawRecord, RawValue, ScoredRecord, Threshold};
pub use scorer::Scorer;
pub use thresholds::{suggest_recall_threshold, suggest_roc_threshold, ThresholdSelector};
