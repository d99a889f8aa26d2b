//! Configuration for riskgate
//!
//! Lookup order, first hit wins:
//! 1. `--config <path>` (must exist)
//! 2. `./riskgate.toml`
//! 3. `<config dir>/riskgate/config.toml`
//! 4. built-in defaults
//!
//! `RISKGATE_MODEL` and `RISKGATE_THRESHOLD` override whatever was loaded.

mod settings;

pub use settings::{
    AppConfig, ModelSection, ScoringSection, ThresholdSection, ENV_MODEL, ENV_THRESHOLD,
};

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ScoreError, ScoreResult};

/// Project-local config file name
pub const CONFIG_FILE: &str = "riskgate.toml";

/// A validated configuration and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

/// `<config dir>/riskgate/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("riskgate").join("config.toml"))
}

/// Load configuration from the standard locations and process environment
pub fn load_config(explicit: Option<&Path>) -> ScoreResult<LoadedConfig> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
    candidates.extend(user_config_path());
    load_with(explicit, &candidates, |key| std::env::var(key).ok())
}

fn load_with<F>(explicit: Option<&Path>, candidates: &[PathBuf], env: F) -> ScoreResult<LoadedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let source = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(ScoreError::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => candidates.iter().find(|p| p.is_file()).cloned(),
    };

    let mut config = match &source {
        Some(path) => {
            debug!("Loading config from {}", path.display());
            read_config(path)?
        }
        None => {
            debug!("No config file found, using defaults");
            AppConfig::default()
        }
    };
    config.apply_env(env)?;
    config.validate()?;

    Ok(LoadedConfig { config, source })
}

/// Read one config file, resolving relative paths against its directory
pub fn read_config(path: &Path) -> ScoreResult<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ScoreError::config(format!("cannot read config {}: {e}", path.display()))
    })?;
    let mut config = AppConfig::from_toml(&content)
        .map_err(|e| ScoreError::config(format!("{}: {e}", path.display())))?;
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    Ok(config)
}

/// Write the example config to `path`; refuses to overwrite unless `force`
pub fn write_example_config(path: &Path, force: bool) -> ScoreResult<()> {
    if path.exists() && !force {
        return Err(ScoreError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, EXAMPLE_CONFIG)?;
    Ok(())
}

pub const EXAMPLE_CONFIG: &str = r#"# riskgate configuration

[model]
# Model artifact. Relative paths resolve against this file's directory.
path = "model.json"
# bundle (JSON with its own feature list) | gbdt | xgboost | linear
format = "bundle"
# Expected features for gbdt/xgboost/linear models: JSON array or one name per line
# features_path = "features.txt"

[scoring]
# Default decision threshold; probability > threshold is positive
threshold = 0.5
# Ground-truth column in uploaded CSVs, used for threshold tuning when present
label_column = "LUNG_CANCER"
positive_label = "Lung Cancer"
negative_label = "No Lung Cancer"

[thresholds]
grid_start = 0.10
grid_end = 0.90
grid_step = 0.01
pseudo_label_cutoff = 0.5

# Shown when the model has no built-in explanation (e.g. a soft-voting ensemble)
[[importance]]
feature = "SYMPTOM_SCORE"
score = 0.0629

[[importance]]
feature = "LIFESTYLE_SCORE"
score = 0.0371

[[importance]]
feature = "SHORTNESS OF BREATH"
score = 0.0274

[[importance]]
feature = "SWALLOWING DIFFICULTY"
score = 0.0258

[[importance]]
feature = "ALCOHOL CONSUMING"
score = 0.0242

[[importance]]
feature = "ANXIETY"
score = 0.0242

[[importance]]
feature = "COUGHING"
score = 0.0210

[[importance]]
feature = "WHEEZING"
score = 0.0194

[[importance]]
feature = "SMOKING"
score = 0.0194

[[importance]]
feature = "GENDER"
score = 0.0113

[[importance]]
feature = "AGE_GROUP_Senior"
score = 0.0097

[[importance]]
feature = "AGE"
score = 0.0097

[[importance]]
feature = "YELLOW_FINGERS"
score = 0.0081

[[importance]]
feature = "PEER_PRESSURE"
score = 0.0081

[[importance]]
feature = "CHEST PAIN"
score = 0.0048

[[importance]]
feature = "LIFESTYLE_RISK"
score = 0.0016

[[importance]]
feature = "ALLERGY"
score = 0.0

[[importance]]
feature = "FATIGUE"
score = 0.0

[[importance]]
feature = "AGE_GROUP_Middle-aged"
score = 0.0

[[importance]]
feature = "CHRONIC DISEASE"
score = -2.2e-17
"#;
