//! Thresholds command - suggestions without the full batch report

use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;

use super::{emit, load_context};
use crate::ingest::read_csv_path;
use crate::reporters::{render_thresholds, OutputFormat};

pub fn run(config_path: Option<&Path>, csv: &Path, format: &str) -> Result<()> {
    let format = OutputFormat::from_str(format)?;
    let (config, context) = load_context(config_path)?;

    let upload = read_csv_path(csv, config.scoring.label_column.as_deref())
        .with_context(|| format!("Failed to read {}", csv.display()))?;
    let report = context
        .suggest_thresholds(&upload)
        .context("Threshold selection failed")?;

    emit(None, &render_thresholds(&report, format)?)
}
