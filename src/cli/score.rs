//! Score command - batch scoring of a CSV upload

use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;

use super::{emit, load_context, threshold_override};
use crate::ingest::read_csv_path;
use crate::reporters::{render_batch, OutputFormat};

pub fn run(
    config_path: Option<&Path>,
    csv: &Path,
    threshold: Option<f64>,
    format: &str,
    output: Option<&Path>,
    top: usize,
) -> Result<()> {
    let format = OutputFormat::from_str(format)?;
    let threshold = threshold_override(threshold)?;
    let (config, context) = load_context(config_path)?;

    let upload = read_csv_path(csv, config.scoring.label_column.as_deref())
        .with_context(|| format!("Failed to read {}", csv.display()))?;
    let report = context
        .score_batch(&upload, threshold)
        .context("Scoring failed")?;

    emit(output, &render_batch(&report, format, top)?)
}
