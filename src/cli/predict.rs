//! Predict command - score one record given on the command line

use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;

use super::{emit, load_context, threshold_override};
use crate::ingest::parse_assignments;
use crate::reporters::{render_single, OutputFormat};

pub fn run(
    config_path: Option<&Path>,
    assignments: &[String],
    threshold: Option<f64>,
    format: &str,
) -> Result<()> {
    let format = OutputFormat::from_str(format)?;
    let threshold = threshold_override(threshold)?;
    let record = parse_assignments(assignments).context("Invalid --set value")?;
    let (_, context) = load_context(config_path)?;

    let report = context
        .predict(&record, threshold)
        .context("Prediction failed")?;
    emit(None, &render_single(&report, format)?)
}
