//! Output reporters for riskgate results
//!
//! Supports multiple output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON
//! - `csv` - Two-column `Prediction,Probability` export

mod csv_export;
mod json;
mod text;

use anyhow::{anyhow, bail, Result};
use std::str::FromStr;

use crate::context::{BatchReport, SingleReport, ThresholdReport};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: text, json, csv",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Render a batch report; `top` limits the importance entries shown as text
pub fn render_batch(report: &BatchReport, format: OutputFormat, top: usize) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_batch(report, top)),
        OutputFormat::Json => json::render(report),
        OutputFormat::Csv => csv_export::render_batch(report),
    }
}

/// Render a single prediction
pub fn render_single(report: &SingleReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_single(report)),
        OutputFormat::Json => json::render(report),
        OutputFormat::Csv => csv_export::render_single(report),
    }
}

/// Render threshold suggestions; there is no tabular form for these
pub fn render_thresholds(report: &ThresholdReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_thresholds(report)),
        OutputFormat::Json => json::render(report),
        OutputFormat::Csv => bail!("threshold suggestions have no csv form; use text or json"),
    }
}
