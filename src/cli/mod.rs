//! CLI command definitions and handlers

mod init;
mod predict;
mod score;
mod thresholds;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{load_config, AppConfig};
use crate::context::ScoringContext;
use crate::models::Threshold;

/// Parse and validate a decision threshold (0.0-1.0)
fn parse_threshold(s: &str) -> Result<f64, String> {
    let t: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (0.0..=1.0).contains(&t) {
        Ok(t)
    } else {
        Err("threshold must be between 0 and 1".to_string())
    }
}

/// Riskgate - score tabular data with a pre-trained binary classifier
#[derive(Parser, Debug)]
#[command(name = "riskgate")]
#[command(
    version,
    about = "Score CSV uploads or single records with a pre-trained binary classifier",
    long_about = "Riskgate aligns raw tabular input to the feature list a pre-trained model \
expects, scores it against a decision threshold, and suggests better thresholds from \
the ROC curve or a recall sweep.",
    after_help = "\
Examples:
  riskgate init                                  Write an example riskgate.toml
  riskgate score patients.csv                    Score a CSV upload
  riskgate score patients.csv --format csv -o predictions.csv
  riskgate predict --set AGE=70 --set GENDER=Male --set SMOKING=1
  riskgate thresholds labelled.csv               Threshold suggestions only"
)]
pub struct Cli {
    /// Config file (default: ./riskgate.toml, then the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example riskgate.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Score every row of a CSV file
    Score {
        /// CSV file with a header row
        csv: PathBuf,

        /// Decision threshold for this run (default: from config)
        #[arg(long, short = 't', value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Output format: text, json, csv
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json", "csv"])]
        format: String,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Feature importance entries to show
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Score a single record given as KEY=VALUE pairs
    Predict {
        /// Field value, e.g. --set AGE=70 (repeatable)
        #[arg(long = "set", short = 's', value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,

        /// Decision threshold for this prediction (default: from config)
        #[arg(long, short = 't', value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Output format: text, json, csv
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json", "csv"])]
        format: String,
    },

    /// Suggest decision thresholds for a CSV file
    Thresholds {
        /// CSV file with a header row
        csv: PathBuf,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => init::run(config_path, force),
        Commands::Score {
            csv,
            threshold,
            format,
            output,
            top,
        } => score::run(
            config_path,
            &csv,
            threshold,
            &format,
            output.as_deref(),
            top,
        ),
        Commands::Predict {
            set,
            threshold,
            format,
        } => predict::run(config_path, &set, threshold, &format),
        Commands::Thresholds { csv, format } => thresholds::run(config_path, &csv, &format),
    }
}

/// Load configuration and the model it points at
fn load_context(config_path: Option<&Path>) -> Result<(AppConfig, ScoringContext)> {
    let loaded = load_config(config_path).context("Failed to load configuration")?;
    match &loaded.source {
        Some(path) => info!("Using config {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    let context =
        ScoringContext::from_config(&loaded.config).context("Failed to load model")?;
    Ok((loaded.config, context))
}

fn threshold_override(threshold: Option<f64>) -> Result<Option<Threshold>> {
    threshold
        .map(Threshold::new)
        .transpose()
        .context("Invalid threshold")
}

/// Write rendered output to a file, or stdout when no path is given
fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote {}",
                console::style("✓").green(),
                console::style(path.display()).cyan()
            );
        }
        None => print!("{content}"),
    }
    Ok(())
}
