//! Init command - write an example riskgate.toml

use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};

use crate::config::{write_example_config, CONFIG_FILE};

/// Run the init command
pub fn run(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    write_example_config(&path, force)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    println!(
        "{} Created {}",
        style("✓").green(),
        style(path.display()).cyan()
    );
    println!(
        "  Point {} at your model artifact, then run {}",
        style("[model].path").bold(),
        style("riskgate score <file.csv>").bold()
    );
    Ok(())
}
