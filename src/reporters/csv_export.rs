//! CSV export: one `Prediction,Probability` row per scored record

use anyhow::{anyhow, Context, Result};

use crate::context::{BatchReport, SingleReport};
use crate::models::{OutcomeLabels, ScoredRecord};

const HEADER: [&str; 2] = ["Prediction", "Probability"];

fn write_rows<'a, I>(labels: &OutcomeLabels, records: I) -> Result<String>
where
    I: IntoIterator<Item = &'a ScoredRecord>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record([
            labels.label(record.decision),
            record.probability.to_string().as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

pub fn render_batch(report: &BatchReport) -> Result<String> {
    write_rows(&report.labels, report.outcome.records())
}

pub fn render_single(report: &SingleReport) -> Result<String> {
    write_rows(&report.labels, [&report.record])
}
