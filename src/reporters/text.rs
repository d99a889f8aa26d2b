//! Text (terminal) reporter with colors and formatting

use console::style;
use std::fmt::Write as _;

use crate::context::{BatchReport, SingleReport, ThresholdReport};
use crate::models::{Decision, OutcomeLabels};
use crate::thresholds::{Availability, LabelSource, ThresholdSuggestions};

const RULE: &str = "──────────────────────────────────────";
/// Predictions listed before the table is cut off
const MAX_ROWS: usize = 20;
const BAR_WIDTH: usize = 30;
/// Width of the PREDICTION column in the predictions table
const LABEL_WIDTH: usize = 21;

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", style(title).bold());
    let _ = writeln!(out, "{}", style(RULE).dim());
}

/// Styled outcome label, padded to `width` before styling so columns line up
fn decision_label(labels: &OutcomeLabels, decision: Decision, width: usize) -> String {
    let text = format!("{:<width$}", labels.label(decision));
    match decision {
        Decision::Positive => style(text).red().bold().to_string(),
        Decision::Negative => style(text).green().to_string(),
    }
}

fn suggestions(out: &mut String, s: &ThresholdSuggestions) {
    let _ = writeln!(out, "\n{}", style("THRESHOLD SUGGESTIONS").bold());
    let basis = match s.roc_labels {
        LabelSource::GroundTruth => "true labels",
        LabelSource::Pseudo => "pseudo labels",
    };
    let _ = writeln!(
        out,
        "  ROC / Youden's J ({basis}): {}",
        style(format!("{:.2}", s.roc_threshold)).cyan()
    );
    match &s.recall {
        Availability::Available(r) => {
            let _ = writeln!(
                out,
                "  Max recall: {} (recall {:.2})",
                style(format!("{:.2}", r.threshold)).cyan(),
                r.recall
            );
        }
        Availability::Unavailable(reason) => {
            let _ = writeln!(out, "  Max recall: {}", style(format!("unavailable, {reason}")).dim());
        }
    }
}

/// Render a scored batch as formatted terminal output
pub fn render_batch(report: &BatchReport, top: usize) -> String {
    let mut out = String::new();
    let s = &report.summary;
    let labels = &report.labels;

    header(&mut out, "Riskgate Batch Scoring");
    let _ = writeln!(
        out,
        "Rows: {}  Scored: {}  Failed: {}  Threshold: {}",
        s.total,
        s.positives + s.negatives,
        s.failed,
        style(report.threshold).bold()
    );
    let _ = write!(
        out,
        "{}: {}  {}: {}",
        labels.positive,
        style(s.positives).red().bold(),
        labels.negative,
        style(s.negatives).green()
    );
    if let Some(mean) = s.mean_probability {
        let _ = write!(out, "  Mean probability: {mean:.3}");
    }
    out.push('\n');

    let _ = writeln!(out, "\n{}", style("PROBABILITY DISTRIBUTION").bold());
    let peak = s.histogram.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    for bin in &s.histogram {
        let len = (bin.count * BAR_WIDTH).div_ceil(peak);
        let _ = writeln!(
            out,
            "  {:.1}-{:.1}  {} {}",
            bin.lower,
            bin.upper,
            style("█".repeat(len)).cyan(),
            bin.count
        );
    }

    suggestions(&mut out, &report.suggestions);

    match &report.explanation {
        Availability::Available(e) => {
            let _ = writeln!(
                out,
                "\n{} {}",
                style("FEATURE IMPORTANCE").bold(),
                style(format!("({})", e.source)).dim()
            );
            for (i, item) in e.top(top).iter().enumerate() {
                let _ = writeln!(out, "  {:>2}. {:<28} {:.4}", i + 1, item.feature, item.importance);
            }
        }
        Availability::Unavailable(reason) => {
            let _ = writeln!(
                out,
                "\n{} {}",
                style("FEATURE IMPORTANCE").bold(),
                style(format!("unavailable, {reason}")).dim()
            );
        }
    }

    let _ = writeln!(out, "\n{}", style("PREDICTIONS").bold());
    let _ = writeln!(out, "{}", style("  ROW   PREDICTION            PROBABILITY").dim());
    for (row, record) in report.outcome.scored.iter().take(MAX_ROWS) {
        let _ = writeln!(
            out,
            "  {:<5} {} {:.4}",
            row + 1,
            decision_label(labels, record.decision, LABEL_WIDTH),
            record.probability
        );
    }
    let hidden = report.outcome.scored.len().saturating_sub(MAX_ROWS);
    if hidden > 0 {
        let _ = writeln!(
            out,
            "  {}",
            style(format!("... and {hidden} more (use --format csv for all rows)")).dim()
        );
    }

    if !report.outcome.failures.is_empty() {
        let _ = writeln!(out, "\n{}", style("FAILED ROWS").yellow().bold());
        for failure in &report.outcome.failures {
            let _ = writeln!(out, "  {:<5} {}", failure.row + 1, failure.reason);
        }
    }

    out
}

/// Render one prediction with its confidence bar
pub fn render_single(report: &SingleReport) -> String {
    let mut out = String::new();
    let labels = &report.labels;
    let c = report.confidence;

    header(&mut out, "Riskgate Prediction");
    let _ = writeln!(
        out,
        "Prediction: {}",
        decision_label(labels, report.record.decision, 0)
    );
    let _ = writeln!(
        out,
        "Probability: {:.4}  (threshold {})",
        c.positive, report.threshold
    );

    let filled = (c.positive * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let _ = writeln!(
        out,
        "Confidence: {} {:.1}% {}{} {:.1}% {}",
        labels.negative,
        c.negative * 100.0,
        style("█".repeat(BAR_WIDTH - filled)).green(),
        style("█".repeat(filled)).red(),
        c.positive * 100.0,
        labels.positive
    );
    out
}

/// Render threshold suggestions only
pub fn render_thresholds(report: &ThresholdReport) -> String {
    let mut out = String::new();
    header(&mut out, "Riskgate Threshold Suggestions");
    let _ = writeln!(out, "Rows: {}  Scored: {}", report.rows, report.scored);
    suggestions(&mut out, &report.suggestions);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::{test_batch, test_single, test_thresholds};

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).into_owned()
    }

    #[test]
    fn test_batch_text() {
        let out = plain(&render_batch(&test_batch(), 2));
        assert!(out.contains("Rows: 2  Scored: 2  Failed: 0  Threshold: 0.50"));
        assert!(out.lines().any(|l| l.starts_with("Lung Cancer: 1  No Lung Cancer: 1")));
        assert!(out.contains("PROBABILITY DISTRIBUTION"));
        assert!(out.contains("ROC / Youden's J (true labels)"));
        assert!(out.contains("FEATURE IMPORTANCE (linear contribution)"));
        assert!(out.contains(" 1. AGE"));
        assert!(!out.contains(" 3. "));
        assert!(!out.contains("FAILED ROWS"));
    }

    #[test]
    fn test_prediction_columns_align_with_colors() {
        console::set_colors_enabled(true);
        let out = plain(&render_batch(&test_batch(), 2));
        let lines: Vec<&str> = out.lines().collect();
        let header = lines
            .iter()
            .position(|l| l.starts_with("  ROW"))
            .unwrap();
        let column = lines[header].find("PROBABILITY").unwrap();
        let rows: Vec<&str> = lines[header + 1..]
            .iter()
            .copied()
            .take_while(|l| !l.trim().is_empty())
            .collect();
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert_eq!(row.rfind(' ').unwrap() + 1, column, "misaligned: {row:?}");
        }
    }

    #[test]
    fn test_single_text() {
        let out = plain(&render_single(&test_single()));
        assert!(out.contains("Prediction: Lung Cancer"));
        assert!(out.contains("(threshold 0.50)"));
        assert!(out.contains("Confidence: No Lung Cancer"));
    }

    #[test]
    fn test_thresholds_text() {
        let out = plain(&render_thresholds(&test_thresholds()));
        assert!(out.contains("Rows: 2  Scored: 2"));
        assert!(out.contains("pseudo labels"));
        assert!(out.contains("Max recall: unavailable"));
    }
}
