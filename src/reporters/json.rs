//! JSON reporter
//!
//! Wraps a report with the tool name, version and generation time, then
//! pretty-prints it for piping to jq or further processing.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    tool: &'static str,
    version: &'static str,
    generated_at: String,
    #[serde(flatten)]
    report: &'a T,
}

/// Render any report as pretty JSON
pub fn render<T: Serialize>(report: &T) -> Result<String> {
    let envelope = Envelope {
        tool: "riskgate",
        version: env!("CARGO_PKG_VERSION"),
        generated_at: Utc::now().to_rfc3339(),
        report,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::{test_batch, test_single};

    #[test]
    fn test_batch_json() {
        let json_str = render(&test_batch()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["tool"], "riskgate");
        assert!(parsed["generated_at"].is_string());
        assert_eq!(parsed["summary"]["total"], 2);
        assert_eq!(parsed["summary"]["histogram"].as_array().unwrap().len(), 10);
        assert_eq!(parsed["suggestions"]["roc_labels"], "ground_truth");
        assert_eq!(parsed["suggestions"]["recall"]["status"], "available");
        assert_eq!(parsed["explanation"]["value"]["source"], "linear_contribution");
        let first = &parsed["outcome"]["scored"][0][1];
        assert_eq!(first["decision"], 1);
        assert_eq!(first["features"]["GENDER_Male"], 1.0);
    }

    #[test]
    fn test_single_json() {
        let json_str = render(&test_single()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["prediction"], "Lung Cancer");
        assert_eq!(parsed["threshold"], 0.5);
        let negative = parsed["confidence"]["negative"].as_f64().unwrap();
        let positive = parsed["confidence"]["positive"].as_f64().unwrap();
        assert!((negative + positive - 1.0).abs() < 1e-12);
    }
}
