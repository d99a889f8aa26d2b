//! CSV ingest
//!
//! Reads an uploaded table into [`RawRecord`]s. A header row is required;
//! cells are typed by [`RawValue::parse`]. When the configured label column
//! is present it is split off as ground truth, provided every row carries a
//! recognizable label.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::error::{ScoreError, ScoreResult};
use crate::models::{RawRecord, RawValue};

/// A parsed upload
#[derive(Debug, Clone, Default)]
pub struct Upload {
    /// Input columns in header order, label column excluded
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
    /// Ground truth, one per record, when the label column is usable
    pub labels: Option<Vec<bool>>,
}

impl Upload {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read a CSV file from disk
pub fn read_csv_path(path: &Path, label_column: Option<&str>) -> ScoreResult<Upload> {
    let file = File::open(path).map_err(|e| {
        ScoreError::Input(format!("cannot open CSV {}: {e}", path.display()))
    })?;
    read_csv(file, label_column)
}

/// Read CSV from any reader
pub fn read_csv<R: Read>(reader: R, label_column: Option<&str>) -> ScoreResult<Upload> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| ScoreError::Input(format!("failed to read CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    check_headers(&headers)?;

    let label_index = label_column.and_then(|name| headers.iter().position(|h| h == name));
    if let (Some(name), None) = (label_column, label_index) {
        debug!("label column '{}' not in upload, ground truth unavailable", name);
    }

    let mut records = Vec::new();
    let mut raw_labels: Vec<String> = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = result.map_err(|e| ScoreError::Input(format!("CSV row {}: {e}", idx + 1)))?;
        let mut record = RawRecord::with_capacity(headers.len());
        for (col, cell) in row.iter().enumerate() {
            if Some(col) == label_index {
                raw_labels.push(cell.to_string());
            } else {
                record.insert(headers[col].clone(), RawValue::parse(cell));
            }
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(ScoreError::Input("CSV has a header but no data rows".into()));
    }

    let labels = label_index.and_then(|_| parse_labels(&raw_labels));
    let columns = headers
        .into_iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != label_index)
        .map(|(_, h)| h)
        .collect();

    debug!(
        "read {} CSV rows (ground truth {})",
        records.len(),
        if labels.is_some() { "present" } else { "absent" }
    );
    Ok(Upload {
        columns,
        records,
        labels,
    })
}

fn check_headers(headers: &[String]) -> ScoreResult<()> {
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(ScoreError::shape("CSV has no header row"));
    }
    if let Some(pos) = headers.iter().position(|h| h.is_empty()) {
        return Err(ScoreError::shape(format!(
            "CSV header column {} is blank",
            pos + 1
        )));
    }
    let mut seen = IndexSet::new();
    for h in headers {
        if !seen.insert(h.as_str()) {
            return Err(ScoreError::shape(format!("CSV header repeats column '{h}'")));
        }
    }
    Ok(())
}

/// Interpret a ground-truth cell
pub fn parse_label(cell: &str) -> Option<bool> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "1.0" | "positive" => Some(true),
        "no" | "n" | "false" | "0" | "0.0" | "negative" => Some(false),
        _ => None,
    }
}

fn parse_labels(cells: &[String]) -> Option<Vec<bool>> {
    let mut labels = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        match parse_label(cell) {
            Some(l) => labels.push(l),
            None => {
                warn!(
                    "unrecognized label '{}' in row {}, treating ground truth as unavailable",
                    cell,
                    i + 1
                );
                return None;
            }
        }
    }
    Some(labels)
}

/// Parse `KEY=VALUE` pairs from the command line into one record
pub fn parse_assignments<S: AsRef<str>>(pairs: &[S]) -> ScoreResult<RawRecord> {
    let mut record = RawRecord::with_capacity(pairs.len());
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| ScoreError::Input(format!("expected KEY=VALUE, got '{pair}'")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ScoreError::Input(format!("missing field name in '{pair}'")));
        }
        if record.insert(key.to_string(), RawValue::parse(value)).is_some() {
            return Err(ScoreError::Input(format!("field '{key}' given more than once")));
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_typed_cells() {
        let data = "AGE,GENDER,SMOKING\n70,Male,1\n,Female,NA\n";
        let upload = read_csv(data.as_bytes(), None).unwrap();
        assert_eq!(upload.columns, vec!["AGE", "GENDER", "SMOKING"]);
        assert_eq!(upload.len(), 2);
        assert_eq!(upload.records[0]["AGE"], RawValue::Number(70.0));
        assert_eq!(upload.records[0]["GENDER"], RawValue::Text("Male".into()));
        assert!(upload.records[1]["AGE"].is_missing());
        assert!(upload.records[1]["SMOKING"].is_missing());
        assert!(upload.labels.is_none());
    }

    #[test]
    fn test_label_column_is_split_off() {
        let data = "AGE,LUNG_CANCER\n70,YES\n40,NO\n";
        let upload = read_csv(data.as_bytes(), Some("LUNG_CANCER")).unwrap();
        assert_eq!(upload.labels, Some(vec![true, false]));
        assert!(!upload.records[0].contains_key("LUNG_CANCER"));
        assert_eq!(upload.columns, vec!["AGE"]);
    }

    #[test]
    fn test_unrecognized_label_drops_ground_truth() {
        let data = "AGE,LUNG_CANCER\n70,YES\n40,maybe\n";
        let upload = read_csv(data.as_bytes(), Some("LUNG_CANCER")).unwrap();
        assert!(upload.labels.is_none());
        assert_eq!(upload.len(), 2);
    }

    #[test]
    fn test_ragged_row_is_input_error() {
        let data = "A,B\n1,2\n3\n";
        let err = read_csv(data.as_bytes(), None).unwrap_err();
        match err {
            ScoreError::Input(msg) => assert!(msg.contains("row 2"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_problems() {
        assert!(matches!(
            read_csv("".as_bytes(), None),
            Err(ScoreError::DataShape(_))
        ));
        assert!(matches!(
            read_csv("A,A\n1,2\n".as_bytes(), None),
            Err(ScoreError::DataShape(_))
        ));
        assert!(matches!(
            read_csv("A,B\n".as_bytes(), None),
            Err(ScoreError::Input(_))
        ));
    }

    #[test]
    fn test_parse_label_values() {
        assert_eq!(parse_label(" Yes "), Some(true));
        assert_eq!(parse_label("positive"), Some(true));
        assert_eq!(parse_label("0"), Some(false));
        assert_eq!(parse_label("N"), Some(false));
        assert_eq!(parse_label(""), None);
    }

    #[test]
    fn test_parse_assignments() {
        let record = parse_assignments(&["AGE=70", "GENDER=Male"]).unwrap();
        assert_eq!(record["AGE"], RawValue::Number(70.0));
        assert_eq!(record["GENDER"], RawValue::Text("Male".into()));
        assert!(parse_assignments(&["AGE"]).is_err());
        assert!(parse_assignments(&["=1"]).is_err());
        assert!(parse_assignments(&["A=1", "A=2"]).is_err());
    }
}
