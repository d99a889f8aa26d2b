//! Feature alignment
//!
//! Reshapes raw tabular input into the exact column set and order a model
//! expects:
//!
//! 1. impute missing cells (numeric -> column mean, categorical -> column mode)
//! 2. one-hot expand categorical columns into `COLUMN_category` indicators
//! 3. zero-fill expected features the input does not provide
//! 4. drop anything the schema does not name, in schema order
//!
//! Every observed category gets an indicator and the schema decides which
//! ones survive, so the reference category of a `k-1` encoding is whichever
//! one the model was trained without. A single record encodes the same way
//! as a batch.
//!
//! A column with no present values at all is skipped entirely, so any
//! expected feature derived from it falls through to the zero fill.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::error::{ScoreError, ScoreResult};
use crate::models::{FeatureSchema, FeatureVector, RawRecord, RawValue};

/// Column kind inferred from the present values in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Numeric,
    Categorical,
    /// No row carries a value; imputation is skipped
    Absent,
}

/// Aligns raw records to a fixed feature schema
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    schema: FeatureSchema,
}

impl FeatureAligner {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Align a single record
    pub fn align_one(&self, record: &RawRecord) -> ScoreResult<FeatureVector> {
        let mut aligned = self.align_batch(std::slice::from_ref(record))?;
        aligned
            .pop()
            .ok_or_else(|| ScoreError::shape("alignment produced no rows"))
    }

    /// Align a batch; imputation statistics and categories are batch-wide
    pub fn align_batch(&self, records: &[RawRecord]) -> ScoreResult<Vec<FeatureVector>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let columns = collect_columns(records);
        let mut expanded: HashMap<String, Vec<f64>> = HashMap::new();

        for (name, cells) in &columns {
            match classify(cells) {
                ColumnKind::Absent => {
                    debug!("column '{}' has no values, leaving it to zero fill", name);
                }
                ColumnKind::Numeric => {
                    expanded.insert(name.to_string(), impute_numeric(cells));
                }
                ColumnKind::Categorical => {
                    let filled = impute_categorical(cells);
                    for (indicator, values) in one_hot(name, &filled) {
                        expanded.insert(indicator, values);
                    }
                }
            }
        }

        let missing: Vec<&str> = self
            .schema
            .names()
            .filter(|n| !expanded.contains_key(*n))
            .collect();
        if !missing.is_empty() {
            debug!(
                "zero-filling {} expected feature(s): {}",
                missing.len(),
                missing.join(", ")
            );
        }

        (0..records.len())
            .map(|row| {
                let values = self
                    .schema
                    .names()
                    .map(|n| expanded.get(n).map(|col| col[row]).unwrap_or(0.0))
                    .collect();
                FeatureVector::new(self.schema.clone(), values)
            })
            .collect()
    }
}

/// Convenience entry point: align records against an expected feature list
pub fn align<S: AsRef<str>>(
    records: &[RawRecord],
    expected_features: &[S],
) -> ScoreResult<Vec<FeatureVector>> {
    let schema = FeatureSchema::new(expected_features.iter().map(|s| s.as_ref().to_string()))?;
    FeatureAligner::new(schema).align_batch(records)
}

static MISSING: RawValue = RawValue::Missing;

/// Column-major view of the batch, columns in first-seen order
fn collect_columns(records: &[RawRecord]) -> Vec<(&str, Vec<&RawValue>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                order.push(key.as_str());
            }
        }
    }

    order
        .into_iter()
        .map(|name| {
            let cells = records
                .iter()
                .map(|r| r.get(name).unwrap_or(&MISSING))
                .collect();
            (name, cells)
        })
        .collect()
}

fn classify(cells: &[&RawValue]) -> ColumnKind {
    let mut any_present = false;
    for cell in cells {
        match cell {
            RawValue::Missing => {}
            RawValue::Text(_) => return ColumnKind::Categorical,
            RawValue::Number(_) | RawValue::Bool(_) => any_present = true,
        }
    }
    if any_present {
        ColumnKind::Numeric
    } else {
        ColumnKind::Absent
    }
}

fn impute_numeric(cells: &[&RawValue]) -> Vec<f64> {
    let present: Vec<f64> = cells.iter().filter_map(|c| c.as_f64()).collect();
    let mean = present.iter().sum::<f64>() / present.len().max(1) as f64;
    cells.iter().map(|c| c.as_f64().unwrap_or(mean)).collect()
}

/// Most frequent category; ties go to the lexicographically smallest
fn mode(categories: &[String]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for c in categories {
        *counts.entry(c.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (cat, count) in counts {
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((cat, count));
        }
    }
    best.map(|(cat, _)| cat.to_string())
}

fn impute_categorical(cells: &[&RawValue]) -> Vec<String> {
    let present: Vec<String> = cells.iter().filter_map(|c| c.category()).collect();
    let fill = mode(&present).unwrap_or_default();
    cells
        .iter()
        .map(|c| c.category().unwrap_or_else(|| fill.clone()))
        .collect()
}

fn one_hot(column: &str, values: &[String]) -> Vec<(String, Vec<f64>)> {
    let categories: BTreeSet<&str> = values.iter().map(String::as_str).collect();

    categories
        .into_iter()
        .map(|cat| {
            let indicator = values
                .iter()
                .map(|v| if v == cat { 1.0 } else { 0.0 })
                .collect();
            (format!("{column}_{cat}"), indicator)
        })
        .collect()
}
