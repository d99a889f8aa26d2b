//! Core data models for riskgate
//!
//! Raw tabular input flows through the aligner into [`FeatureVector`]s whose
//! column set and order are fixed by a [`FeatureSchema`]; the scorer turns
//! those into [`ScoredRecord`]s.

use indexmap::{IndexMap, IndexSet};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use crate::error::{ScoreError, ScoreResult};

/// A single cell of raw input, as produced by CSV parsing or form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Missing,
}

/// Tokens treated as missing values, compared case-insensitively
const MISSING_TOKENS: &[&str] = &["", "na", "n/a", "nan", "null", "none"];

impl RawValue {
    /// Parse a textual cell into the most specific value it represents
    pub fn parse(cell: &str) -> Self {
        let trimmed = cell.trim();
        let lower = trimmed.to_ascii_lowercase();

        if MISSING_TOKENS.contains(&lower.as_str()) {
            return RawValue::Missing;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return RawValue::Number(n);
            }
            return RawValue::Missing;
        }
        match lower.as_str() {
            "true" => RawValue::Bool(true),
            "false" => RawValue::Bool(false),
            _ => RawValue::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing)
    }

    /// Numeric view: numbers as-is, booleans as 1/0
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Category label used when the value sits in a categorical column
    pub fn category(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Number(n) => Some(format_number(*n)),
            RawValue::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
            RawValue::Missing => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// Column name -> value mapping for one uploaded row or form submission
pub type RawRecord = IndexMap<String, RawValue>;

/// Ordered, duplicate-free list of the feature names a model expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Arc<IndexSet<String>>,
}

impl FeatureSchema {
    /// Build a schema; an empty or duplicated list is a configuration error
    pub fn new<I, S>(names: I) -> ScoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = IndexSet::new();
        for name in names {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(ScoreError::config("expected feature names must not be blank"));
            }
            if !set.insert(name.clone()) {
                return Err(ScoreError::config(format!(
                    "duplicate expected feature '{name}'"
                )));
            }
        }
        if set.is_empty() {
            return Err(ScoreError::config(
                "expected feature list is empty; cannot align input without a target schema",
            ));
        }
        Ok(Self {
            names: Arc::new(set),
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get_index(index).map(String::as_str)
    }

    /// Cheap identity check used before calling a model
    pub fn same_as(&self, other: &FeatureSchema) -> bool {
        Arc::ptr_eq(&self.names, &other.names) || self.names == other.names
    }
}

/// Numeric feature values laid out in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Pair values with a schema; lengths must agree
    pub fn new(schema: FeatureSchema, values: Vec<f64>) -> ScoreResult<Self> {
        if values.len() != schema.len() {
            return Err(ScoreError::shape(format!(
                "feature vector has {} values but schema has {} features",
                values.len(),
                schema.len()
            )));
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.index_of(name).map(|i| self.values[i])
    }

    /// Copy with one value replaced (used for occlusion importance)
    pub fn with_value(&self, index: usize, value: f64) -> Self {
        let mut values = self.values.clone();
        if let Some(slot) = values.get_mut(index) {
            *slot = value;
        }
        Self {
            schema: self.schema.clone(),
            values,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.schema.names().zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Decision threshold in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Threshold(f64);

impl Threshold {
    pub const DEFAULT: Threshold = Threshold(0.5);

    pub fn new(value: f64) -> ScoreResult<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ScoreError::config(format!(
                "threshold {value} is outside [0, 1]"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Strict greater-than: a probability equal to the threshold is negative
    pub fn decide(self, probability: f64) -> Decision {
        if probability > self.0 {
            Decision::Positive
        } else {
            Decision::Negative
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Binary decision produced by applying a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Negative,
    Positive,
}

impl Decision {
    pub fn as_u8(self) -> u8 {
        match self {
            Decision::Negative => 0,
            Decision::Positive => 1,
        }
    }

    pub fn is_positive(self) -> bool {
        self == Decision::Positive
    }
}

impl Serialize for Decision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

/// A feature vector with its probability and thresholded decision
#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecord {
    pub features: FeatureVector,
    pub probability: f64,
    pub decision: Decision,
}

impl ScoredRecord {
    /// Probabilities for (negative, positive), as shown in the confidence bar
    pub fn confidence(&self) -> (f64, f64) {
        (1.0 - self.probability, self.probability)
    }
}

/// Human-facing names for the two outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeLabels {
    pub positive: String,
    pub negative: String,
}

impl Default for OutcomeLabels {
    fn default() -> Self {
        Self {
            positive: "Positive".to_string(),
            negative: "Negative".to_string(),
        }
    }
}

impl OutcomeLabels {
    pub fn label(&self, decision: Decision) -> &str {
        match decision {
            Decision::Positive => &self.positive,
            Decision::Negative => &self.negative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_parse() {
        assert_eq!(RawValue::parse("70"), RawValue::Number(70.0));
        assert_eq!(RawValue::parse(" 2.5 "), RawValue::Number(2.5));
        assert_eq!(RawValue::parse("TRUE"), RawValue::Bool(true));
        assert_eq!(RawValue::parse("Male"), RawValue::Text("Male".into()));
        assert_eq!(RawValue::parse(""), RawValue::Missing);
        assert_eq!(RawValue::parse("NaN"), RawValue::Missing);
        assert_eq!(RawValue::parse("N/A"), RawValue::Missing);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(RawValue::Number(2.0).category().as_deref(), Some("2"));
        assert_eq!(RawValue::Number(2.5).category().as_deref(), Some("2.5"));
        assert_eq!(RawValue::Bool(false).category().as_deref(), Some("False"));
        assert_eq!(RawValue::Missing.category(), None);
    }

    #[test]
    fn test_schema_rejects_empty_and_duplicates() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            FeatureSchema::new(empty),
            Err(ScoreError::Configuration(_))
        ));
        assert!(matches!(
            FeatureSchema::new(["AGE", "AGE"]),
            Err(ScoreError::Configuration(_))
        ));
        let schema = FeatureSchema::new(["AGE", "SMOKING"]).unwrap();
        assert_eq!(schema.index_of("SMOKING"), Some(1));
    }

    #[test]
    fn test_feature_vector_length_checked() {
        let schema = FeatureSchema::new(["A", "B"]).unwrap();
        assert!(matches!(
            FeatureVector::new(schema.clone(), vec![1.0]),
            Err(ScoreError::DataShape(_))
        ));
        let v = FeatureVector::new(schema, vec![1.0, 2.0]).unwrap();
        assert_eq!(v.get("B"), Some(2.0));
        assert_eq!(v.get("C"), None);
    }

    #[test]
    fn test_threshold_strict_greater_than() {
        let t = Threshold::new(0.5).unwrap();
        assert_eq!(t.decide(0.5), Decision::Negative);
        assert_eq!(t.decide(0.5000001), Decision::Positive);
        assert!(Threshold::new(1.2).is_err());
        assert!(Threshold::new(-0.1).is_err());
    }

    #[test]
    fn test_feature_vector_serializes_in_order() {
        let schema = FeatureSchema::new(["Z", "A"]).unwrap();
        let v = FeatureVector::new(schema, vec![1.0, 0.0]).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"Z":1.0,"A":0.0}"#);
    }
}
