//! Common types used throughout batch-export
//!
//! This module contains the record model shared by sources, the serializer
//! and the pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

// ============================================================================
// Field Values
// ============================================================================

/// A single column value read from a source
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Any integer column that fits in 64 bits
    Integer(i64),
    /// Floating point
    Float(f64),
    /// Text
    String(String),
    /// Point in time (normalized to UTC)
    Timestamp(DateTime<Utc>),
    /// Calendar date
    Date(NaiveDate),
    /// A source type with no native mapping (decimal, blob, interval, ...)
    Other {
        /// Lowercase type name used to look up a serialization handler
        type_name: String,
        /// Source-provided textual representation
        raw: String,
    },
}

impl FieldValue {
    /// Type name used for handler lookup and error messages
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Date(_) => "date",
            Self::Other { type_name, .. } => type_name,
        }
    }

    /// Create an `Other` value
    pub fn other(type_name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Other {
            type_name: type_name.into(),
            raw: raw.into(),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

// ============================================================================
// Records
// ============================================================================

/// One row: field name to value, in source column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record with room for `n` fields
    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: Vec::with_capacity(n),
        }
    }

    /// Add a field, replacing the value if the name is already present
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style [`Record::insert`]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// One fetched chunk of records
pub type Page = Vec<Record>;

// ============================================================================
// Batches
// ============================================================================

/// A page plus its position in the run
#[derive(Debug, Clone)]
pub struct Batch {
    /// 0-based position in emission order
    pub ordinal: u64,
    /// Records of this batch
    pub records: Page,
}

impl Batch {
    /// Create a batch
    pub fn new(ordinal: u64, records: Page) -> Self {
        Self { ordinal, records }
    }

    /// Artifact name for this batch: `batch_{ordinal}.json`
    pub fn artifact_name(&self) -> String {
        artifact_name(self.ordinal)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Artifact name for the batch with the given ordinal
pub fn artifact_name(ordinal: u64) -> String {
    format!("batch_{ordinal}.json")
}

// ============================================================================
// Scheduling
// ============================================================================

/// How batches are scheduled
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// One batch at a time, in page order
    Sequential,
    /// Bounded worker pool
    #[default]
    Parallel,
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}
