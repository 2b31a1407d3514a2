//! Domain types shared by the remote client, the export fetcher and the
//! reconciler.
//!
//! A [`Table`] is an ordered list of [`Record`]s from one source. Records hold
//! their cells as [`Fields`]; the join key is read out of the fields by name
//! and canonicalised into a [`PivotValue`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque identifier assigned by the remote store (e.g. `rec8116cdd76088af`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Canonical string form of a record's pivot field; the join key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PivotValue(pub String);

impl fmt::Display for PivotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PivotValue {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PivotValue {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A single cell.
///
/// Serialized untagged so a [`Fields`] map is exactly the JSON object the
/// remote API sends and accepts. `Empty` serializes as `null`, which the
/// remote store interprets as "clear this field".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Empty,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    /// Arrays and objects (linked records, attachments, collaborators).
    Other(serde_json::Value),
}

impl FieldValue {
    /// Canonical comparison form.
    ///
    /// `None` for empty cells and empty strings. Integral numbers drop their
    /// fractional part so `1` and `1.0` compare equal.
    pub fn canonical(&self) -> Option<String> {
        match self {
            FieldValue::Empty => None,
            FieldValue::Text(s) if s.is_empty() => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Number(n) => Some(canonical_number(n)),
            FieldValue::Other(v) => Some(v.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.canonical().is_none()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Some(s) => f.write_str(&s),
            None => f.write_str(""),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

fn canonical_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Equality used by the reconciler: missing equals missing, missing never
/// equals present, otherwise canonical forms must match.
pub fn values_match(a: Option<&FieldValue>, b: Option<&FieldValue>) -> bool {
    let a = a.and_then(FieldValue::canonical);
    let b = b.and_then(FieldValue::canonical);
    a == b
}

/// Field name → value.
pub type Fields = BTreeMap<String, FieldValue>;

// ---------------------------------------------------------------------------
// Records and tables
// ---------------------------------------------------------------------------

/// One row. `id` is only set for records read from the remote store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub fields: Fields,
}

impl Record {
    pub fn new(fields: Fields) -> Self {
        Self { id: None, fields }
    }

    pub fn with_id(id: impl Into<RecordId>, fields: Fields) -> Self {
        Self {
            id: Some(id.into()),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// The record's join key, or `None` when the pivot field is missing or empty.
    pub fn pivot(&self, pivot_field: &str) -> Option<PivotValue> {
        self.get(pivot_field)
            .and_then(FieldValue::canonical)
            .map(PivotValue)
    }
}

/// Ordered collection of records from a single source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Column names in source order (CSV header, or first-seen for remote).
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    /// Build a table whose columns are the union of record field names in
    /// first-seen order.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for name in record.fields.keys() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.clone());
                }
            }
        }
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Index records by pivot value. First occurrence wins; later duplicates
    /// and records without a pivot are reported on the returned index.
    pub fn index_by<'a>(&'a self, pivot_field: &str) -> PivotIndex<'a> {
        let mut index = PivotIndex::default();
        for record in &self.records {
            match record.pivot(pivot_field) {
                None => index.unkeyed += 1,
                Some(pivot) => {
                    if index.by_pivot.contains_key(&pivot) {
                        if !index.duplicates.contains(&pivot) {
                            index.duplicates.push(pivot);
                        }
                    } else {
                        index.order.push(pivot.clone());
                        index.by_pivot.insert(pivot, record);
                    }
                }
            }
        }
        index
    }
}

/// Pivot → record lookup built by [`Table::index_by`].
///
/// Iteration via [`PivotIndex::iter`] follows table order.
#[derive(Debug, Default)]
pub struct PivotIndex<'a> {
    by_pivot: HashMap<PivotValue, &'a Record>,
    order: Vec<PivotValue>,
    /// Pivot values that occurred more than once (only the first was indexed).
    pub duplicates: Vec<PivotValue>,
    /// Records whose pivot field was missing or empty.
    pub unkeyed: usize,
}

impl<'a> PivotIndex<'a> {
    pub fn get(&self, pivot: &PivotValue) -> Option<&'a Record> {
        self.by_pivot.get(pivot).copied()
    }

    pub fn contains(&self, pivot: &PivotValue) -> bool {
        self.by_pivot.contains_key(pivot)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PivotValue, &'a Record)> + '_ {
        self.order
            .iter()
            .filter_map(move |p| self.by_pivot.get(p).map(|r| (p, *r)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
