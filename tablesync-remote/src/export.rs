//! CSV export download and parsing.
//!
//! The first row is the header. Each column is typed as a whole: integer if
//! every non-empty cell is an integer, then float, then boolean, otherwise
//! text. Empty cells become [`FieldValue::Empty`].

use std::io::Read;

use tablesync_core::{FieldValue, Fields, Record, Table};

use crate::error::ExportError;
use crate::store::ExportSource;
use crate::USER_AGENT;

/// Downloads a CSV export over HTTP.
pub struct ExportFetcher {
    agent: ureq::Agent,
}

impl Default for ExportFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
        }
    }
}

impl ExportSource for ExportFetcher {
    fn fetch(&self, url: &str) -> Result<Table, ExportError> {
        let response = self.agent.get(url).call()?;
        let table = parse_csv(response.into_reader())?;
        tracing::info!(records = table.len(), "found records in CSV export");
        Ok(table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

/// Parse CSV text (header row first) into a typed [`Table`].
pub fn parse_csv<R: Read>(reader: R) -> Result<Table, ExportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for row in rdr.records() {
        let row = row?;
        rows.push(row.iter().map(str::to_string).collect());
    }

    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|col| infer_kind(rows.iter().filter_map(|r| r.get(col))))
        .collect();

    let records = rows
        .into_iter()
        .map(|row| {
            let fields: Fields = columns
                .iter()
                .enumerate()
                .map(|(col, name)| {
                    let cell = row.get(col).map(String::as_str).unwrap_or("");
                    (name.clone(), typed_cell(cell, kinds[col]))
                })
                .collect();
            Record::new(fields)
        })
        .collect();

    Ok(Table::new(columns, records))
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a String>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for cell in cells.map(|c| c.trim()).filter(|c| !c.is_empty()) {
        let cell_kind = if cell.parse::<i64>().is_ok() {
            ColumnKind::Integer
        } else if parse_float(cell).is_some() {
            ColumnKind::Float
        } else if parse_bool(cell).is_some() {
            ColumnKind::Boolean
        } else {
            return ColumnKind::Text;
        };
        kind = Some(match (kind, cell_kind) {
            (None, next) => next,
            (Some(seen), next) if seen == next => seen,
            // integers widen to float; booleans never mix with numbers
            (Some(ColumnKind::Integer), ColumnKind::Float)
            | (Some(ColumnKind::Float), ColumnKind::Integer) => ColumnKind::Float,
            _ => return ColumnKind::Text,
        });
    }
    kind.unwrap_or(ColumnKind::Text)
}

fn typed_cell(cell: &str, kind: ColumnKind) -> FieldValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return FieldValue::Empty;
    }
    match kind {
        ColumnKind::Integer => trimmed
            .parse::<i64>()
            .map(FieldValue::from)
            .unwrap_or_else(|_| FieldValue::from(cell)),
        ColumnKind::Float => parse_float(trimmed)
            .and_then(serde_json::Number::from_f64)
            .map(FieldValue::Number)
            .unwrap_or_else(|| FieldValue::from(cell)),
        ColumnKind::Boolean => parse_bool(trimmed)
            .map(FieldValue::Bool)
            .unwrap_or_else(|| FieldValue::from(cell)),
        ColumnKind::Text => FieldValue::from(cell),
    }
}

fn parse_float(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
