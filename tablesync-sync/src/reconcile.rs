//! Reconciliation planning.
//!
//! Each pass joins the two tables on the pivot field and returns the work to
//! do; nothing here performs I/O.
//!
//! | Pass              | Join                     | Result            |
//! |-------------------|--------------------------|-------------------|
//! | [`diff_updates`]  | pivot in both tables     | [`UpdateRequest`] |
//! | [`insert_missing`]| pivot only in the export | [`CreateRequest`] |
//! | [`report_deleted`]| pivot only in the remote | [`MissingRecord`] |
//!
//! Pivot values are expected to be unique per table. When they are not, the
//! first record in table order is used and the duplicates are reported in the
//! [`Plan`].

use serde::Serialize;

use tablesync_core::{values_match, FieldValue, Fields, PivotValue, RecordId, Settings, Table};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// One compared field whose values disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub remote: Option<FieldValue>,
    pub export: Option<FieldValue>,
}

/// Partial update of one remote record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRequest {
    pub id: RecordId,
    pub pivot: PivotValue,
    /// Export values for every compared field, and nothing else.
    pub fields: Fields,
    /// The compared fields that actually differ.
    pub changes: Vec<FieldChange>,
}

/// New remote record built from an export row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRequest {
    pub pivot: PivotValue,
    /// Pivot field plus compared fields.
    pub fields: Fields,
}

/// Remote record whose pivot no longer appears in the export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingRecord {
    pub pivot: PivotValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub fields: Fields,
}

/// Everything a run would do, plus data-quality findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub updates: Vec<UpdateRequest>,
    pub creates: Vec<CreateRequest>,
    pub missing_in_export: Vec<MissingRecord>,
    pub remote_duplicates: Vec<PivotValue>,
    pub export_duplicates: Vec<PivotValue>,
    /// Records skipped because their pivot field was empty: (remote, export).
    pub unkeyed: (usize, usize),
}

impl Plan {
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty() && self.creates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Presence check
// ---------------------------------------------------------------------------

/// The export must carry the pivot column and every compared column.
pub fn check_columns(export: &Table, settings: &Settings) -> Result<(), SyncError> {
    let required = std::iter::once(&settings.pivot_field).chain(settings.compared_fields.iter());
    for column in required {
        if !export.has_column(column) {
            return Err(SyncError::MissingColumn {
                column: column.clone(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Matched records whose compared fields differ, in remote table order.
pub fn diff_updates(remote: &Table, export: &Table, settings: &Settings) -> Vec<UpdateRequest> {
    let pivot = settings.pivot_field.as_str();
    let export_index = export.index_by(pivot);

    let mut updates = Vec::new();
    for (key, remote_record) in remote.index_by(pivot).iter() {
        let Some(export_record) = export_index.get(key) else {
            continue;
        };
        let Some(id) = remote_record.id.clone() else {
            tracing::warn!(pivot = %key, "matched remote record has no id, skipping");
            continue;
        };

        let changes: Vec<FieldChange> = settings
            .compared_fields
            .iter()
            .filter(|field| !values_match(remote_record.get(field), export_record.get(field)))
            .map(|field| FieldChange {
                field: field.clone(),
                remote: remote_record.get(field).cloned(),
                export: export_record.get(field).cloned(),
            })
            .collect();
        if changes.is_empty() {
            continue;
        }

        updates.push(UpdateRequest {
            id,
            pivot: key.clone(),
            fields: project(export_record.fields.clone(), settings.compared_fields.as_slice()),
            changes,
        });
    }

    tracing::info!(count = updates.len(), "found records with differences");
    updates
}

/// Export records with no remote counterpart, in export table order.
pub fn insert_missing(remote: &Table, export: &Table, settings: &Settings) -> Vec<CreateRequest> {
    let pivot = settings.pivot_field.as_str();
    let remote_index = remote.index_by(pivot);
    let create_fields = settings.create_fields();

    let creates: Vec<CreateRequest> = export
        .index_by(pivot)
        .iter()
        .filter(|(key, _)| !remote_index.contains(key))
        .map(|(key, record)| CreateRequest {
            pivot: key.clone(),
            fields: project(record.fields.clone(), create_fields.as_slice()),
        })
        .collect();

    tracing::info!(count = creates.len(), "found records missing in remote table");
    creates
}

/// Remote records with no export counterpart, in remote table order.
///
/// Reported only; nothing is ever deleted.
pub fn report_deleted(remote: &Table, export: &Table, settings: &Settings) -> Vec<MissingRecord> {
    let pivot = settings.pivot_field.as_str();
    let export_index = export.index_by(pivot);

    let missing: Vec<MissingRecord> = remote
        .index_by(pivot)
        .iter()
        .filter(|(key, _)| !export_index.contains(key))
        .map(|(key, record)| MissingRecord {
            pivot: key.clone(),
            id: record.id.clone(),
            fields: record.fields.clone(),
        })
        .collect();

    tracing::info!(count = missing.len(), "found records missing in CSV export");
    for record in &missing {
        tracing::info!(pivot = %record.pivot, id = ?record.id, "missing in CSV export");
    }
    missing
}

/// Run all three passes and collect data-quality findings.
pub fn plan(remote: &Table, export: &Table, settings: &Settings) -> Plan {
    let pivot = settings.pivot_field.as_str();
    let remote_index = remote.index_by(pivot);
    let export_index = export.index_by(pivot);

    for dup in &remote_index.duplicates {
        tracing::warn!(pivot = %dup, "duplicate pivot in remote table, first record wins");
    }
    for dup in &export_index.duplicates {
        tracing::warn!(pivot = %dup, "duplicate pivot in CSV export, first record wins");
    }
    if remote_index.unkeyed + export_index.unkeyed > 0 {
        tracing::warn!(
            remote = remote_index.unkeyed,
            export = export_index.unkeyed,
            "records without a pivot value were skipped"
        );
    }

    Plan {
        updates: diff_updates(remote, export, settings),
        creates: insert_missing(remote, export, settings),
        missing_in_export: report_deleted(remote, export, settings),
        remote_duplicates: remote_index.duplicates.clone(),
        export_duplicates: export_index.duplicates.clone(),
        unkeyed: (remote_index.unkeyed, export_index.unkeyed),
    }
}

/// Keep exactly `names` from `fields`; absent names become [`FieldValue::Empty`].
fn project<S: AsRef<str>>(mut fields: Fields, names: &[S]) -> Fields {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let value = fields.remove(name).unwrap_or_default();
            (name.to_string(), value)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
