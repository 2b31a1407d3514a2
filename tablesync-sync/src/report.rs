//! Run summary returned by [`pipeline::run`](crate::pipeline::run).

use chrono::{DateTime, Utc};
use serde::Serialize;

use tablesync_core::PivotValue;

use crate::apply::WriteOutcome;
use crate::reconcile::MissingRecord;

/// Everything that happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub remote_records: usize,
    pub export_records: usize,
    pub updates: Vec<WriteOutcome>,
    pub creates: Vec<WriteOutcome>,
    /// Remote records absent from the export. Never deleted.
    pub missing_in_export: Vec<MissingRecord>,
    pub remote_duplicates: Vec<PivotValue>,
    pub export_duplicates: Vec<PivotValue>,
    /// Remote records with an empty pivot, excluded from every pass.
    pub skipped_remote: usize,
    /// Export rows with an empty pivot, excluded from every pass.
    pub skipped_export: usize,
}

impl SyncReport {
    /// Successful (or, in dry-run, planned) updates.
    pub fn updated(&self) -> usize {
        self.updates.iter().filter(|o| !o.is_failure()).count()
    }

    /// Successful (or, in dry-run, planned) creates.
    pub fn created(&self) -> usize {
        self.creates.iter().filter(|o| !o.is_failure()).count()
    }

    pub fn failed(&self) -> usize {
        self.updates
            .iter()
            .chain(self.creates.iter())
            .filter(|o| o.is_failure())
            .count()
    }

    /// Records excluded from reconciliation because their pivot was empty.
    pub fn skipped(&self) -> usize {
        self.skipped_remote + self.skipped_export
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
