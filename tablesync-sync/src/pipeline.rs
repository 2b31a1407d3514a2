//! Shared sync pipeline entrypoint used by `tablesync sync` and `tablesync diff`.
//!
//! ```text
//! fetch remote ─┐
//!               ├─> check columns ─> plan ─> apply updates ─> apply creates ─> report
//! fetch export ─┘
//! ```
//!
//! Both fetches are fatal on failure: planning against a partial remote table
//! would recreate records that already exist.

use chrono::Utc;

use tablesync_core::{Settings, Table};
use tablesync_remote::{ExportSource, RecordStore};

use crate::apply::{apply_creates, apply_updates};
use crate::reconcile::{self, Plan};
use crate::{SyncError, SyncReport};

/// Fetched tables plus the plan derived from them. No writes issued.
#[derive(Debug, Clone)]
pub struct Preview {
    pub remote: Table,
    pub export: Table,
    pub plan: Plan,
}

/// Fetch both tables and plan the run.
pub fn preview<S, E>(settings: &Settings, store: &S, source: &E) -> Result<Preview, SyncError>
where
    S: RecordStore + ?Sized,
    E: ExportSource + ?Sized,
{
    tracing::info!("step 1/3: loading current data from remote table");
    let remote = store.fetch_all()?;

    tracing::info!("step 2/3: loading current data from CSV export");
    let export = source.fetch(&settings.export_url)?;
    reconcile::check_columns(&export, settings)?;

    let plan = reconcile::plan(&remote, &export, settings);
    Ok(Preview {
        remote,
        export,
        plan,
    })
}

/// Run the full pipeline. With `dry_run`, no remote write is issued.
pub fn run<S, E>(
    settings: &Settings,
    store: &S,
    source: &E,
    dry_run: bool,
) -> Result<SyncReport, SyncError>
where
    S: RecordStore + ?Sized,
    E: ExportSource + ?Sized,
{
    let started_at = Utc::now();
    let Preview {
        remote,
        export,
        plan,
    } = preview(settings, store, source)?;

    tracing::info!("step 3/3: synchronizing remote table with CSV export");
    tracing::info!(count = plan.updates.len(), "synchronizing different records");
    let (skipped_remote, skipped_export) = plan.unkeyed;
    let updates = apply_updates(store, &plan.updates, dry_run);

    tracing::info!(count = plan.creates.len(), "synchronizing missing records");
    let creates = apply_creates(store, &plan.creates, dry_run);

    let report = SyncReport {
        started_at,
        finished_at: Utc::now(),
        dry_run,
        remote_records: remote.len(),
        export_records: export.len(),
        updates,
        creates,
        missing_in_export: plan.missing_in_export,
        remote_duplicates: plan.remote_duplicates,
        export_duplicates: plan.export_duplicates,
        skipped_remote,
        skipped_export,
    };
    tracing::info!(
        updated = report.updated(),
        created = report.created(),
        failed = report.failed(),
        missing_in_export = report.missing_in_export.len(),
        skipped = report.skipped(),
        "synchronization completed"
    );
    Ok(report)
}
