//! Error types for tablesync-sync.

use thiserror::Error;

use tablesync_remote::{ExportError, RemoteError};

/// Fatal errors that stop a run before any write is issued.
///
/// Per-record write failures are not errors; they surface as
/// [`WriteOutcome::Failed`](crate::apply::WriteOutcome::Failed).
#[derive(Debug, Error)]
pub enum SyncError {
    /// Listing the remote table failed.
    #[error("failed to load remote table: {0}")]
    Remote(#[from] RemoteError),

    /// Downloading or parsing the export failed.
    #[error("failed to load CSV export: {0}")]
    Export(#[from] ExportError),

    /// The export lacks the pivot column or a compared column.
    #[error("CSV export has no column '{column}'")]
    MissingColumn { column: String },
}
