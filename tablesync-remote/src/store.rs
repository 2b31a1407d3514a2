//! Seams between the reconciler and the outside world.
//!
//! The pipeline only talks to these traits, so tests can drive it with
//! in-memory stores while the binary plugs in [`AirtableClient`] and
//! [`ExportFetcher`].
//!
//! [`AirtableClient`]: crate::airtable::AirtableClient
//! [`ExportFetcher`]: crate::export::ExportFetcher

use tablesync_core::{Fields, RecordId, Table};

use crate::error::{ExportError, RemoteError};

/// A remote table that can be listed and written to.
pub trait RecordStore {
    /// Read every record, following pagination to the end.
    fn fetch_all(&self) -> Result<Table, RemoteError>;

    /// Patch only the given fields of one record.
    fn update(&self, id: &RecordId, fields: &Fields) -> Result<(), RemoteError>;

    /// Create records in a single request and return their new ids.
    fn create_batch(&self, records: &[Fields]) -> Result<Vec<RecordId>, RemoteError>;

    /// Largest number of records accepted by one [`create_batch`](Self::create_batch) call.
    fn max_batch_size(&self) -> usize {
        1
    }
}

/// The source-of-truth export.
pub trait ExportSource {
    fn fetch(&self, url: &str) -> Result<Table, ExportError>;
}
