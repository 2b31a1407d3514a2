//! # tablesync-remote
//!
//! HTTP collaborators for a sync run: the paginated remote table client
//! ([`AirtableClient`]) and the CSV export downloader ([`ExportFetcher`]),
//! both reachable through the [`RecordStore`] / [`ExportSource`] traits.

pub mod airtable;
pub mod error;
pub mod export;
pub mod store;

pub use airtable::AirtableClient;
pub use error::{ExportError, RemoteError};
pub use export::ExportFetcher;
pub use store::{ExportSource, RecordStore};

pub(crate) const USER_AGENT: &str = concat!("tablesync/", env!("CARGO_PKG_VERSION"));
