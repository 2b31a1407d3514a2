//! # tablesync-sync
//!
//! Three-way reconciliation between a remote table and a CSV export.
//!
//! [`reconcile`] plans the work (updates, creates, records missing from the
//! export) without side effects; [`apply`] issues the writes; [`pipeline::run`]
//! sequences a full run and returns a [`SyncReport`].

pub mod apply;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod report;

pub use apply::{WriteAction, WriteOutcome};
pub use error::SyncError;
pub use reconcile::{CreateRequest, FieldChange, MissingRecord, Plan, UpdateRequest};
pub use report::SyncReport;
