//! tablesync core library — domain types, layered settings, errors.
//!
//! - [`types`] — records, tables, field values and the pivot index
//! - [`config`] — [`Settings`] resolved from defaults, dotenv files and the environment
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{RawConfig, Settings};
pub use error::ConfigError;
pub use types::{
    values_match, FieldValue, Fields, PivotIndex, PivotValue, Record, RecordId, Table,
};
