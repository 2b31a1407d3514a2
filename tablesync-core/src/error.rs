//! Error types for tablesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving [`Settings`](crate::config::Settings).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key was not set in any configuration layer.
    #[error("missing required setting {key}")]
    MissingKey { key: &'static str },

    /// A required key was set, but to an empty (or whitespace-only) value.
    #[error("setting {key} is empty")]
    EmptyValue { key: &'static str },

    /// A dotenv layer exists but could not be parsed.
    #[error("failed to read {path}: {source}")]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}
