//! Error types for tablesync-remote.

use thiserror::Error;

/// Errors from the remote table API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The API answered with a non-success status.
    #[error("remote API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS or DNS failure before a status was received.
    #[error("remote API transport error: {0}")]
    Transport(String),

    /// A success response whose body could not be decoded.
    #[error("failed to decode remote API response: {0}")]
    Decode(#[from] std::io::Error),
}

/// Errors from downloading or parsing the CSV export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unable to download CSV export, status code {status}")]
    Status { status: u16 },

    #[error("CSV export transport error: {0}")]
    Transport(String),

    #[error("failed to read CSV export body: {0}")]
    Read(#[from] std::io::Error),

    #[error("malformed CSV export: {0}")]
    Csv(#[from] csv::Error),
}

/// Status code and body text of a `ureq` error, or its transport message.
pub(crate) fn split_ureq_error(err: ureq::Error) -> Result<(u16, String), String> {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            Ok((status, body))
        }
        ureq::Error::Transport(transport) => Err(transport.to_string()),
    }
}

impl From<ureq::Error> for RemoteError {
    fn from(err: ureq::Error) -> Self {
        match split_ureq_error(err) {
            Ok((status, body)) => RemoteError::Status { status, body },
            Err(message) => RemoteError::Transport(message),
        }
    }
}

impl From<ureq::Error> for ExportError {
    fn from(err: ureq::Error) -> Self {
        match split_ureq_error(err) {
            Ok((status, _)) => ExportError::Status { status },
            Err(message) => ExportError::Transport(message),
        }
    }
}
