// Error types module
use thiserror::Error;

/// Main error type for the load engine.
///
/// Only two variants abort an extract: `ParseFailure` (the file could
/// not be read as delimited text; the caller logs and moves on) and
/// `LoadAborted` (IO outside the schema/load logic). Everything else
/// degrades in place and is recorded on the load result instead of
/// being raised.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("could not parse {file} as delimited text: {reason}")]
    ParseFailure {
        file: String,
        reason: String,
        /// Short lossy sample of the file head, for the log.
        sample: String,
    },

    #[error("table creation failed for {table}: {reason}")]
    CreateTableFailed { table: String, reason: String },

    #[error("ingestion api error: {0}")]
    Api(#[from] ApiError),

    #[error("load aborted: {0}")]
    LoadAborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by an `IngestionApi` implementation.
///
/// Kept transport-agnostic so the core and its tests never depend on
/// an HTTP stack.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Timeouts and non-success statuses both count as a failed
    /// attempt for retry purposes.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::InvalidResponse(_))
    }
}

/// Configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
