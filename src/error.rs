//! Error types for webcrawl
//!
//! Two layers of errors exist:
//! - [`Error`] covers run-level and source-level failures (configuration, workspace,
//!   archive, error log). These abandon a source or, at startup, the whole run.
//! - [`FetchError`] covers a single URL. It never escapes the fetch boundary; it is
//!   logged and counted by the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for webcrawl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for webcrawl
///
/// Each file-system variant carries the path it failed on so the error log line is
/// enough to locate the problem.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "page_concurrency")
        key: Option<String>,
    },

    /// The input directory could not be enumerated
    #[error("error reading dir {path}: {source}")]
    ReadDir {
        /// Directory that was being listed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The error log could not be created or opened for appending
    #[error("error creating log file {path}: {source}")]
    ErrorLog {
        /// Path of the error log
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A URL-list source could not be opened or read
    #[error("error opening file {path}: {source}")]
    SourceOpen {
        /// Path of the source file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The per-source workspace directory could not be created
    #[error("error creating dir {path}: {source}")]
    WorkspaceCreate {
        /// Workspace directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The workspace index file could not be created
    #[error("error creating {path}: {source}")]
    IndexCreate {
        /// Path of `index.txt`
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A fetched body or its index line could not be written
    #[error("error saving {url} to {path}: {source}")]
    Persist {
        /// URL whose body was being saved
        url: String,
        /// File that was being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Compressing a workspace failed
    #[error("error creating zip {archive}: {reason}")]
    Archive {
        /// Archive that was being written
        archive: PathBuf,
        /// The reason archiving failed
        reason: String,
    },

    /// Removing a workspace after archiving failed
    #[error("error deleting directory {path}: {source}")]
    Cleanup {
        /// Workspace directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A worker pool stopped handing out slots
    #[error("worker pool closed")]
    PoolClosed,

    /// A spawned task panicked or was aborted
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (HTTP client construction)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// ZIP writer error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a configuration key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failure of a single GET request
///
/// Timeouts are not represented here; they are a separate
/// [`FetchOutcome`](crate::types::FetchOutcome) variant.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The line from the source is not a usable absolute URL
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending line
        url: String,
        /// Parser message
        reason: String,
    },

    /// The request could not be built or sent (connection refused, DNS, TLS, ...)
    #[error("request to {url} failed: {source}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status and status checking is enabled
    #[error("HTTP error fetching {url}: {status}")]
    Status {
        /// Requested URL
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// The response started but the body could not be read
    #[error("failed to read response body from {url}: {source}")]
    Body {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// URL the failure refers to
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidUrl { url, .. }
            | FetchError::Request { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Body { url, .. } => url,
        }
    }
}
