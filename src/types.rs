//! Core types for webcrawl

use crate::error::FetchError;
use std::path::PathBuf;
use std::time::Duration;

/// Sequential identifier of a saved page within one source workspace
///
/// Ids start at 1 and are handed out in completion order, not input order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId(pub u64);

impl PageId {
    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }

    /// File name the page body is stored under (`<id>.html`)
    pub fn file_name(&self) -> String {
        format!("{}.html", self.0)
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one guarded GET request
#[derive(Debug)]
pub enum FetchOutcome {
    /// The response arrived before the deadline and its body was read in full
    Success {
        /// Complete response body
        body: Vec<u8>,
        /// HTTP status code of the response
        status: u16,
    },
    /// The request could not be made or the response could not be read
    Failure(FetchError),
    /// The deadline fired first; the request was cancelled
    TimedOut,
}

/// A body that was written into a workspace
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedPage {
    /// Id claimed for the page
    pub id: PageId,
    /// Path as written to the index (`<source>/<id>.html`)
    pub index_path: String,
}

/// Outcome of processing one source
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceReport {
    /// Source name (file stem)
    pub name: String,
    /// Pages saved into the archive
    pub fetched: u64,
    /// Requests that failed or timed out
    pub failed: u64,
    /// Lines dropped before fetching (blank or matching the skip token)
    pub skipped: u64,
    /// Archive produced for the source
    pub archive: PathBuf,
    /// Highest number of requests that were in flight at once
    pub peak_in_flight: usize,
}

/// Aggregate result of a run, printed at the end
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Pages saved across all sources
    pub total_successes: u64,
    /// Request-level and source-level errors across all sources
    pub total_errors: u64,
    /// Wall-clock time of the run
    pub elapsed: Duration,
    /// Reports of sources that completed
    pub sources: Vec<SourceReport>,
    /// Highest number of sources that were processed at once
    pub peak_active_sources: usize,
    /// Error log the summary points the operator to
    pub error_log: PathBuf,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TOTAL FILES FETCHED: {}", self.total_successes)?;
        writeln!(
            f,
            "TOTAL ERRORS (check {} for info): {}",
            self.error_log.display(),
            self.total_errors
        )?;
        write!(f, "TOTAL TIME: {:?}", self.elapsed)
    }
}
