//! Run-wide counters and the error log
//!
//! [`RunStatistics`] is created once per run and shared (behind an `Arc`) with every
//! source and request task. The success/error counters and the [`ErrorLog`] sit
//! behind a single mutex, so an error line and its counter increment are one
//! critical section and log lines never interleave.

use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Prefix of every error log line
const LOG_PREFIX: &str = "ERROR: ";

/// Timestamp layout of error log lines (`2024/01/23 01:23:23`)
const LOG_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Append-only sink for failure descriptions
///
/// Lines are written and flushed synchronously by the task that records the error.
pub struct ErrorLog {
    writer: Box<dyn Write + Send>,
}

impl ErrorLog {
    /// Open `path` for appending, creating it if it does not exist
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::ErrorLog {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    /// Log that writes into any writer (used for in-memory logs)
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Log that discards every line
    pub fn discard() -> Self {
        Self::from_writer(std::io::sink())
    }

    /// Write one line as a single `write_all`
    fn append(&mut self, message: &str) {
        let line = format!(
            "{}{} {}\n",
            LOG_PREFIX,
            chrono::Local::now().format(LOG_TIME_FORMAT),
            message
        );
        if let Err(e) = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.flush())
        {
            // Nowhere left to record it but the tracing output.
            tracing::warn!(error = %e, "failed to append to error log");
        }
    }
}

/// Snapshot of the run counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunTotals {
    /// Pages saved
    pub successes: u64,
    /// Errors recorded
    pub errors: u64,
}

struct StatsInner {
    totals: RunTotals,
    log: ErrorLog,
}

/// Process-wide success/error counters plus the error log
pub struct RunStatistics {
    inner: Mutex<StatsInner>,
}

impl RunStatistics {
    /// Create zeroed statistics writing failures to `log`
    pub fn new(log: ErrorLog) -> Self {
        Self {
            inner: Mutex::new(StatsInner {
                totals: RunTotals::default(),
                log,
            }),
        }
    }

    /// Count one saved page
    pub fn record_success(&self) {
        self.lock().totals.successes += 1;
    }

    /// Count one error and append its description to the error log
    pub fn record_error(&self, message: impl std::fmt::Display) {
        let message = message.to_string();
        tracing::error!("{}", message);
        let mut inner = self.lock();
        inner.totals.errors += 1;
        inner.log.append(&message);
    }

    /// Current counter values
    pub fn totals(&self) -> RunTotals {
        self.lock().totals
    }

    fn lock(&self) -> MutexGuard<'_, StatsInner> {
        // Counters stay meaningful even if a holder panicked mid-update.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
