//! # webcrawl
//!
//! Concurrent batch page fetcher. Every URL-list file ("source") in a directory is
//! fetched into its own workspace, recorded in an `index.txt` manifest, compressed
//! into `<name>.zip` and cleaned up.
//!
//! ## Design Philosophy
//!
//! - **Two bounded levels** - at most `page_concurrency` sources and, within each,
//!   at most `request_concurrency` requests are in flight
//! - **Failures stay local** - a bad URL or a bad source is logged and counted, the
//!   rest of the run carries on
//! - **Every request has a deadline** - a request that misses it is cancelled
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use webcrawl::{Config, Dispatcher, ErrorLog, HttpFetcher, RunStatistics};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         input_dir: "lists".into(),
//!         output_dir: "archives".into(),
//!         ..Default::default()
//!     };
//!     config.validate()?;
//!
//!     let stats = Arc::new(RunStatistics::new(ErrorLog::open(&config.error_log)?));
//!     let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
//!     let dispatcher = Dispatcher::new(&config, fetcher, stats);
//!
//!     let summary = dispatcher.run_dir(&config).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// ZIP archiving of finished workspaces
pub mod archive;
/// Configuration types
pub mod config;
/// Source discovery and the page-level pool
pub mod dispatcher;
/// Error types
pub mod error;
/// Page fetching with a per-request deadline
pub mod fetch;
/// Diagnostic logging setup
pub mod logging;
/// Bounded task pool shared by both concurrency levels
pub mod pool;
/// Per-source processing
pub mod source;
/// Run-wide counters and the error log
pub mod stats;
/// Core types
pub mod types;
/// Helper functions
pub mod utils;
/// Per-source workspace directory and index
pub mod workspace;

pub use config::{Config, FetchConfig};
pub use dispatcher::{Dispatcher, SourceEntry, discover_sources};
pub use error::{Error, FetchError, Result};
pub use fetch::{HttpFetcher, PageFetcher};
pub use pool::BoundedPool;
pub use source::{SourceProcessor, SourceSettings};
pub use stats::{ErrorLog, RunStatistics, RunTotals};
pub use types::{FetchOutcome, PageId, RunSummary, SavedPage, SourceReport};
pub use workspace::SourceWorkspace;
