//! Diagnostic logging setup
//!
//! Diagnostics go to stderr through `tracing`. Stdout is left to the progress lines
//! and the final summary, and the error log file is written by
//! [`ErrorLog`](crate::stats::ErrorLog), never by the subscriber.

use std::io;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "webcrawl=info";

/// Filter used for `--debug` when `RUST_LOG` is not set
pub const DEBUG_FILTER: &str = "webcrawl=debug";

/// Errors raised while installing the subscriber
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// A global subscriber was installed earlier in this process
    #[error("logging already initialized")]
    AlreadyInitialized,
    /// The subscriber could not be installed for another reason
    #[error("subscriber init failed: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the level filter: `RUST_LOG` wins, otherwise the crate default for `debug`
pub fn build_filter(debug: bool) -> EnvFilter {
    let fallback = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global stderr subscriber
pub fn init_logging(debug: bool) -> Result<(), LogError> {
    let stderr_layer = fmt::layer()
        .with_target(debug)
        .with_level(true)
        .with_thread_names(debug)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(build_filter(debug))
        .with(stderr_layer)
        .try_init()
        .map_err(|e| {
            if e.to_string().contains("already") {
                LogError::AlreadyInitialized
            } else {
                LogError::SubscriberInit(e)
            }
        })
}
