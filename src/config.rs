//! Configuration types for webcrawl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-request behaviour (concurrency within a source, deadline, skip policy)
///
/// Groups settings that every source processor shares.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum concurrent requests per source (default: 4)
    #[serde(default = "default_concurrency")]
    pub request_concurrency: usize,

    /// Seconds to allow a request (headers and full body) before aborting it (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Lines containing this token, compared case-insensitively, are skipped (default: "pdf")
    ///
    /// The default keeps non-HTML payloads such as PDF documents out of the archive.
    #[serde(default = "default_skip_token")]
    pub skip_token: String,

    /// Treat non-2xx responses as failures instead of saving them (default: false)
    #[serde(default)]
    pub fail_on_http_error: bool,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            skip_token: default_skip_token(),
            fail_on_http_error: false,
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    /// Per-request deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Main configuration for a crawl run
///
/// All fields have sensible defaults, so `Config::default()` reproduces the classic
/// behaviour: every `*.txt` file in the working directory is a source, four sources
/// and four requests per source run at once, and requests give up after ten seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned for URL-list sources (default: ".")
    #[serde(default = "default_dir")]
    pub input_dir: PathBuf,

    /// Directory where workspaces and archives are created (default: ".")
    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,

    /// Append-only log of failures (default: "webcrawl.log")
    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,

    /// Only files with this extension are sources; empty means every file (default: "txt")
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Maximum sources processed concurrently (default: 4)
    #[serde(default = "default_concurrency")]
    pub page_concurrency: usize,

    /// Suppress per-request progress lines
    #[serde(default)]
    pub quiet: bool,

    /// Request settings
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: default_dir(),
            output_dir: default_dir(),
            error_log: default_error_log(),
            source_extension: default_source_extension(),
            page_concurrency: default_concurrency(),
            quiet: false,
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their defaults, so a file only needs the settings it changes.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.page_concurrency == 0 {
            return Err(Error::config(
                "page_concurrency",
                "page concurrency must be at least 1",
            ));
        }
        if self.fetch.request_concurrency == 0 {
            return Err(Error::config(
                "fetch.request_concurrency",
                "request concurrency must be at least 1",
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(Error::config(
                "fetch.timeout_secs",
                "timeout must be at least 1 second",
            ));
        }
        if self.fetch.skip_token.trim().is_empty() {
            // An empty token would match every line and skip the whole run.
            return Err(Error::config("fetch.skip_token", "skip token must not be empty"));
        }
        Ok(())
    }

    /// Whether a file name has the configured source extension
    pub fn matches_source_extension(&self, path: &Path) -> bool {
        if self.source_extension.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.source_extension))
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_error_log() -> PathBuf {
    PathBuf::from("webcrawl.log")
}

fn default_source_extension() -> String {
    "txt".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_skip_token() -> String {
    "pdf".to_string()
}

fn default_user_agent() -> String {
    format!("webcrawl/{}", env!("CARGO_PKG_VERSION"))
}
