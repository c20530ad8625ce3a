//! Source processing: one URL list in, one ZIP archive out
//!
//! Phases:
//! 1. Read the source file
//! 2. Create the workspace (`<output_dir>/<name>/` with `index.txt`)
//! 3. Fan eligible URLs out through a bounded pool of guarded fetches
//! 4. Wait for every fetch, then archive the workspace and delete it

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::archive::zip_directory;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::PageFetcher;
use crate::pool::BoundedPool;
use crate::stats::RunStatistics;
use crate::types::{FetchOutcome, SourceReport};
use crate::utils::{eligible_url, source_name};
use crate::workspace::SourceWorkspace;

/// Settings a source processor needs, extracted from [`Config`]
#[derive(Clone, Debug)]
pub struct SourceSettings {
    /// Where workspaces and archives are created
    pub output_dir: PathBuf,
    /// Maximum requests in flight for one source
    pub request_concurrency: usize,
    /// Per-request deadline
    pub timeout: Duration,
    /// Case-insensitive token that marks lines to skip
    pub skip_token: String,
    /// Suppress per-request progress lines
    pub quiet: bool,
}

impl From<&Config> for SourceSettings {
    fn from(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            request_concurrency: config.fetch.request_concurrency,
            timeout: config.fetch.timeout(),
            skip_token: config.fetch.skip_token.clone(),
            quiet: config.quiet,
        }
    }
}

/// Counters for one source, shared by its request tasks
#[derive(Default)]
struct SourceCounters {
    fetched: AtomicU64,
    failed: AtomicU64,
}

/// Processes URL-list sources, one call per source
#[derive(Clone)]
pub struct SourceProcessor {
    fetcher: Arc<dyn PageFetcher>,
    stats: Arc<RunStatistics>,
    settings: Arc<SourceSettings>,
}

impl SourceProcessor {
    /// Create a processor sharing `fetcher` and `stats` with the rest of the run
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        stats: Arc<RunStatistics>,
        settings: SourceSettings,
    ) -> Self {
        Self {
            fetcher,
            stats,
            settings: Arc::new(settings),
        }
    }

    /// Fetch every URL of the source at `path` and archive the results
    ///
    /// Request-level failures are logged and counted as they happen and do not fail
    /// the source. An `Err` means the source itself could not be processed; the
    /// caller is responsible for counting it.
    pub async fn process(&self, path: &Path) -> Result<SourceReport> {
        let name = source_name(path);

        // Phase 1: open the list
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::SourceOpen {
                path: path.to_path_buf(),
                source: e,
            })?;
        let mut reader = BufReader::new(file);

        // Phase 2: workspace
        let workspace = Arc::new(SourceWorkspace::create(&self.settings.output_dir, &name).await?);
        tracing::debug!(source = %name, dir = ?workspace.dir(), "reading source");

        // Phase 3: fan out, one line at a time
        let counters = Arc::new(SourceCounters::default());
        let mut pool = BoundedPool::new(self.settings.request_concurrency);
        let mut skipped = 0u64;
        let mut line = Vec::new();

        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    // Let submitted requests settle, then drop the half-read source.
                    pool.join().await;
                    self.abandon(workspace).await;
                    return Err(Error::SourceOpen {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            }
            let text = String::from_utf8_lossy(&line);
            let Some(url) = eligible_url(&text, &self.settings.skip_token) else {
                skipped += 1;
                continue;
            };
            let task = RequestTask {
                url: url.to_string(),
                fetcher: Arc::clone(&self.fetcher),
                stats: Arc::clone(&self.stats),
                workspace: Arc::clone(&workspace),
                counters: Arc::clone(&counters),
                timeout: self.settings.timeout,
                quiet: self.settings.quiet,
            };
            pool.spawn(task.run()).await?;
        }

        // Phase 4: wait, then archive
        let peak_in_flight = pool.peak();
        for result in pool.join().await {
            if let Err(e) = result {
                self.stats
                    .record_error(format!("request task for {} failed: {}", name, e));
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        let workspace = Arc::into_inner(workspace).ok_or_else(|| {
            Error::Io(std::io::Error::other(format!(
                "workspace {} still in use after all requests finished",
                name
            )))
        })?;
        let dir = workspace.finish().await?;
        let archive = self.archive_and_remove(&name, dir).await?;

        let report = SourceReport {
            name,
            fetched: counters.fetched.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            skipped,
            archive,
            peak_in_flight,
        };
        tracing::info!(
            source = %report.name,
            fetched = report.fetched,
            failed = report.failed,
            skipped = report.skipped,
            "source complete"
        );
        Ok(report)
    }

    /// Remove the workspace of a source that could not be read to the end
    async fn abandon(&self, workspace: Arc<SourceWorkspace>) {
        let dir = workspace.dir().to_path_buf();
        drop(workspace);
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            tracing::warn!(path = ?dir, error = %e, "failed to remove abandoned workspace");
        }
    }

    /// Zip the finished workspace next to it and delete the directory
    async fn archive_and_remove(&self, name: &str, dir: PathBuf) -> Result<PathBuf> {
        let target = self.settings.output_dir.join(format!("{}.zip", name));

        let source = dir.clone();
        let zip_target = target.clone();
        tokio::task::spawn_blocking(move || zip_directory(&source, &zip_target)).await??;

        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| Error::Cleanup {
                path: dir.clone(),
                source: e,
            })?;
        Ok(target)
    }
}

/// Everything one request task needs, moved into the pool
struct RequestTask {
    url: String,
    fetcher: Arc<dyn PageFetcher>,
    stats: Arc<RunStatistics>,
    workspace: Arc<SourceWorkspace>,
    counters: Arc<SourceCounters>,
    timeout: Duration,
    quiet: bool,
}

impl RequestTask {
    /// Fetch one URL and record the outcome; never fails
    async fn run(self) {
        if !self.quiet {
            tracing::info!(url = %self.url, "fetching");
        }

        match self.fetcher.fetch(&self.url, self.timeout).await {
            FetchOutcome::Success { body, .. } => {
                match self.workspace.persist(&self.url, &body).await {
                    Ok(saved) => {
                        self.stats.record_success();
                        self.counters.fetched.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(url = %self.url, id = %saved.id, "saved");
                    }
                    Err(e) => self.fail(e),
                }
            }
            FetchOutcome::Failure(e) => {
                tracing::debug!(url = e.url(), "request failed");
                self.fail(e)
            }
            FetchOutcome::TimedOut => self.fail(format!("timed out: {}", self.url)),
        }
    }

    fn fail(&self, message: impl std::fmt::Display) {
        self.stats.record_error(message);
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
    }
}
