//! Runs every source through a bounded pool of source processors

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::PageFetcher;
use crate::pool::BoundedPool;
use crate::source::{SourceProcessor, SourceSettings};
use crate::stats::RunStatistics;
use crate::types::{RunSummary, SourceReport};
use crate::utils::source_name;

/// One entry of the input directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceEntry {
    /// Full path of the entry
    pub path: PathBuf,
    /// Whether the entry is a directory (directories are never processed)
    pub is_dir: bool,
}

impl SourceEntry {
    /// File name for operator messages
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// List the input directory, sorted by file name
///
/// Directories are returned (flagged) so the dispatcher can skip them. Files without
/// the configured source extension and the error log itself are left out, and so is
/// every file whose source name repeats an earlier one (`a.TXT` shadows `a.txt`).
pub fn discover_sources(config: &Config) -> Result<Vec<SourceEntry>> {
    let dir = &config.input_dir;
    debug!(?dir, "scanning for sources");

    let read_dir_error = |e: std::io::Error| Error::ReadDir {
        path: dir.clone(),
        source: e,
    };

    let error_log = std::fs::canonicalize(&config.error_log).ok();
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let path = entry.path();
        let is_dir = entry.file_type().map_err(read_dir_error)?.is_dir();

        if !is_dir {
            if !config.matches_source_extension(&path) {
                continue;
            }
            if error_log.is_some() && std::fs::canonicalize(&path).ok() == error_log {
                continue;
            }
        }
        entries.push(SourceEntry { path, is_dir });
    }

    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

    // Sources sharing a name would share a workspace and archive; the first one wins.
    let mut names = HashSet::new();
    entries.retain(|entry| {
        if entry.is_dir || names.insert(source_name(&entry.path)) {
            return true;
        }
        warn!(path = ?entry.path, "skipping source with a duplicate name");
        false
    });
    debug!("found {} entries", entries.len());
    Ok(entries)
}

/// Runs sources concurrently and aggregates the totals
pub struct Dispatcher {
    processor: SourceProcessor,
    stats: Arc<RunStatistics>,
    page_concurrency: usize,
    error_log: PathBuf,
}

impl Dispatcher {
    /// Create a dispatcher for `config`, sharing `fetcher` and `stats` with every source
    pub fn new(config: &Config, fetcher: Arc<dyn PageFetcher>, stats: Arc<RunStatistics>) -> Self {
        let processor =
            SourceProcessor::new(fetcher, Arc::clone(&stats), SourceSettings::from(config));
        Self {
            processor,
            stats,
            page_concurrency: config.page_concurrency,
            error_log: config.error_log.clone(),
        }
    }

    /// Process every non-directory entry exactly once and wait for all of them
    ///
    /// At most `page_concurrency` sources run at a time. A failing source is printed,
    /// logged and counted as one error; the others carry on.
    pub async fn run(&self, entries: Vec<SourceEntry>) -> Result<RunSummary> {
        let started = Instant::now();
        let mut pool = BoundedPool::new(self.page_concurrency);

        for entry in entries.into_iter().filter(|e| !e.is_dir) {
            let processor = self.processor.clone();
            let stats = Arc::clone(&self.stats);
            pool.spawn(async move {
                println!("-------> {}", entry.file_name());
                match processor.process(&entry.path).await {
                    Ok(report) => Some(report),
                    Err(e) => {
                        println!("{}", e);
                        stats.record_error(&e);
                        None
                    }
                }
            })
            .await?;
        }

        let peak_active_sources = pool.peak();
        let mut sources: Vec<SourceReport> = Vec::new();
        for result in pool.join().await {
            match result {
                Ok(Some(report)) => sources.push(report),
                Ok(None) => {}
                Err(e) => self.stats.record_error(format!("source task failed: {}", e)),
            }
        }
        sources.sort_by(|a, b| a.name.cmp(&b.name));

        let totals = self.stats.totals();
        let summary = RunSummary {
            total_successes: totals.successes,
            total_errors: totals.errors,
            elapsed: started.elapsed(),
            sources,
            peak_active_sources,
            error_log: self.error_log.clone(),
        };
        info!(
            successes = summary.total_successes,
            errors = summary.total_errors,
            elapsed = ?summary.elapsed,
            "run complete"
        );
        Ok(summary)
    }

    /// Enumerate the input directory of `config` and run every source found
    pub async fn run_dir(&self, config: &Config) -> Result<RunSummary> {
        let entries = discover_sources(config)?;
        self.run(entries).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ErrorLog;
    use crate::types::FetchOutcome;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fetcher that tracks how many distinct sources have a request in flight.
    ///
    /// Every URL is `http://<source>.test/...`, so the host names the source.
    #[derive(Default)]
    struct SourceTrackingFetcher {
        active_hosts: Mutex<Vec<String>>,
        max_active_sources: Mutex<usize>,
    }

    impl SourceTrackingFetcher {
        fn enter(&self, host: &str) {
            let mut active = self.active_hosts.lock().unwrap();
            active.push(host.to_string());
            let distinct: HashSet<&String> = active.iter().collect();
            let mut max = self.max_active_sources.lock().unwrap();
            *max = (*max).max(distinct.len());
        }

        fn leave(&self, host: &str) {
            let mut active = self.active_hosts.lock().unwrap();
            if let Some(pos) = active.iter().position(|h| h == host) {
                active.remove(pos);
            }
        }
    }

    #[async_trait::async_trait]
    impl PageFetcher for SourceTrackingFetcher {
        async fn fetch(&self, url: &str, _deadline: Duration) -> FetchOutcome {
            let host = url::Url::parse(url)
                .unwrap()
                .host_str()
                .unwrap()
                .to_string();
            self.enter(&host);
            tokio::time::sleep(Duration::from_millis(25)).await;
            self.leave(&host);
            FetchOutcome::Success {
                body: format!("<p>{url}</p>").into_bytes(),
                status: 200,
            }
        }
    }

    /// Panics for every URL on `boom.test`, answers everything else
    struct PanickingFetcher;

    #[async_trait::async_trait]
    impl PageFetcher for PanickingFetcher {
        async fn fetch(&self, url: &str, _deadline: Duration) -> FetchOutcome {
            if url.contains("boom.test") {
                panic!("fetcher blew up on {url}");
            }
            FetchOutcome::Success {
                body: b"<p></p>".to_vec(),
                status: 200,
            }
        }
    }

    fn config_for(dir: &std::path::Path, page_concurrency: usize) -> Config {
        let mut config = Config {
            input_dir: dir.to_path_buf(),
            output_dir: dir.to_path_buf(),
            error_log: dir.join("webcrawl.log"),
            page_concurrency,
            quiet: true,
            ..Default::default()
        };
        config.fetch.request_concurrency = 1;
        config
    }

    fn write_source(dir: &std::path::Path, name: &str, urls: usize) {
        let body: Vec<String> = (0..urls)
            .map(|i| format!("http://{name}.test/{i}"))
            .collect();
        std::fs::write(dir.join(format!("{name}.txt")), body.join("\n")).unwrap();
    }

    #[test]
    fn discover_skips_other_extensions_and_flags_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        write_source(tmp.path(), "b", 1);
        write_source(tmp.path(), "a", 1);
        std::fs::write(tmp.path().join("old.zip"), b"PK").unwrap();
        std::fs::write(tmp.path().join("webcrawl.log"), b"").unwrap();
        std::fs::create_dir(tmp.path().join("nested.txt")).unwrap();

        let entries = discover_sources(&config_for(tmp.path(), 2)).unwrap();
        let names: Vec<(String, bool)> = entries
            .iter()
            .map(|e| (e.file_name(), e.is_dir))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a.txt".to_string(), false),
                ("b.txt".to_string(), false),
                ("nested.txt".to_string(), true),
            ]
        );
    }

    #[test]
    fn discover_without_extension_filter_still_skips_error_log() {
        let tmp = tempfile::tempdir().unwrap();
        write_source(tmp.path(), "a", 1);
        std::fs::write(tmp.path().join("LIST"), "http://x.test/\n").unwrap();
        std::fs::write(tmp.path().join("webcrawl.log"), b"").unwrap();

        let mut config = config_for(tmp.path(), 2);
        config.source_extension.clear();
        let names: Vec<String> = discover_sources(&config)
            .unwrap()
            .iter()
            .map(SourceEntry::file_name)
            .collect();
        assert_eq!(names, vec!["LIST", "a.txt"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn discover_keeps_first_of_duplicate_source_names() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "http://a.test/lower\n").unwrap();
        std::fs::write(tmp.path().join("a.TXT"), "http://a.test/upper\n").unwrap();
        write_source(tmp.path(), "b", 1);

        let names: Vec<String> = discover_sources(&config_for(tmp.path(), 1))
            .unwrap()
            .iter()
            .map(SourceEntry::file_name)
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
    }

    #[test]
    fn discover_missing_dir_is_fatal_error() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(&tmp.path().join("missing"), 2);
        assert!(matches!(
            discover_sources(&config),
            Err(Error::ReadDir { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn active_sources_never_exceed_page_concurrency() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["s1", "s2", "s3", "s4", "s5", "s6"] {
            write_source(tmp.path(), name, 3);
        }
        let config = config_for(tmp.path(), 2);
        let fetcher = Arc::new(SourceTrackingFetcher::default());
        let stats = Arc::new(RunStatistics::new(ErrorLog::discard()));
        let dispatcher = Dispatcher::new(&config, fetcher.clone(), Arc::clone(&stats));

        let summary = dispatcher.run_dir(&config).await.unwrap();

        assert_eq!(summary.total_successes, 18);
        assert_eq!(summary.total_errors, 0);
        assert_eq!(summary.sources.len(), 6);
        assert!(summary.peak_active_sources <= 2);
        assert!(*fetcher.max_active_sources.lock().unwrap() <= 2);
        for name in ["s1", "s2", "s3", "s4", "s5", "s6"] {
            assert!(tmp.path().join(format!("{name}.zip")).exists());
            assert!(!tmp.path().join(name).exists());
        }
    }

    #[tokio::test]
    async fn failing_source_is_counted_and_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        write_source(tmp.path(), "good", 2);
        write_source(tmp.path(), "bad", 2);
        // A leftover workspace makes "bad" fail before any request is made.
        std::fs::create_dir(tmp.path().join("bad")).unwrap();

        let config = config_for(tmp.path(), 2);
        let stats = Arc::new(RunStatistics::new(
            ErrorLog::open(&config.error_log).unwrap(),
        ));
        let dispatcher = Dispatcher::new(
            &config,
            Arc::new(SourceTrackingFetcher::default()),
            Arc::clone(&stats),
        );

        let entries = discover_sources(&config).unwrap();
        // The leftover "bad" directory is listed but flagged, so only two lists run.
        assert_eq!(entries.iter().filter(|e| !e.is_dir).count(), 2);

        let summary = dispatcher.run(entries).await.unwrap();

        assert_eq!(summary.total_successes, 2);
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.sources.len(), 1);
        assert_eq!(summary.sources[0].name, "good");
        assert!(tmp.path().join("good.zip").exists());
        assert!(!tmp.path().join("bad.zip").exists());

        let log = std::fs::read_to_string(&config.error_log).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("error creating dir"));
    }

    #[tokio::test]
    async fn directories_are_skipped_without_work() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), 1);
        let dispatcher = Dispatcher::new(
            &config,
            Arc::new(SourceTrackingFetcher::default()),
            Arc::new(RunStatistics::new(ErrorLog::discard())),
        );

        let entries = vec![SourceEntry {
            path: tmp.path().join("somedir"),
            is_dir: true,
        }];
        let summary = dispatcher.run(entries).await.unwrap();

        assert_eq!(summary.total_successes, 0);
        assert_eq!(summary.total_errors, 0);
        assert!(summary.sources.is_empty());
        assert_eq!(summary.peak_active_sources, 0);
    }

    #[tokio::test]
    async fn panicking_source_counts_one_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_source(tmp.path(), "boom", 1);
        write_source(tmp.path(), "fine", 2);

        let config = config_for(tmp.path(), 2);
        let stats = Arc::new(RunStatistics::new(ErrorLog::discard()));
        let dispatcher = Dispatcher::new(&config, Arc::new(PanickingFetcher), Arc::clone(&stats));

        let summary = dispatcher.run_dir(&config).await.unwrap();

        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.total_successes, 2);
        let fine = summary.sources.iter().find(|r| r.name == "fine").unwrap();
        assert_eq!((fine.fetched, fine.failed), (2, 0));
        let boom = summary.sources.iter().find(|r| r.name == "boom").unwrap();
        assert_eq!((boom.fetched, boom.failed), (0, 1));
        assert!(tmp.path().join("fine.zip").exists());
        assert!(tmp.path().join("boom.zip").exists());
    }
}
