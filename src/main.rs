//! `webcrawl` command line entry point
//!
//! Every URL-list file in the input directory becomes one ZIP archive of the pages it
//! names. See the library crate for the engine itself.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use webcrawl::logging::init_logging;
use webcrawl::{Config, Dispatcher, ErrorLog, HttpFetcher, RunStatistics};

#[derive(Debug, Parser)]
#[command(name = "webcrawl", version)]
#[command(about = "Fetch every URL listed in a directory of text files into per-file ZIP archives")]
struct Cli {
    /// Maximum concurrent requests per source
    #[arg(short = 'r', long = "requests", env = "WEBCRAWL_REQUEST_CONCURRENCY")]
    request_concurrency: Option<usize>,

    /// Maximum sources processed concurrently
    #[arg(short = 'p', long = "pages", env = "WEBCRAWL_PAGE_CONCURRENCY")]
    page_concurrency: Option<usize>,

    /// Seconds before a request is aborted
    #[arg(short = 't', long = "timeout", env = "WEBCRAWL_TIMEOUT")]
    timeout_secs: Option<u64>,

    /// Do not print a line for every request
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,

    /// Directory holding the URL lists
    #[arg(long, env = "WEBCRAWL_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Directory receiving the archives
    #[arg(long, env = "WEBCRAWL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Error log, appended to on every run
    #[arg(long = "log-file", env = "WEBCRAWL_LOG_FILE")]
    error_log: Option<PathBuf>,

    /// Extension of source files; an empty value accepts every file
    #[arg(long = "extension")]
    source_extension: Option<String>,

    /// Lines containing this text (any case) are skipped
    #[arg(long = "skip")]
    skip_token: Option<String>,

    /// Count non-2xx responses as errors instead of saving them
    #[arg(long, default_value_t = false)]
    fail_on_http_error: bool,

    /// User-Agent header for every request
    #[arg(long)]
    user_agent: Option<String>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug diagnostics on stderr
    #[arg(long, default_value_t = false)]
    debug: bool,
}

/// Layer the flags over the config file (or the defaults) and validate the result
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config file {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(dir) = &cli.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(log) = &cli.error_log {
        config.error_log = log.clone();
    }
    if let Some(ext) = &cli.source_extension {
        config.source_extension = ext.trim_start_matches('.').to_string();
    }
    if let Some(p) = cli.page_concurrency {
        config.page_concurrency = p;
    }
    if cli.quiet {
        config.quiet = true;
    }
    if let Some(r) = cli.request_concurrency {
        config.fetch.request_concurrency = r;
    }
    if let Some(t) = cli.timeout_secs {
        config.fetch.timeout_secs = t;
    }
    if let Some(token) = &cli.skip_token {
        config.fetch.skip_token = token.clone();
    }
    if cli.fail_on_http_error {
        config.fetch.fail_on_http_error = true;
    }
    if let Some(agent) = &cli.user_agent {
        config.fetch.user_agent = agent.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(cli.debug)?;
    debug!(?config, "configuration loaded");

    let error_log = ErrorLog::open(&config.error_log)?;
    let stats = Arc::new(RunStatistics::new(error_log));
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let dispatcher = Dispatcher::new(&config, fetcher, Arc::clone(&stats));

    info!(
        input = ?config.input_dir,
        pages = config.page_concurrency,
        requests = config.fetch.request_concurrency,
        "starting run"
    );
    let summary = dispatcher.run_dir(&config).await?;
    println!("{}", summary);
    Ok(())
}
