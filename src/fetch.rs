//! Guarded page fetching: one GET request raced against a deadline
//!
//! [`PageFetcher`] is the seam between the engine and the network. The production
//! implementation, [`HttpFetcher`], wraps a shared `reqwest::Client`; tests plug in
//! their own fetchers to observe concurrency without a network.

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::types::FetchOutcome;
use std::time::Duration;
use url::Url;

/// Abstraction over fetching a single page, enabling testability
///
/// Implementations must not panic or return early on errors: every problem is turned
/// into [`FetchOutcome::Failure`] or [`FetchOutcome::TimedOut`].
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Attempt exactly one GET of `url`, giving up after `deadline`
    async fn fetch(&self, url: &str, deadline: Duration) -> FetchOutcome;
}

/// Production [`PageFetcher`] backed by reqwest
///
/// The client has no global timeout. The deadline is applied per call so the
/// timed-out URL can be named and its request cancelled individually.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    fail_on_http_error: bool,
}

impl HttpFetcher {
    /// Build a fetcher from the request settings
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::with_client(client, config.fail_on_http_error))
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client, fail_on_http_error: bool) -> Self {
        Self {
            client,
            fail_on_http_error,
        }
    }

    /// Send the request and read the whole body
    async fn get(&self, url: Url, raw: &str) -> std::result::Result<(u16, Vec<u8>), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: raw.to_string(),
                source: e,
            })?;

        let status = response.status();
        if self.fail_on_http_error && !status.is_success() {
            // Dropping the response closes the stream without reading the body.
            return Err(FetchError::Status {
                url: raw.to_string(),
                status: status.as_u16(),
            });
        }

        // `bytes` consumes the response, so the stream is closed on both paths.
        let body = response.bytes().await.map_err(|e| FetchError::Body {
            url: raw.to_string(),
            source: e,
        })?;
        Ok((status.as_u16(), body.to_vec()))
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, raw: &str, deadline: Duration) -> FetchOutcome {
        let url = match Url::parse(raw) {
            Ok(u) => u,
            Err(e) => {
                return FetchOutcome::Failure(FetchError::InvalidUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        // When the timer wins, the request future is dropped here, which aborts the
        // in-flight request and releases its connection.
        match tokio::time::timeout(deadline, self.get(url, raw)).await {
            Ok(Ok((status, body))) => {
                tracing::debug!(url = raw, status, bytes = body.len(), "fetched");
                FetchOutcome::Success { body, status }
            }
            Ok(Err(e)) => FetchOutcome::Failure(e),
            Err(_) => {
                tracing::warn!(url = raw, ?deadline, "aborting request");
                FetchOutcome::TimedOut
            }
        }
    }
}
