// ABOUTME: HTTP feed fetching on top of the pure parser.
// ABOUTME: Fetches one feed or a batch concurrently, isolating per-feed failures.

use crate::error::FeedError;
use crate::models::Feed;
use crate::parser::parse_feed_bytes;
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;

/// Default user agent for feed requests.
pub const DEFAULT_USER_AGENT: &str = "coinwire-feed/0.1 (+https://github.com/coinwire)";

/// Options for the feed reader.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedReaderOptions {
    /// Per-feed request timeout in milliseconds.
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for FeedReaderOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Result of fetching one feed in a batch.
#[derive(Debug)]
pub struct FeedOutcome {
    pub url: String,
    pub result: Result<Feed, FeedError>,
}

/// Fetches and parses feeds over HTTP.
#[derive(Debug, Clone)]
pub struct FeedReader {
    client: reqwest::Client,
    opts: FeedReaderOptions,
}

impl Default for FeedReader {
    fn default() -> Self {
        Self::new(FeedReaderOptions::default())
    }
}

impl FeedReader {
    pub fn new(opts: FeedReaderOptions) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(&opts.user_agent)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .expect("failed to build HTTP client");
        Self { client, opts }
    }

    /// Uses a caller-supplied HTTP client (shared connection pool).
    pub fn with_client(client: reqwest::Client, opts: FeedReaderOptions) -> Self {
        Self { client, opts }
    }

    pub fn options(&self) -> &FeedReaderOptions {
        &self.opts
    }

    /// Fetches and parses a single feed.
    pub async fn fetch_feed(&self, url: &str) -> Result<Feed, FeedError> {
        let timeout = Duration::from_millis(self.opts.timeout_ms);
        let body = tokio::time::timeout(timeout, self.fetch_body(url))
            .await
            .map_err(|_| {
                FeedError::fetch(url, format!("timed out after {}ms", self.opts.timeout_ms))
            })??;

        let feed = parse_feed_bytes(&body, url)?;
        tracing::debug!(url, items = feed.items.len(), "parsed feed");
        Ok(feed)
    }

    async fn fetch_body(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::fetch(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::fetch(url, format!("HTTP status {}", status.as_u16())));
        }

        let bytes = resp.bytes().await.map_err(|e| FeedError::fetch(url, e))?;
        Ok(bytes.to_vec())
    }

    /// Fetches all feeds concurrently and returns one outcome per URL, in input order.
    pub async fn fetch_feeds(&self, urls: &[String]) -> Vec<FeedOutcome> {
        let futures = urls.iter().map(|url| async move {
            let result = self.fetch_feed(url).await;
            if let Err(ref e) = result {
                tracing::warn!(url = %url, error = %e, "feed fetch failed");
            }
            FeedOutcome {
                url: url.clone(),
                result,
            }
        });
        join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = FeedReaderOptions::default();
        assert_eq!(opts.timeout_ms, 15_000);
        assert_eq!(opts.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_options_deserialize_partial() {
        let opts: FeedReaderOptions = serde_json::from_str(r#"{"timeout_ms": 500}"#).unwrap();
        assert_eq!(opts.timeout_ms, 500);
        assert_eq!(opts.user_agent, DEFAULT_USER_AGENT);
    }
}
