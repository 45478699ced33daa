// ABOUTME: Configuration for extraction and formatting: ExtractOptions, FormatOptions, and ClientBuilder.
// ABOUTME: Option structs deserialize with defaults so partial config files work; ClientBuilder is the fluent API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::client::Client;
use crate::extractors::api::ReaderApi;

/// Default User-Agent for page fetches.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; coinwire/0.1; +https://github.com/coinwire)";

/// Results scoring below this are replaced by the fallback synthesizer.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Options for content extraction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Per-attempt page fetch timeout in milliseconds.
    pub timeout_ms: u64,
    /// Number of fetch attempts including the first one, not retries after it.
    /// `3` means one request plus at most two retries; `0` is treated as `1`.
    pub max_retries: u32,
    pub include_images: bool,
    /// Use the feed item even when the page fetch succeeded but no strategy matched.
    pub fallback_to_feed: bool,
    /// Backoff base; the sleep after failed attempt n is `base * 2^n`.
    pub retry_base_delay_ms: u64,
    pub user_agent: String,
    pub allow_private_networks: bool,
    pub headers: HashMap<String, String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            max_retries: 3,
            include_images: true,
            fallback_to_feed: true,
            retry_base_delay_ms: 1_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_private_networks: false,
            headers: HashMap::new(),
        }
    }
}

impl ExtractOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Options for the content formatter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Maximum body length in characters before truncation.
    pub max_length: usize,
    /// Keep sanitized markup instead of plain text.
    pub preserve_formatting: bool,
    pub remove_ads: bool,
    pub remove_social: bool,
    pub remove_comments: bool,
    pub add_line_breaks: bool,
    pub detect_language: bool,
    pub extract_links: bool,
    pub extract_images: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            max_length: 10_000,
            preserve_formatting: false,
            remove_ads: true,
            remove_social: true,
            remove_comments: true,
            add_line_breaks: true,
            detect_language: true,
            extract_links: true,
            extract_images: true,
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Clone)]
pub struct ClientBuilder {
    pub(crate) extract: ExtractOptions,
    pub(crate) format: FormatOptions,
    pub(crate) min_confidence: f64,
    pub(crate) http_client: Option<reqwest::Client>,
    pub(crate) reader_api: Option<Arc<dyn ReaderApi>>,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self {
            extract: ExtractOptions::default(),
            format: FormatOptions::default(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            http_client: None,
            reader_api: None,
        }
    }

    /// Replace all extraction options.
    pub fn extract_options(mut self, opts: ExtractOptions) -> Self {
        self.extract = opts;
        self
    }

    /// Replace all formatting options.
    pub fn format_options(mut self, opts: FormatOptions) -> Self {
        self.format = opts;
        self
    }

    /// Set the per-attempt fetch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.extract.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the number of fetch attempts, counting the first request.
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.extract.max_retries = attempts;
        self
    }

    /// Set the backoff base delay.
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.extract.retry_base_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn include_images(mut self, include: bool) -> Self {
        self.extract.include_images = include;
        self
    }

    pub fn fallback_to_feed(mut self, enabled: bool) -> Self {
        self.extract.fallback_to_feed = enabled;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.extract.user_agent = user_agent.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.extract.allow_private_networks = allow;
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extract.headers.insert(key.into(), value.into());
        self
    }

    /// Set the confidence below which results are replaced by a synthesized fallback.
    pub fn min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = min;
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Consult a reader API when no page strategy matches.
    pub fn reader_api(mut self, api: Arc<dyn ReaderApi>) -> Self {
        self.reader_api = Some(api);
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Client {
        Client::new(self)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
