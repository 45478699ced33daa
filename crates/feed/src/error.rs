// ABOUTME: Error types for feed fetching and parsing operations.
// ABOUTME: Provides FeedError with Fetch and Parse variants, surfaced per feed to callers.

use std::fmt;
use thiserror::Error;

/// Errors that can occur while reading a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed could not be retrieved (network failure, timeout, non-2xx status).
    #[error("failed to fetch feed {url}: {message}")]
    Fetch { url: String, message: String },

    /// The feed body was retrieved but is not well-formed RSS/Atom/JSON Feed.
    #[error("failed to parse feed: {0}")]
    Parse(String),
}

impl FeedError {
    /// Creates a Parse error from an underlying feed-rs error.
    pub fn parse(err: impl fmt::Display) -> Self {
        FeedError::Parse(err.to_string())
    }

    /// Creates a Fetch error for the given URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        FeedError::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        matches!(self, FeedError::Fetch { .. })
    }

    /// Returns true if this is a Parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, FeedError::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display_names_url() {
        let err = FeedError::fetch("https://example.com/rss", "HTTP status 503");
        assert!(err.is_fetch());
        assert_eq!(
            err.to_string(),
            "failed to fetch feed https://example.com/rss: HTTP status 503"
        );
    }

    #[test]
    fn parse_error_wraps_message() {
        let err = FeedError::parse("unexpected end of input");
        assert!(err.is_parse());
        assert_eq!(err.to_string(), "failed to parse feed: unexpected end of input");
    }
}
