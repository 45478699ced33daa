// ABOUTME: Feed reading library for coinwire.
// ABOUTME: Provides feed parsing and fetching, media pass-through, image resolution, and HTML text utilities.

pub mod error;
pub mod fetch;
pub mod html_utils;
pub mod image;
pub mod media_ext;
pub mod models;
pub mod parser;
pub mod time_parse;

pub use error::FeedError;
pub use fetch::{FeedOutcome, FeedReader, FeedReaderOptions};
pub use html_utils::{
    collapse_whitespace, decode_entities, normalize_paragraphs, strip_html, strip_html_paragraphs,
};
pub use image::{resolve_image, resolve_image_url, resolve_images};
pub use models::{Feed, FeedItem, MediaRef};
pub use parser::parse_feed_bytes;
pub use time_parse::parse_flexible_time;

// ----------------------------------------------------------------------------
// URL utilities
// ----------------------------------------------------------------------------

use url::Url;

/// Derives a display source name from a URL: its host without a leading `www.`.
pub fn source_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name() {
        assert_eq!(
            source_name("https://www.coindesk.com/markets/x").as_deref(),
            Some("coindesk.com")
        );
        assert_eq!(source_name("mailto:someone@example.com"), None);
        assert_eq!(source_name(""), None);
    }
}
