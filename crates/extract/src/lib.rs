// ABOUTME: Main library entry point for coinwire article extraction.
// ABOUTME: Re-exports the public API: Client, ClientBuilder, ExtractedContent, format, synthesize, stores.

//! coinwire-extract - article content extraction for crypto-news feeds.
//!
//! Fetches an article page, runs structured-data, semantic and heuristic
//! strategies in order, falls back to the feed item or a placeholder, and
//! formats the result into clean text with reading metrics.
//!
//! # Example
//!
//! ```no_run
//! use coinwire_extract::{Client, ExtractError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ExtractError> {
//!     let client = Client::builder().build();
//!     let article = client
//!         .get_article_content("https://example.com/news/btc", None)
//!         .await?;
//!     println!("{} ({})", article.title, article.extraction_method);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod content;
pub mod dom;
pub mod error;
pub mod extractors;
pub mod fallback;
pub mod formatter;
pub mod ingest;
pub mod options;
pub mod resource;
pub mod store;

pub use crate::client::{ArticleResponse, Client};
pub use crate::content::{ArticleFields, ExtractedContent, ExtractionMethod};
pub use crate::error::{ErrorCode, ExtractError};
pub use crate::extractors::api::{ReaderApi, StaticReader};
pub use crate::fallback::synthesize;
pub use crate::formatter::{format, FormattedContent};
pub use crate::ingest::{ingest_feeds, FeedFailure, IngestReport};
pub use crate::options::{ClientBuilder, ExtractOptions, FormatOptions};
pub use crate::store::{ArticleRecord, ArticleStore, MemoryStore, StoreError};
