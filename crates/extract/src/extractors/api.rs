// ABOUTME: Pluggable reader-API hook consulted when no page strategy matches.
// ABOUTME: Implementations return article fields for a URL, or None when the service has nothing.

use async_trait::async_trait;

use crate::content::ArticleFields;
use crate::error::ExtractError;

/// A third-party article reader (e.g. a hosted readability service).
#[async_trait]
pub trait ReaderApi: Send + Sync {
    /// Returns article fields for `url`, or `None` if the service has no article.
    async fn fetch_article(&self, url: &str) -> Result<Option<ArticleFields>, ExtractError>;
}

/// A reader that serves fixed fields; useful for wiring and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticReader {
    pub fields: Option<ArticleFields>,
}

#[async_trait]
impl ReaderApi for StaticReader {
    async fn fetch_article(&self, _url: &str) -> Result<Option<ArticleFields>, ExtractError> {
        Ok(self.fields.clone())
    }
}
