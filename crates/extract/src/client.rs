// ABOUTME: The Client orchestrating page fetch, strategy chain, fallbacks and formatting.
// ABOUTME: Exposes extract(), get_article_content() and the JSON contract get_article_content_json().

use std::net::ToSocketAddrs;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use coinwire_feed::FeedItem;
use serde::Serialize;

use crate::content::{ExtractedContent, ExtractionMethod};
use crate::dom::ScraperParser;
use crate::error::ExtractError;
use crate::extractors::api::ReaderApi;
use crate::extractors::feed::fields_from_item;
use crate::extractors::{extract_from_html, PageContext};
use crate::fallback::{final_fallback, synthesize};
use crate::formatter::{format, FormattedContent};
use crate::options::{ClientBuilder, ExtractOptions, FormatOptions};
use crate::resource::{fetch_with_retry, validate_url, FetchOptions, RetryPolicy};

/// Response of [`Client::get_article_content`].
///
/// The formatting fields are present only when there was content to format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub success: bool,
    pub content: String,
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub images: Vec<String>,
    pub confidence: f64,
    pub extraction_method: ExtractionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_links: Option<bool>,
}

impl ArticleResponse {
    fn new(extracted: ExtractedContent, formatted: Option<FormattedContent>) -> Self {
        let mut resp = Self {
            success: extracted.success,
            content: extracted.content,
            title: extracted.title,
            description: extracted.description,
            author: extracted.author,
            source: extracted.source,
            published_at: extracted.published_at,
            images: extracted.images,
            confidence: extracted.confidence,
            extraction_method: extracted.extraction_method,
            excerpt: None,
            word_count: None,
            reading_time: None,
            language: None,
            has_images: None,
            has_links: None,
        };

        if let Some(f) = formatted {
            resp.content = f.content;
            if resp.title.is_empty() {
                resp.title = f.title;
            }
            if resp.description.is_empty() {
                resp.description = f.description;
            }
            resp.excerpt = Some(f.excerpt);
            resp.word_count = Some(f.word_count);
            resp.reading_time = Some(f.reading_time);
            resp.language = Some(f.language);
            resp.has_images = Some(f.has_images);
            resp.has_links = Some(f.has_links);
        }
        resp
    }
}

/// Extracts article content for crypto-news URLs.
#[derive(Clone)]
pub struct Client {
    extract: ExtractOptions,
    format: FormatOptions,
    min_confidence: f64,
    http_client: reqwest::Client,
    reader_api: Option<Arc<dyn ReaderApi>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientBuilder::new())
    }
}

impl Client {
    /// Create a new ClientBuilder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client from a builder.
    pub fn new(builder: ClientBuilder) -> Self {
        let ClientBuilder {
            extract,
            format,
            min_confidence,
            http_client,
            reader_api,
        } = builder;

        let http_client = http_client.unwrap_or_else(|| build_http_client(&extract));

        Self {
            extract,
            format,
            min_confidence,
            http_client,
            reader_api,
        }
    }

    pub fn extract_options(&self) -> &ExtractOptions {
        &self.extract
    }

    pub fn format_options(&self) -> &FormatOptions {
        &self.format
    }

    /// Extract content for `url`, falling back through the reader API, the feed
    /// item and finally a placeholder. Never fails.
    pub async fn extract(&self, url: &str, item: Option<&FeedItem>) -> ExtractedContent {
        let fetch_opts = FetchOptions::from(&self.extract);
        let policy = RetryPolicy::from(&self.extract);

        let fetch_failed =
            match fetch_with_retry(&self.http_client, url, &fetch_opts, &policy).await {
                Ok(page) => {
                    let ctx = PageContext {
                        url: &page.final_url,
                        include_images: self.extract.include_images,
                    };
                    if let Some(found) =
                        extract_from_html(&ScraperParser::default(), &page.text(), &ctx)
                    {
                        tracing::debug!(url, method = %found.extraction_method, "page strategy matched");
                        return found;
                    }
                    false
                }
                Err(err) => {
                    tracing::debug!(url, error = %err, "page unavailable");
                    true
                }
            };

        if let Some(api) = &self.reader_api {
            match api.fetch_article(url).await {
                Ok(Some(fields)) if !fields.content.trim().is_empty() => {
                    return ExtractedContent::new(fields, ExtractionMethod::Api);
                }
                Ok(_) => {}
                Err(err) => tracing::debug!(url, error = %err, "reader API failed"),
            }
        }

        if let Some(item) = item {
            if fetch_failed || self.extract.fallback_to_feed {
                let mut fields = fields_from_item(item, self.extract.include_images);
                if fields.source.is_none() {
                    fields.source = coinwire_feed::source_name(url);
                }
                return ExtractedContent::new(fields, ExtractionMethod::FeedFallback);
            }
        }

        final_fallback(url)
    }

    /// Validate `url`, extract, replace low-confidence results with a
    /// synthesized fallback, then format the content.
    ///
    /// Only invalid input is an error.
    pub async fn get_article_content(
        &self,
        url: &str,
        item: Option<&FeedItem>,
    ) -> Result<ArticleResponse, ExtractError> {
        validate_url(url, "GetArticleContent")?;

        let mut extracted = self.extract(url, item).await;
        if extracted.confidence < self.min_confidence {
            tracing::debug!(
                url,
                method = %extracted.extraction_method,
                confidence = extracted.confidence,
                "below minimum confidence, synthesizing fallback"
            );
            extracted = synthesize(url, item, &self.extract);
        }

        let formatted = (!extracted.content.trim().is_empty()).then(|| {
            let raw = extracted.html.as_deref().unwrap_or(&extracted.content);
            format(raw, &self.format)
        });

        Ok(ArticleResponse::new(extracted, formatted))
    }

    /// JSON contract over [`Client::get_article_content`].
    ///
    /// `feed_item_json` is a serialized feed item. Every error, including a
    /// malformed feed item, becomes `{"success": false, "error": "..."}`.
    pub async fn get_article_content_json(
        &self,
        url: &str,
        feed_item_json: Option<&str>,
    ) -> serde_json::Value {
        let item = match feed_item_json
            .map(serde_json::from_str::<FeedItem>)
            .transpose()
        {
            Ok(item) => item,
            Err(e) => {
                let err = ExtractError::invalid_input(
                    url,
                    "GetArticleContent",
                    Some(anyhow::anyhow!("malformed feed item: {}", e)),
                );
                return error_json(&err.to_string());
            }
        };

        match self.get_article_content(url, item.as_ref()).await {
            Ok(resp) => serde_json::to_value(&resp).unwrap_or_else(|e| error_json(&e.to_string())),
            Err(err) => error_json(&err.to_string()),
        }
    }
}

fn error_json(message: &str) -> serde_json::Value {
    serde_json::json!({ "success": false, "error": message })
}

fn build_http_client(opts: &ExtractOptions) -> reqwest::Client {
    let allow_private = opts.allow_private_networks;
    let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
        if allow_private {
            return attempt.follow();
        }
        let next = attempt.url().clone();
        let Some(host) = next.host_str() else {
            return attempt.follow();
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            if crate::resource::is_private_ip(&ip) {
                return attempt.error("redirect to private IP blocked");
            }
            return attempt.follow();
        }
        // synchronous DNS resolution; the redirect policy cannot await
        let port = next.port_or_known_default().unwrap_or(80);
        match (host, port).to_socket_addrs() {
            Ok(mut addrs) => {
                if addrs.any(|sa| crate::resource::is_private_ip(&sa.ip())) {
                    attempt.error("redirect to private IP blocked")
                } else {
                    attempt.follow()
                }
            }
            Err(_) => attempt.error("DNS lookup failed during redirect"),
        }
    });

    reqwest::Client::builder()
        .redirect(redirect_policy)
        .user_agent(&opts.user_agent)
        .timeout(opts.timeout())
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .expect("failed to build HTTP client")
}
