// ABOUTME: Extraction result types: ExtractionMethod tags with fixed confidences and ExtractedContent.
// ABOUTME: Results are only built through ExtractionMethod so confidence always matches the method.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// The strategy that produced an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    StructuredData,
    SemanticSelector,
    FeedFallback,
    Api,
    Heuristic,
    FinalFallback,
    Fallback,
}

impl ExtractionMethod {
    /// The fixed confidence score for this method.
    pub fn confidence(self) -> f64 {
        match self {
            ExtractionMethod::StructuredData => 0.9,
            ExtractionMethod::SemanticSelector => 0.8,
            ExtractionMethod::FeedFallback | ExtractionMethod::Api => 0.7,
            ExtractionMethod::Heuristic => 0.6,
            ExtractionMethod::FinalFallback | ExtractionMethod::Fallback => 0.3,
        }
    }

    /// Whether a result from this method counts as a successful extraction.
    pub fn is_success(self) -> bool {
        !self.is_fallback()
    }

    /// True for the placeholder-producing variants.
    pub fn is_fallback(self) -> bool {
        matches!(
            self,
            ExtractionMethod::FinalFallback | ExtractionMethod::Fallback
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::StructuredData => "structured-data",
            ExtractionMethod::SemanticSelector => "semantic-selector",
            ExtractionMethod::FeedFallback => "feed-fallback",
            ExtractionMethod::Api => "api",
            ExtractionMethod::Heuristic => "heuristic",
            ExtractionMethod::FinalFallback => "final-fallback",
            ExtractionMethod::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields a strategy found, before a method and confidence are attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFields {
    pub title: String,
    pub description: String,
    /// Plain text body.
    pub content: String,
    /// Cleaned markup the body was derived from, when there was any.
    pub html: Option<String>,
    pub images: Vec<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

impl ArticleFields {
    /// Appends an image URL unless it is blank or already present.
    pub fn push_image(&mut self, url: impl Into<String>) {
        let url = url.into();
        let url = url.trim();
        if !url.is_empty() && !self.images.iter().any(|u| u == url) {
            self.images.push(url.to_string());
        }
    }

    /// Fills empty fields from another set of fields.
    pub fn fill_from(&mut self, other: &ArticleFields) {
        if self.title.is_empty() {
            self.title = other.title.clone();
        }
        if self.description.is_empty() {
            self.description = other.description.clone();
        }
        if self.author.is_none() {
            self.author = other.author.clone();
        }
        if self.published_at.is_none() {
            self.published_at = other.published_at;
        }
        if self.source.is_none() {
            self.source = other.source.clone();
        }
        for img in &other.images {
            self.push_image(img.as_str());
        }
    }
}

/// The outcome of content extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedContent {
    pub title: String,
    pub description: String,
    pub content: String,
    pub images: Vec<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub success: bool,
    pub extraction_method: ExtractionMethod,
    pub confidence: f64,
    #[serde(skip)]
    pub html: Option<String>,
}

impl ExtractedContent {
    /// Tags fields with a method; success and confidence follow from the method.
    pub fn new(fields: ArticleFields, method: ExtractionMethod) -> Self {
        Self {
            title: fields.title,
            description: fields.description,
            content: fields.content,
            images: fields.images,
            author: fields.author,
            published_at: fields.published_at,
            source: fields.source,
            success: method.is_success(),
            extraction_method: method,
            confidence: method.confidence(),
            html: fields.html,
        }
    }
}
