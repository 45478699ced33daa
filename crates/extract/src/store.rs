// ABOUTME: Article store abstraction used by feed ingestion, plus an in-memory implementation.
// ABOUTME: ArticleRecord is built from valid feed items; Duplicate signals a benign insert race.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coinwire_feed::{resolve_image, source_name, strip_html, FeedItem};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer stored the same URL first.
    #[error("article already stored: {0}")]
    Duplicate(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }
}

/// A stored article summary, keyed by URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub feed_url: String,
}

impl ArticleRecord {
    /// Builds a record from a feed item. Returns None for invalid items or items without a link.
    pub fn from_item(item: &FeedItem, feed_url: &str) -> Option<Self> {
        if !item.is_valid() || item.link.trim().is_empty() {
            return None;
        }
        Some(Self {
            url: item.link.trim().to_string(),
            title: item.title.as_deref().map(strip_html).unwrap_or_default(),
            description: item.description.as_deref().map(strip_html).unwrap_or_default(),
            image: resolve_image(item),
            published_at: item.published_at,
            source: source_name(&item.link),
            feed_url: feed_url.to_string(),
        })
    }
}

/// Persistence collaborator for ingested articles.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn contains(&self, url: &str) -> Result<bool, StoreError>;

    /// Stores a record. Fails with [`StoreError::Duplicate`] if the URL is already present.
    async fn insert(&self, record: ArticleRecord) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ArticleRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn get(&self, url: &str) -> Option<ArticleRecord> {
        self.records.read().await.get(url).cloned()
    }

    /// All records, newest first.
    pub async fn records(&self) -> Vec<ArticleRecord> {
        let mut out: Vec<ArticleRecord> = self.records.read().await.values().cloned().collect();
        out.sort_by(|a, b| b.published_at.cmp(&a.published_at).then_with(|| a.url.cmp(&b.url)));
        out
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn contains(&self, url: &str) -> Result<bool, StoreError> {
        Ok(self.records.read().await.contains_key(url))
    }

    async fn insert(&self, record: ArticleRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.url) {
            return Err(StoreError::Duplicate(record.url));
        }
        records.insert(record.url.clone(), record);
        Ok(())
    }
}
