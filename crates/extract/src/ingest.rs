// ABOUTME: Concurrent feed ingestion into an ArticleStore.
// ABOUTME: Per-feed failures are reported in the IngestReport and never abort the batch.

use coinwire_feed::{Feed, FeedItem, FeedReader};
use serde::Serialize;

use crate::store::{ArticleRecord, ArticleStore};

/// A feed that could not be fetched or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedFailure {
    pub url: String,
    pub error: String,
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub feeds_ok: usize,
    pub feeds_failed: Vec<FeedFailure>,
    pub items_seen: usize,
    pub inserted: usize,
    pub skipped_invalid: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

/// Fetches every feed concurrently and stores new, valid items.
pub async fn ingest_feeds<S>(reader: &FeedReader, store: &S, urls: &[String]) -> IngestReport
where
    S: ArticleStore + ?Sized,
{
    let mut report = IngestReport::default();

    for outcome in reader.fetch_feeds(urls).await {
        match outcome.result {
            Ok(feed) => {
                report.feeds_ok += 1;
                ingest_feed(store, &feed, &outcome.url, &mut report).await;
            }
            Err(err) => report.feeds_failed.push(FeedFailure {
                url: outcome.url,
                error: err.to_string(),
            }),
        }
    }

    tracing::info!(
        feeds_ok = report.feeds_ok,
        feeds_failed = report.feeds_failed.len(),
        inserted = report.inserted,
        skipped_existing = report.skipped_existing,
        failed = report.failed,
        "ingestion finished"
    );
    report
}

async fn ingest_feed<S>(store: &S, feed: &Feed, feed_url: &str, report: &mut IngestReport)
where
    S: ArticleStore + ?Sized,
{
    for item in &feed.items {
        report.items_seen += 1;
        ingest_item(store, item, feed_url, report).await;
    }
}

async fn ingest_item<S>(store: &S, item: &FeedItem, feed_url: &str, report: &mut IngestReport)
where
    S: ArticleStore + ?Sized,
{
    let Some(record) = ArticleRecord::from_item(item, feed_url) else {
        report.skipped_invalid += 1;
        return;
    };

    match store.contains(&record.url).await {
        Ok(true) => {
            report.skipped_existing += 1;
            return;
        }
        Ok(false) => {}
        Err(err) => {
            tracing::warn!(url = %record.url, error = %err, "store lookup failed");
            report.failed += 1;
            return;
        }
    }

    let url = record.url.clone();
    match store.insert(record).await {
        Ok(()) => report.inserted += 1,
        Err(err) if err.is_duplicate() => {
            tracing::debug!(url = %url, "article stored concurrently, skipping");
            report.skipped_existing += 1;
        }
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "store insert failed");
            report.failed += 1;
        }
    }
}
