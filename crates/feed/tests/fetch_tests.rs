// ABOUTME: Integration tests for HTTP feed fetching.
// ABOUTME: Uses httpmock to check status handling, timeouts, and per-feed isolation in batches.

use coinwire_feed::{FeedReader, FeedReaderOptions};
use httpmock::prelude::*;

const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Mock Feed</title><link>https://mock.example.com</link>
    <item><title>One</title><link>https://mock.example.com/1</link><guid>1</guid></item>
    <item><title>Two</title><link>https://mock.example.com/2</link><guid>2</guid></item>
</channel></rss>"#;

#[tokio::test]
async fn fetch_feed_parses_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/rss");
        then.status(200)
            .header("content-type", "application/rss+xml")
            .body(RSS);
    });

    let reader = FeedReader::default();
    let feed = reader.fetch_feed(&server.url("/rss")).await.unwrap();
    mock.assert();

    assert_eq!(feed.title, "Mock Feed");
    assert_eq!(feed.items.len(), 2);
    assert_eq!(feed.feed_url, server.url("/rss"));
}

#[tokio::test]
async fn fetch_feed_non_2xx_is_fetch_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/gone");
        then.status(404).body("not here");
    });

    let reader = FeedReader::default();
    let err = reader.fetch_feed(&server.url("/gone")).await.unwrap_err();
    assert!(err.is_fetch());
    assert!(err.to_string().contains("404"), "{}", err);
}

#[tokio::test]
async fn fetch_feed_times_out() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200)
            .delay(std::time::Duration::from_millis(1500))
            .body(RSS);
    });

    let reader = FeedReader::new(FeedReaderOptions {
        timeout_ms: 100,
        ..Default::default()
    });
    let err = reader.fetch_feed(&server.url("/slow")).await.unwrap_err();
    assert!(err.is_fetch());
}

#[tokio::test]
async fn fetch_feeds_isolates_failures_and_keeps_order() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/good");
        then.status(200).body(RSS);
    });
    server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(200).body("<html>definitely not a feed");
    });
    server.mock(|when, then| {
        when.method(GET).path("/down");
        then.status(503);
    });

    let urls = vec![
        server.url("/broken"),
        server.url("/good"),
        server.url("/down"),
    ];
    let reader = FeedReader::default();
    let outcomes = reader.fetch_feeds(&urls).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].url, urls[0]);
    assert_eq!(outcomes[1].url, urls[1]);
    assert_eq!(outcomes[2].url, urls[2]);

    assert!(outcomes[0].result.as_ref().unwrap_err().is_parse());
    assert_eq!(outcomes[1].result.as_ref().unwrap().items.len(), 2);
    assert!(outcomes[2].result.as_ref().unwrap_err().is_fetch());
}

#[tokio::test]
async fn fetch_feeds_empty_batch() {
    let reader = FeedReader::default();
    assert!(reader.fetch_feeds(&[]).await.is_empty());
}
