// ABOUTME: coinwire CLI: parse feeds, extract articles, format content, and ingest feeds as JSON.
// ABOUTME: Logs go to stderr through tracing so stdout carries only JSON.

mod config;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use coinwire_extract::{format, ingest_feeds, Client, MemoryStore};
use coinwire_feed::{parse_feed_bytes, Feed, FeedReader};
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "coinwire")]
#[command(about = "Crypto-news feed parsing and article extraction", long_about = None)]
struct Cli {
    /// TOML file overriding feed, extract and format defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output compact JSON instead of pretty.
    #[arg(long, global = true, default_value_t = false)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse RSS/Atom feeds from URLs or files ("-" reads stdin).
    Feeds {
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Extract and format one article.
    Article {
        url: String,

        /// JSON file holding the feed item for this article.
        #[arg(long)]
        feed_item: Option<PathBuf>,

        /// Make a single fetch attempt.
        #[arg(long)]
        no_fetch_retry: bool,

        /// Per-attempt fetch timeout.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Allow fetching from private/local networks.
        #[arg(long)]
        allow_private_networks: bool,
    },
    /// Format raw HTML or text from a file ("-" reads stdin).
    Format {
        input: String,

        #[arg(long)]
        preserve_formatting: bool,

        #[arg(long)]
        max_length: Option<usize>,
    },
    /// Fetch feeds and store new articles in an in-memory store.
    Ingest {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let (output, ok) = match cli.command {
        Command::Feeds { targets } => run_feeds(&config, &targets).await,
        Command::Article {
            url,
            feed_item,
            no_fetch_retry,
            timeout_ms,
            allow_private_networks,
        } => {
            let mut extract = config.extract.clone();
            if no_fetch_retry {
                if extract.max_retries > 1 {
                    tracing::info!(configured = extract.max_retries, "fetch retries disabled by flag");
                }
                extract.max_retries = 1;
            }
            if let Some(ms) = timeout_ms {
                extract.timeout_ms = ms;
            }
            extract.allow_private_networks |= allow_private_networks;

            let mut builder = Client::builder()
                .extract_options(extract)
                .format_options(config.format.clone());
            if let Some(min) = config.min_confidence {
                builder = builder.min_confidence(min);
            }

            let item_json = feed_item.as_deref().map(fs::read_to_string).transpose()?;
            let value = builder
                .build()
                .get_article_content_json(&url, item_json.as_deref())
                .await;
            let ok = value.get("error").is_none();
            (value, ok)
        }
        Command::Format {
            input,
            preserve_formatting,
            max_length,
        } => {
            let mut opts = config.format.clone();
            opts.preserve_formatting |= preserve_formatting;
            if let Some(max) = max_length {
                opts.max_length = max;
            }
            let raw = String::from_utf8_lossy(&load_bytes(&input)?).into_owned();
            (serde_json::to_value(format(&raw, &opts))?, true)
        }
        Command::Ingest { urls } => {
            let reader = FeedReader::new(config.feed.clone());
            let store = MemoryStore::new();
            let report = ingest_feeds(&reader, &store, &urls).await;
            let ok = report.feeds_failed.len() < urls.len();
            tracing::info!(
                inserted = report.inserted,
                failed_feeds = report.feeds_failed.len(),
                "ingest finished"
            );
            let articles = store.records().await;
            let value = json!({ "report": report, "articles": articles });
            (value, ok)
        }
    };

    if cli.compact {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run_feeds(config: &Config, targets: &[String]) -> (serde_json::Value, bool) {
    let reader = FeedReader::new(config.feed.clone());
    let urls: Vec<String> = targets.iter().filter(|t| is_url(t)).cloned().collect();
    let mut fetched = reader.fetch_feeds(&urls).await.into_iter();

    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        let result: Result<Feed> = if is_url(target) {
            fetched
                .next()
                .ok_or_else(|| anyhow!("no result for {}", target))
                .and_then(|o| o.result.map_err(anyhow::Error::new))
        } else {
            load_bytes(target)
                .and_then(|bytes| parse_feed_bytes(&bytes, target).map_err(anyhow::Error::new))
        };

        results.push(match result {
            Ok(feed) => json!({ "feedUrl": target, "ok": true, "feed": feed, "error": null }),
            Err(err) => {
                tracing::warn!(feed = %target, error = %err, "feed failed");
                json!({ "feedUrl": target, "ok": false, "feed": null, "error": err.to_string() })
            }
        });
    }

    let parsed = results.iter().filter(|r| r["ok"] == true).count();
    let failed = results.len() - parsed;
    let value = json!({
        "feeds": results,
        "totalFeeds": targets.len(),
        "parsed": parsed,
        "failed": failed,
    });
    (value, parsed > 0)
}

fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

fn load_bytes(target: &str) -> Result<Vec<u8>> {
    if target == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }

    let path = Path::new(target);
    if !path.exists() {
        return Err(anyhow!("file not found: {}", target));
    }
    Ok(fs::read(path)?)
}
