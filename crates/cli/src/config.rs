// ABOUTME: TOML configuration for the coinwire CLI.
// ABOUTME: Every section is optional; missing fields fall back to the library defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use coinwire_extract::{ExtractOptions, FormatOptions};
use coinwire_feed::FeedReaderOptions;
use serde::Deserialize;

/// CLI configuration, e.g.
///
/// ```toml
/// min_confidence = 0.6
///
/// [extract]
/// max_retries = 2
///
/// [format]
/// max_length = 5000
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedReaderOptions,
    pub extract: ExtractOptions,
    pub format: FormatOptions,
    pub min_confidence: Option<f64>,
}

impl Config {
    /// Loads the config file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config =
            Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
