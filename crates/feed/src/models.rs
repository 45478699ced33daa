// ABOUTME: Rust models for parsed feed data: Feed, FeedItem, and raw MediaRef pass-through.
// ABOUTME: FeedItem deserializes leniently from the JSON shapes common feed libraries emit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::time_parse::parse_flexible_time;

/// A raw media reference (enclosure, media:content, media:thumbnail) as it appeared in the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    #[serde(alias = "href")]
    pub url: String,
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl MediaRef {
    pub fn new(url: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            url: url.into(),
            mime_type,
        }
    }
}

/// A single item/entry within a feed.
///
/// Produced by the feed parser and never mutated afterwards. Description and
/// content are kept as raw markup; media tags are passed through uninterpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawFeedItem")]
pub struct FeedItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub link: String,
    pub guid: Option<String>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub enclosures: Vec<MediaRef>,
    pub media_content: Vec<MediaRef>,
    pub media_thumbnails: Vec<MediaRef>,
}

impl FeedItem {
    /// An item is usable when it carries a non-blank title or description.
    /// The parser keeps invalid items; callers decide whether to skip them.
    pub fn is_valid(&self) -> bool {
        non_blank(self.title.as_deref()).is_some() || non_blank(self.description.as_deref()).is_some()
    }

    /// Content if present and non-blank, otherwise the description.
    pub fn body(&self) -> Option<&str> {
        non_blank(self.content.as_deref()).or_else(|| non_blank(self.description.as_deref()))
    }
}

/// A parsed feed with metadata and items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub title: String,
    pub home_url: String,
    pub feed_url: String,
    pub description: String,
    pub language: Option<String>,
    pub items: Vec<FeedItem>,
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

/// Wire shape accepted when deserializing a FeedItem.
///
/// Feed libraries disagree on key names (`pubDate` vs `isoDate`, `enclosure`
/// as object vs list, `media:content` with attributes under `$`), and often
/// emit several of them at once, so every spelling gets its own slot here.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFeedItem {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    #[serde(rename = "content:encoded")]
    content_encoded: Option<String>,
    link: Option<String>,
    url: Option<String>,
    guid: Option<String>,
    id: Option<String>,
    author: Option<String>,
    creator: Option<String>,
    #[serde(rename = "dc:creator")]
    dc_creator: Option<String>,
    #[serde(deserialize_with = "lenient_strings")]
    categories: Vec<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "isoDate")]
    iso_date: Option<String>,
    #[serde(deserialize_with = "media_list")]
    enclosures: Vec<MediaRef>,
    #[serde(deserialize_with = "media_list")]
    enclosure: Vec<MediaRef>,
    #[serde(rename = "mediaContent", deserialize_with = "media_list")]
    media_content: Vec<MediaRef>,
    #[serde(rename = "media:content", deserialize_with = "media_list")]
    media_content_tag: Vec<MediaRef>,
    #[serde(rename = "mediaThumbnails", deserialize_with = "media_list")]
    media_thumbnails: Vec<MediaRef>,
    #[serde(rename = "media:thumbnail", deserialize_with = "media_list")]
    media_thumbnail_tag: Vec<MediaRef>,
}

impl From<RawFeedItem> for FeedItem {
    fn from(raw: RawFeedItem) -> Self {
        let published_at = [raw.published_at, raw.iso_date, raw.pub_date]
            .into_iter()
            .flatten()
            .find_map(|s| parse_flexible_time(&s));

        FeedItem {
            title: raw.title,
            description: raw.description,
            content: raw.content.or(raw.content_encoded),
            link: raw.link.or(raw.url).unwrap_or_default(),
            guid: raw.guid.or(raw.id),
            author: raw.author.or(raw.creator).or(raw.dc_creator),
            categories: raw.categories,
            published_at,
            enclosures: concat(raw.enclosures, raw.enclosure),
            media_content: concat(raw.media_content, raw.media_content_tag),
            media_thumbnails: concat(raw.media_thumbnails, raw.media_thumbnail_tag),
        }
    }
}

fn concat(mut a: Vec<MediaRef>, b: Vec<MediaRef>) -> Vec<MediaRef> {
    a.extend(b);
    a
}

/// One media entry: either flat `{url, type}` or attribute-wrapped `{"$": {url, type}}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMedia {
    Flat(MediaRef),
    Attrs {
        #[serde(rename = "$")]
        attrs: MediaRef,
    },
    Url(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

fn media_list<'de, D>(deserializer: D) -> Result<Vec<MediaRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<OneOrMany<RawMedia>> = Option::deserialize(deserializer)?;
    let entries = match raw {
        None => Vec::new(),
        Some(OneOrMany::One(m)) => vec![m],
        Some(OneOrMany::Many(v)) => v,
    };
    Ok(entries
        .into_iter()
        .map(|m| match m {
            RawMedia::Flat(r) | RawMedia::Attrs { attrs: r } => r,
            RawMedia::Url(url) => MediaRef::new(url, None),
        })
        .filter(|r| !r.url.trim().is_empty())
        .collect())
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<OneOrMany<serde_json::Value>> = Option::deserialize(deserializer)?;
    let values = match raw {
        None => Vec::new(),
        Some(OneOrMany::One(v)) => vec![v],
        Some(OneOrMany::Many(v)) => v,
    };
    Ok(values
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => map
                .get("_")
                .or_else(|| map.get("term"))
                .or_else(|| map.get("name"))
                .and_then(|t| t.as_str())
                .map(String::from),
            _ => None,
        })
        .collect())
}
