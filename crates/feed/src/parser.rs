// ABOUTME: Feed parsing implementation using feed-rs.
// ABOUTME: Maps feed-rs entries to FeedItem, keeping raw markup and media tags uninterpreted.

use crate::error::FeedError;
use crate::media_ext::{parse_media_extensions, ItemMedia};
use crate::models::{Feed, FeedItem, MediaRef};
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Link, Person};

/// Parses feed bytes into a Feed.
///
/// # Arguments
/// * `data` - Raw feed bytes (RSS, Atom, or JSON Feed)
/// * `feed_url` - The URL the feed was fetched from (stored as-is)
///
/// Items missing a publish date are stamped with the parse time. No item is
/// dropped: the item count always equals the number of item/entry elements.
pub fn parse_feed_bytes(data: &[u8], feed_url: &str) -> Result<Feed, FeedError> {
    parse_feed_bytes_at(data, feed_url, Utc::now())
}

/// Same as [`parse_feed_bytes`] with an explicit fetch time.
pub fn parse_feed_bytes_at(
    data: &[u8],
    feed_url: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Feed, FeedError> {
    let parsed = feed_rs::parser::parse(data).map_err(FeedError::parse)?;

    // feed-rs merges <enclosure> into media objects; recover tag kinds from raw XML
    let media = parse_media_extensions(data);

    let items = parsed
        .entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let mut item_media = media.for_item(&entry.id, idx);
            merge_feed_rs_media(entry, &mut item_media);
            map_entry(entry, item_media, fetched_at)
        })
        .collect();

    Ok(Feed {
        title: parsed.title.map(|t| t.content).unwrap_or_default(),
        home_url: extract_home_url(&parsed.links),
        feed_url: feed_url.to_string(),
        description: parsed.description.map(|d| d.content).unwrap_or_default(),
        language: parsed.language,
        items,
    })
}

/// Adds media that feed-rs found but the raw pass did not (e.g. JSON Feed
/// attachments, or XML the raw pass could not follow).
fn merge_feed_rs_media(entry: &Entry, media: &mut ItemMedia) {
    let known = |media: &ItemMedia, url: &str| {
        media
            .enclosures
            .iter()
            .chain(&media.media_content)
            .chain(&media.media_thumbnails)
            .any(|m| m.url == url)
    };

    for link in entry.links.iter().filter(|l| is_enclosure_link(l)) {
        if !known(media, &link.href) {
            media
                .enclosures
                .push(MediaRef::new(link.href.clone(), link.media_type.clone()));
        }
    }

    for object in &entry.media {
        for content in &object.content {
            if let Some(ref url) = content.url {
                let url = url.to_string();
                if !known(media, &url) {
                    let mime = content.content_type.as_ref().map(|m| m.to_string());
                    media.media_content.push(MediaRef::new(url, mime));
                }
            }
        }
        for thumb in &object.thumbnails {
            if !known(media, &thumb.image.uri) {
                media
                    .media_thumbnails
                    .push(MediaRef::new(thumb.image.uri.clone(), None));
            }
        }
    }
}

/// Checks if a link is an enclosure link.
fn is_enclosure_link(link: &Link) -> bool {
    link.rel.as_deref() == Some("enclosure")
}

/// Extracts the home URL from feed links.
/// Prefers link with rel="alternate", otherwise uses first link href.
fn extract_home_url(links: &[Link]) -> String {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
        .unwrap_or_default()
}

/// Extracts the item URL from entry links.
/// Prefers rel="alternate", then the first non-enclosure link, then an id that looks like a URL.
fn extract_item_url(entry: &Entry) -> String {
    if let Some(link) = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.iter().find(|l| !is_enclosure_link(l)))
    {
        return link.href.clone();
    }

    if entry.id.starts_with("http://") || entry.id.starts_with("https://") {
        return entry.id.clone();
    }
    String::new()
}

/// Display name of a feed person.
/// feed-rs stores RSS `<author>` text as the email with the placeholder name "author".
fn person_name(person: &Person) -> String {
    let name = person.name.trim();
    let email = person.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    match email {
        Some(email) if name.is_empty() || name == "author" => email.to_string(),
        _ => person.name.clone(),
    }
}

fn map_entry(entry: &Entry, media: ItemMedia, fetched_at: DateTime<Utc>) -> FeedItem {
    let author = entry
        .authors
        .first()
        .map(person_name)
        .or_else(|| {
            entry
                .media
                .iter()
                .find_map(|m| m.credits.first().map(|c| c.entity.clone()))
        })
        .filter(|name| !name.trim().is_empty());

    let content = entry.content.as_ref().and_then(|c| c.body.clone());

    FeedItem {
        title: entry.title.as_ref().map(|t| t.content.clone()),
        description: entry.summary.as_ref().map(|t| t.content.clone()),
        content,
        link: extract_item_url(entry),
        guid: (!entry.id.is_empty()).then(|| entry.id.clone()),
        author,
        categories: entry.categories.iter().map(|c| c.term.clone()).collect(),
        published_at: Some(entry.published.or(entry.updated).unwrap_or(fetched_at)),
        enclosures: media.enclosures,
        media_content: media.media_content,
        media_thumbnails: media.media_thumbnails,
    }
}
