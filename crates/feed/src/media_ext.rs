// ABOUTME: Raw XML pass over a feed collecting enclosure and Media RSS tags per item.
// ABOUTME: feed-rs folds enclosures into media objects, so the original tag kinds are recovered here.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

use crate::html_utils::decode_entities;
use crate::models::MediaRef;

/// Media tags found inside one `<item>` / `<entry>`, in document order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ItemMedia {
    pub enclosures: Vec<MediaRef>,
    pub media_content: Vec<MediaRef>,
    pub media_thumbnails: Vec<MediaRef>,
}

/// Media tags for every item of a feed.
#[derive(Debug, Default, Clone)]
pub struct ParsedMedia {
    /// Keyed by the item's guid (RSS) or id (Atom).
    pub by_guid: HashMap<String, ItemMedia>,
    /// Every item in document order, used when the guid lookup misses.
    pub by_index: Vec<ItemMedia>,
}

impl ParsedMedia {
    /// Looks up the media for an item by guid, falling back to its position.
    pub fn for_item(&self, guid: &str, index: usize) -> ItemMedia {
        self.by_guid
            .get(guid)
            .or_else(|| self.by_index.get(index))
            .cloned()
            .unwrap_or_default()
    }
}

/// Scans raw feed bytes for `<enclosure>`, Atom `<link rel="enclosure">`,
/// `<media:content>` and `<media:thumbnail>` inside items. Malformed XML stops
/// the scan and returns whatever was collected so far.
pub fn parse_media_extensions(data: &[u8]) -> ParsedMedia {
    let mut result = ParsedMedia::default();
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_item = false;
    let mut in_guid = false;
    let mut guid: Option<String> = None;
    let mut current = ItemMedia::default();

    loop {
        let event = reader.read_event_into(&mut buf);
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let is_start = matches!(event, Ok(Event::Start(_)));
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let local = name.rsplit(':').next().unwrap_or(&name).to_string();

                if local == "item" || local == "entry" {
                    in_item = true;
                    guid = None;
                    current = ItemMedia::default();
                } else if in_item {
                    collect_media_tag(&name, &local, e, &mut current);
                    // An empty <guid/> has no End event to clear the flag
                    if is_start && (local == "guid" || local == "id") && !name.contains(':') {
                        in_guid = true;
                    }
                }
            }
            Ok(Event::Text(ref e)) if in_guid => {
                if let Ok(text) = e.decode() {
                    if !text.is_empty() {
                        guid = Some(text.into_owned());
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let local = name.rsplit(':').next().unwrap_or(&name);
                match local {
                    "item" | "entry" if in_item => {
                        if let Some(key) = guid.take() {
                            result.by_guid.insert(key, current.clone());
                        }
                        result.by_index.push(std::mem::take(&mut current));
                        in_item = false;
                    }
                    "guid" | "id" => in_guid = false,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    result
}

fn collect_media_tag(name: &str, local: &str, e: &BytesStart, item: &mut ItemMedia) {
    match name {
        "enclosure" => {
            if let Some(url) = get_attribute(e, "url") {
                item.enclosures.push(MediaRef::new(url, get_attribute(e, "type")));
            }
        }
        "media:content" => {
            if let Some(url) = get_attribute(e, "url") {
                item.media_content.push(MediaRef::new(url, media_mime(e)));
            }
        }
        "media:thumbnail" => {
            if let Some(url) = get_attribute(e, "url") {
                item.media_thumbnails.push(MediaRef::new(url, None));
            }
        }
        _ if local == "link" && get_attribute(e, "rel").as_deref() == Some("enclosure") => {
            if let Some(href) = get_attribute(e, "href") {
                item.enclosures.push(MediaRef::new(href, get_attribute(e, "type")));
            }
        }
        _ => {}
    }
}

/// `type` if declared; otherwise `medium="image"` is reported as `image/*`.
fn media_mime(e: &BytesStart) -> Option<String> {
    get_attribute(e, "type").or_else(|| {
        get_attribute(e, "medium")
            .filter(|m| m.eq_ignore_ascii_case("image"))
            .map(|_| "image/*".to_string())
    })
}

fn get_attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.as_ref() != name.as_bytes() {
            return None;
        }
        let value = decode_entities(String::from_utf8_lossy(&attr.value).trim());
        (!value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collects_rss_media_tags_per_item() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <item>
      <guid>a-1</guid>
      <title>One</title>
      <enclosure url="https://cdn.example.com/one.jpg" type="image/jpeg" length="10"/>
      <media:content url="https://cdn.example.com/one-large.png" medium="image"/>
      <media:thumbnail url="https://cdn.example.com/one-thumb.png"/>
    </item>
    <item>
      <title>Two</title>
      <media:group>
        <media:content url="https://cdn.example.com/two.mp4" type="video/mp4"/>
      </media:group>
    </item>
  </channel>
</rss>"#;

        let media = parse_media_extensions(rss.as_bytes());
        assert_eq!(media.by_index.len(), 2);

        let one = media.for_item("a-1", 99);
        assert_eq!(
            one.enclosures,
            vec![MediaRef::new(
                "https://cdn.example.com/one.jpg",
                Some("image/jpeg".to_string())
            )]
        );
        assert_eq!(
            one.media_content,
            vec![MediaRef::new(
                "https://cdn.example.com/one-large.png",
                Some("image/*".to_string())
            )]
        );
        assert_eq!(
            one.media_thumbnails,
            vec![MediaRef::new("https://cdn.example.com/one-thumb.png", None)]
        );

        let two = media.for_item("missing", 1);
        assert!(two.enclosures.is_empty());
        assert_eq!(two.media_content.len(), 1);
        assert_eq!(two.media_content[0].mime_type.as_deref(), Some("video/mp4"));
    }

    #[test]
    fn collects_atom_enclosure_links() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <entry>
    <id>urn:entry:1</id>
    <title>Entry</title>
    <link rel="alternate" href="https://example.com/1"/>
    <link rel="enclosure" href="https://example.com/1.webp" type="image/webp"/>
  </entry>
</feed>"#;

        let media = parse_media_extensions(atom.as_bytes());
        let entry = media.for_item("urn:entry:1", 0);
        assert_eq!(
            entry.enclosures,
            vec![MediaRef::new(
                "https://example.com/1.webp",
                Some("image/webp".to_string())
            )]
        );
    }

    #[test]
    fn empty_guid_does_not_capture_later_text() {
        let rss = r#"<rss><channel>
            <item>
                <guid/>
                <title>Later text</title>
                <enclosure url="https://example.com/e.jpg" type="image/jpeg"/>
            </item>
        </channel></rss>"#;
        let media = parse_media_extensions(rss.as_bytes());
        assert!(media.by_guid.is_empty());
        assert_eq!(media.for_item("Later text", 0).enclosures.len(), 1);
    }

    #[test]
    fn channel_level_tags_are_ignored() {
        let rss = r#"<rss><channel>
            <media:thumbnail url="https://example.com/channel.png"/>
            <item><title>Only</title></item>
        </channel></rss>"#;
        let media = parse_media_extensions(rss.as_bytes());
        assert_eq!(media.by_index, vec![ItemMedia::default()]);
    }
}
