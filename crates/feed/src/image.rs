// ABOUTME: Representative image resolution for feed items.
// ABOUTME: Checks enclosures, media tags, then inline <img> markup, without any network access.

use crate::models::{FeedItem, MediaRef};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// File extensions treated as images when a media reference has no MIME type.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "avif"];

/// Tolerant `<img ... src=...>` matcher; accepts double, single or unquoted values.
static IMG_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("valid img regex")
});

/// Picks one representative image URL for a feed item.
///
/// Order: image enclosure, image media:content, first media:thumbnail,
/// first `<img>` in the description, first `<img>` in the content.
pub fn resolve_image(item: &FeedItem) -> Option<String> {
    candidates(item).next()
}

/// Returns every image candidate for an item, in resolution order, de-duplicated.
pub fn resolve_images(item: &FeedItem) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for url in candidates(item) {
        if !out.contains(&url) {
            out.push(url);
        }
    }
    out
}

fn candidates(item: &FeedItem) -> impl Iterator<Item = String> + '_ {
    let enclosures = item.enclosures.iter().filter(|m| is_image_media(m));
    let content = item.media_content.iter().filter(|m| is_image_media(m));
    let thumbs = item.media_thumbnails.iter().filter(|m| !m.url.trim().is_empty());

    let media = enclosures
        .chain(content)
        .chain(thumbs)
        .map(|m| m.url.trim().to_string());

    let base = item.link.as_str();
    let inline = [item.description.as_deref(), item.content.as_deref()]
        .into_iter()
        .flatten()
        .flat_map(move |html| img_sources(html, base));

    media.chain(inline)
}

/// Reports whether a media reference points at an image.
pub fn is_image_media(media: &MediaRef) -> bool {
    if media.url.trim().is_empty() {
        return false;
    }
    let mime_is_image = media
        .mime_type
        .as_deref()
        .map(|m| m.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false);
    mime_is_image || has_image_extension(&media.url)
}

/// Checks the URL path (ignoring query and fragment) for a known image extension.
pub fn has_image_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Lists `<img>` sources in markup order, resolved against `base` when possible.
fn img_sources(html: &str, base: &str) -> Vec<String> {
    IMG_SRC_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let src = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))?
                .as_str()
                .trim();
            if src.is_empty() {
                return None;
            }
            Some(resolve_image_url(src, base).unwrap_or_else(|| src.to_string()))
        })
        .collect()
}

/// Resolves a potentially relative image URL against a base URL.
/// Returns None if resolution fails or the input is invalid.
pub fn resolve_image_url(src: &str, base_url: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    if src.starts_with("http://") || src.starts_with("https://") || src.starts_with("data:") {
        return Some(src.to_string());
    }

    let base = Url::parse(base_url).ok()?;
    base.join(src).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> FeedItem {
        FeedItem {
            title: Some("Bitcoin rallies".to_string()),
            link: "https://news.example.com/markets/btc".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_enclosure_by_mime() {
        let mut it = item();
        it.enclosures
            .push(MediaRef::new("https://cdn.example.com/audio.mp3", Some("audio/mpeg".into())));
        it.enclosures
            .push(MediaRef::new("https://cdn.example.com/photo", Some("IMAGE/JPEG".into())));
        assert_eq!(
            resolve_image(&it).as_deref(),
            Some("https://cdn.example.com/photo")
        );
    }

    #[test]
    fn test_enclosure_by_extension_ignores_query() {
        let mut it = item();
        it.enclosures
            .push(MediaRef::new("https://cdn.example.com/a.WEBP?w=600#x", None));
        assert_eq!(
            resolve_image(&it).as_deref(),
            Some("https://cdn.example.com/a.WEBP?w=600#x")
        );
    }

    #[test]
    fn test_enclosure_beats_media_content_and_thumbnail() {
        let mut it = item();
        it.media_thumbnails
            .push(MediaRef::new("https://cdn.example.com/thumb.jpg", None));
        it.media_content
            .push(MediaRef::new("https://cdn.example.com/content.png", None));
        it.enclosures
            .push(MediaRef::new("https://cdn.example.com/enc.jpg", None));
        assert_eq!(resolve_image(&it).as_deref(), Some("https://cdn.example.com/enc.jpg"));
        assert_eq!(
            resolve_images(&it),
            vec![
                "https://cdn.example.com/enc.jpg",
                "https://cdn.example.com/content.png",
                "https://cdn.example.com/thumb.jpg",
            ]
        );
    }

    #[test]
    fn test_thumbnail_without_extension() {
        let mut it = item();
        it.media_content
            .push(MediaRef::new("https://cdn.example.com/video.mp4", Some("video/mp4".into())));
        it.media_thumbnails
            .push(MediaRef::new("https://cdn.example.com/thumb", None));
        assert_eq!(resolve_image(&it).as_deref(), Some("https://cdn.example.com/thumb"));
    }

    #[test]
    fn test_inline_img_single_quotes_and_relative() {
        let mut it = item();
        it.description = Some("<p>Chart: <IMG class='x' SRC='/img/chart.png'></p>".to_string());
        assert_eq!(
            resolve_image(&it).as_deref(),
            Some("https://news.example.com/img/chart.png")
        );
    }

    #[test]
    fn test_relative_src_without_link_kept_as_written() {
        let mut it = item();
        it.link = String::new();
        it.content = Some("<img src=chart.png alt=chart>".to_string());
        assert_eq!(resolve_image(&it).as_deref(), Some("chart.png"));
    }

    #[test]
    fn test_description_before_content() {
        let mut it = item();
        it.content = Some(r#"<img src="https://a.example.com/content.jpg">"#.to_string());
        it.description = Some(r#"<img src="https://a.example.com/desc.jpg">"#.to_string());
        assert_eq!(resolve_image(&it).as_deref(), Some("https://a.example.com/desc.jpg"));
    }

    #[test]
    fn test_no_signal_is_none() {
        let mut it = item();
        it.description = Some("Plain text, no markup.".to_string());
        it.enclosures
            .push(MediaRef::new("https://cdn.example.com/ep.mp3", Some("audio/mpeg".into())));
        assert_eq!(resolve_image(&it), None);
        assert!(resolve_images(&it).is_empty());
    }

    #[test]
    fn test_images_deduplicated() {
        let mut it = item();
        it.enclosures
            .push(MediaRef::new("https://cdn.example.com/same.jpg", None));
        it.description = Some(r#"<img src="https://cdn.example.com/same.jpg">"#.to_string());
        assert_eq!(resolve_images(&it), vec!["https://cdn.example.com/same.jpg"]);
    }

    #[test]
    fn test_has_image_extension() {
        assert!(has_image_extension("https://x.example.com/a/b.avif"));
        assert!(!has_image_extension("https://x.example.com/a.jpg/page"));
        assert!(!has_image_extension("https://x.example.com/"));
    }
}
