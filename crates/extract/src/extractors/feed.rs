// ABOUTME: Builds article fields from a feed item without touching the network.
// ABOUTME: Shared by the feed-fallback strategy and the fallback synthesizer.

use coinwire_feed::{resolve_images, source_name, strip_html, strip_html_paragraphs, FeedItem};

use crate::content::ArticleFields;

/// Maps a feed item to article fields: markup stripped, images resolved from feed media.
pub fn fields_from_item(item: &FeedItem, include_images: bool) -> ArticleFields {
    let raw_body = item
        .body()
        .map(str::to_string)
        .unwrap_or_default();

    ArticleFields {
        title: item.title.as_deref().map(strip_html).unwrap_or_default(),
        description: item.description.as_deref().map(strip_html).unwrap_or_default(),
        content: strip_html_paragraphs(&raw_body),
        html: (!raw_body.is_empty()).then_some(raw_body),
        images: if include_images {
            resolve_images(item)
        } else {
            Vec::new()
        },
        author: item.author.clone().filter(|a| !a.trim().is_empty()),
        published_at: item.published_at,
        source: source_name(&item.link),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwire_feed::MediaRef;

    fn item() -> FeedItem {
        FeedItem {
            title: Some("BTC Hits New High".to_string()),
            description: Some("<p>Bitcoin reached $100k today.</p>".to_string()),
            link: "https://example.com/a".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn description_used_when_no_content() {
        let fields = fields_from_item(&item(), true);
        assert_eq!(fields.title, "BTC Hits New High");
        assert_eq!(fields.description, "Bitcoin reached $100k today.");
        assert_eq!(fields.content, "Bitcoin reached $100k today.");
        assert_eq!(fields.source.as_deref(), Some("example.com"));
        assert!(fields.images.is_empty());
    }

    #[test]
    fn content_preferred_and_images_resolved() {
        let mut it = item();
        it.content = Some("<p>Full <b>story</b>.</p><p>More.</p>".to_string());
        it.enclosures
            .push(MediaRef::new("https://cdn.example.com/btc.jpg", Some("image/jpeg".into())));
        let fields = fields_from_item(&it, true);
        assert_eq!(fields.content, "Full story.\n\nMore.");
        assert_eq!(fields.images, vec!["https://cdn.example.com/btc.jpg"]);

        let no_images = fields_from_item(&it, false);
        assert!(no_images.images.is_empty());
    }
}
