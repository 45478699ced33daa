// ABOUTME: Fallback synthesizer producing an always-available, low-confidence content record.
// ABOUTME: Reuses feed item fields when present; also builds the extractor's final-fallback record.

use coinwire_feed::{source_name, FeedItem};

use crate::content::{ArticleFields, ExtractedContent, ExtractionMethod};
use crate::extractors::feed::fields_from_item;
use crate::options::ExtractOptions;

pub const PLACEHOLDER_TITLE: &str = "Article";
pub const PLACEHOLDER_DESCRIPTION: &str = "Content not available";
pub const PLACEHOLDER_CONTENT: &str = "Full content could not be extracted.";

pub const FINAL_FALLBACK_DESCRIPTION: &str = "Content could not be extracted";

/// The extractor's terminal result: placeholder title, empty content.
pub fn final_fallback(url: &str) -> ExtractedContent {
    let fields = ArticleFields {
        title: PLACEHOLDER_TITLE.to_string(),
        description: FINAL_FALLBACK_DESCRIPTION.to_string(),
        source: source_name(url),
        ..Default::default()
    };
    ExtractedContent::new(fields, ExtractionMethod::FinalFallback)
}

/// Builds a fallback record for `url`.
///
/// Always reports method `fallback`, confidence 0.3 and `success = false`,
/// even when the feed item supplies a full title and body.
pub fn synthesize(url: &str, item: Option<&FeedItem>, opts: &ExtractOptions) -> ExtractedContent {
    let fields = match item {
        Some(item) => {
            let mut fields = fields_from_item(item, opts.include_images);
            if fields.source.is_none() {
                fields.source = source_name(url);
            }
            fields
        }
        None => ArticleFields {
            title: PLACEHOLDER_TITLE.to_string(),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
            content: PLACEHOLDER_CONTENT.to_string(),
            source: source_name(url),
            ..Default::default()
        },
    };
    ExtractedContent::new(fields, ExtractionMethod::Fallback)
}
