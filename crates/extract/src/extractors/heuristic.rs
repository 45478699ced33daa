// ABOUTME: Heuristic strategy: the paragraph, div or section with the longest text.
// ABOUTME: Runs on a document already stripped of non-content subtrees.

use coinwire_feed::strip_html_paragraphs;

use super::metadata::collect_element_images;
use super::PageContext;
use crate::content::ArticleFields;
use crate::dom::{HtmlDocument, HtmlElement};
use crate::error::ExtractError;

const CANDIDATE_SELECTOR: &str = "p, div, section";

/// Minimum characters of text for the winning block.
pub const MIN_HEURISTIC_CHARS: usize = 50;

pub fn extract<D: HtmlDocument>(
    doc: &D,
    ctx: &PageContext<'_>,
) -> Result<Option<ArticleFields>, ExtractError> {
    let mut best = None;
    let mut best_len = 0;
    for el in doc.select(CANDIDATE_SELECTOR) {
        let len = el.clean_text().chars().count();
        // Ties keep the earlier (outer) element
        if len > best_len {
            best_len = len;
            best = Some(el);
        }
    }

    let Some(el) = best.filter(|_| best_len >= MIN_HEURISTIC_CHARS) else {
        return Ok(None);
    };

    let html = el.inner_html();
    let mut fields = ArticleFields {
        content: strip_html_paragraphs(&html),
        ..Default::default()
    };
    if ctx.include_images {
        for url in collect_element_images(&el, ctx.url) {
            fields.push_image(url);
        }
    }
    fields.html = Some(html);
    Ok(Some(fields))
}
