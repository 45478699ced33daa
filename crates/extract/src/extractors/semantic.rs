// ABOUTME: Semantic-selector strategy: the first common article container with enough text.
// ABOUTME: Runs on a document already stripped of non-content subtrees.

use coinwire_feed::strip_html_paragraphs;

use super::metadata::collect_element_images;
use super::PageContext;
use crate::content::ArticleFields;
use crate::dom::{HtmlDocument, HtmlElement};
use crate::error::ExtractError;

/// Article containers in priority order.
pub const SEMANTIC_SELECTORS: &[&str] = &[
    "article",
    "[role='main']",
    "main",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".article-body",
    ".story-body",
    ".content",
    ".post",
    ".entry",
    "#content",
];

/// Minimum characters of text for a container to count.
pub const MIN_SEMANTIC_CHARS: usize = 100;

pub fn extract<D: HtmlDocument>(
    doc: &D,
    ctx: &PageContext<'_>,
) -> Result<Option<ArticleFields>, ExtractError> {
    for sel in SEMANTIC_SELECTORS {
        let found = doc
            .select(sel)
            .into_iter()
            .find(|el| el.clean_text().chars().count() >= MIN_SEMANTIC_CHARS);

        if let Some(el) = found {
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
            return Ok(Some(fields));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{strip_non_content, HtmlParser, NoiseFilter, ScraperParser};

    fn run(html: &str) -> Option<ArticleFields> {
        let mut doc = ScraperParser::default().parse_document(html).unwrap();
        strip_non_content(&mut doc, &NoiseFilter::all());
        let ctx = PageContext {
            url: "https://example.com/post",
            include_images: true,
        };
        extract(&doc, &ctx).unwrap()
    }

    fn long_text(prefix: &str) -> String {
        format!("{} {}", prefix, "Ether staking yields moved higher this week. ".repeat(4))
    }

    #[test]
    fn picks_article_and_strips_noise() {
        let html = format!(
            r#"<html><body><nav>Home | Markets</nav>
            <article><h1>Headline</h1><p>{}</p><div class="social-share">Share on X</div>
            <img src="/chart.png"><aside>Related</aside></article></body></html>"#,
            long_text("Lead.")
        );
        let fields = run(&html).expect("article matched");
        assert!(fields.content.starts_with("Headline\n\nLead. Ether staking"));
        assert!(!fields.content.contains("Share on X"));
        assert!(!fields.content.contains("Related"));
        assert!(!fields.content.contains("Markets"));
        assert_eq!(fields.images, vec!["https://example.com/chart.png"]);
    }

    #[test]
    fn selector_order_wins_over_length() {
        let html = format!(
            r#"<html><body><div class="entry-content"><p>{}</p><p>{}</p></div>
            <div class="post-content"><p>{}</p></div></body></html>"#,
            long_text("Entry one."),
            long_text("Entry two."),
            long_text("Post.")
        );
        let fields = run(&html).unwrap();
        assert!(fields.content.starts_with("Post."));
    }

    #[test]
    fn short_container_is_skipped() {
        let html = "<html><body><article><p>Too short.</p></article></body></html>";
        assert_eq!(run(html), None);
    }
}
