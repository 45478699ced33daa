// ABOUTME: Extraction strategies and the ordered page-strategy runner.
// ABOUTME: Structured data runs on the raw page; semantic and heuristic run on the cleaned page.

pub mod api;
pub mod feed;
pub mod heuristic;
pub mod metadata;
pub mod semantic;
pub mod structured;

use crate::content::{ArticleFields, ExtractedContent, ExtractionMethod};
use crate::dom::{strip_non_content, HtmlDocument, HtmlParser, NoiseFilter};
use crate::error::ExtractError;

/// Per-page inputs shared by strategies.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Page URL, used to resolve relative links.
    pub url: &'a str,
    pub include_images: bool,
}

pub type StrategyFn<D> = fn(&D, &PageContext<'_>) -> Result<Option<ArticleFields>, ExtractError>;

/// An extraction strategy tagged with the method it reports.
pub struct Strategy<D> {
    pub method: ExtractionMethod,
    pub run: StrategyFn<D>,
}

/// Strategies that read the raw page (script tags intact).
fn raw_strategies<D: HtmlDocument>() -> [Strategy<D>; 1] {
    [Strategy {
        method: ExtractionMethod::StructuredData,
        run: structured::extract::<D>,
    }]
}

/// Strategies that read the page after non-content subtrees are removed.
fn cleaned_strategies<D: HtmlDocument>() -> [Strategy<D>; 2] {
    [
        Strategy {
            method: ExtractionMethod::SemanticSelector,
            run: semantic::extract::<D>,
        },
        Strategy {
            method: ExtractionMethod::Heuristic,
            run: heuristic::extract::<D>,
        },
    ]
}

fn attempt<D: HtmlDocument>(
    strategy: &Strategy<D>,
    doc: &D,
    ctx: &PageContext<'_>,
    meta: &ArticleFields,
) -> Option<ExtractedContent> {
    match (strategy.run)(doc, ctx) {
        Ok(Some(mut fields)) => {
            fields.fill_from(meta);
            Some(ExtractedContent::new(fields, strategy.method))
        }
        Ok(None) => None,
        Err(err) => {
            tracing::debug!(url = ctx.url, method = %strategy.method, error = %err, "strategy failed");
            None
        }
    }
}

/// Runs structured, semantic and heuristic strategies in order; first hit wins.
pub fn extract_from_html<P: HtmlParser>(
    parser: &P,
    html: &str,
    ctx: &PageContext<'_>,
) -> Option<ExtractedContent> {
    let mut doc = match parser.parse_document(html) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::debug!(url = ctx.url, error = %err, "page could not be parsed");
            return None;
        }
    };

    let meta = metadata::page_metadata(&doc, ctx.url, ctx.include_images);

    for strategy in raw_strategies::<P::Document>() {
        if let Some(found) = attempt(&strategy, &doc, ctx, &meta) {
            return Some(found);
        }
    }

    strip_non_content(&mut doc, &NoiseFilter::all());

    for strategy in cleaned_strategies::<P::Document>() {
        if let Some(found) = attempt(&strategy, &doc, ctx, &meta) {
            return Some(found);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ScraperParser;

    fn run(html: &str) -> Option<ExtractedContent> {
        let ctx = PageContext {
            url: "https://example.com/news/1",
            include_images: true,
        };
        extract_from_html(&ScraperParser::default(), html, &ctx)
    }

    #[test]
    fn structured_beats_semantic() {
        let html = format!(
            r#"<html><head><title>Page</title><script type="application/ld+json">
            {{"@type":"NewsArticle","headline":"X","articleBody":"Y"}}</script></head>
            <body><article><p>{}</p></article></body></html>"#,
            "Lots of article text. ".repeat(10)
        );
        let found = run(&html).unwrap();
        assert_eq!(found.extraction_method, ExtractionMethod::StructuredData);
        assert_eq!(found.confidence, 0.9);
        assert_eq!(found.title, "X");
        assert_eq!(found.content, "Y");
    }

    #[test]
    fn semantic_gets_page_metadata() {
        let html = format!(
            r#"<html><head><meta property="og:title" content="OG Title">
            <meta name="description" content="Desc"><meta property="og:image" content="/og.png"></head>
            <body><main><p>{}</p></main></body></html>"#,
            "Solana throughput numbers keep improving. ".repeat(4)
        );
        let found = run(&html).unwrap();
        assert_eq!(found.extraction_method, ExtractionMethod::SemanticSelector);
        assert_eq!(found.confidence, 0.8);
        assert_eq!(found.title, "OG Title");
        assert_eq!(found.description, "Desc");
        assert_eq!(found.source.as_deref(), Some("example.com"));
        assert_eq!(found.images, vec!["https://example.com/og.png"]);
        assert!(found.success);
    }

    #[test]
    fn heuristic_when_no_container() {
        let html = r#"<html><body><div><p>A standalone block of text that is longer than fifty characters.</p></div></body></html>"#;
        let found = run(html).unwrap();
        assert_eq!(found.extraction_method, ExtractionMethod::Heuristic);
        assert_eq!(found.confidence, 0.6);
    }

    #[test]
    fn nothing_found() {
        assert!(run("<html><body><p>tiny</p></body></html>").is_none());
    }
}
