// ABOUTME: DOM abstraction used by extraction strategies and the formatter.
// ABOUTME: HtmlParser/HtmlDocument/HtmlElement traits with a scraper-backed default implementation.

//! DOM access for content extraction.
//!
//! Strategies only talk to these traits, so the same extraction logic runs
//! against any HTML parser. [`ScraperParser`] is the default implementation.
//! Removal is non-destructive: removed subtrees are skipped by every
//! traversal and serialization of the document.

pub mod noise;
pub mod scraper_dom;

pub use noise::NoiseFilter;
pub use scraper_dom::{ScraperDocument, ScraperElement, ScraperParser};

use crate::error::ExtractError;

/// Parses HTML strings into documents.
pub trait HtmlParser {
    type Document: HtmlDocument;

    /// Parse a full page (`<html>`, `<head>`, `<body>`).
    fn parse_document(&self, html: &str) -> Result<Self::Document, ExtractError>;

    /// Parse a markup fragment.
    fn parse_fragment(&self, html: &str) -> Result<Self::Document, ExtractError>;
}

/// Tag, id and class of an element, used by removal predicates.
#[derive(Debug, Clone, Copy)]
pub struct ElementInfo<'a> {
    pub tag: &'a str,
    pub id: Option<&'a str>,
    pub class: Option<&'a str>,
}

/// A parsed HTML document.
pub trait HtmlDocument {
    type Element<'a>: HtmlElement
    where
        Self: 'a;

    /// All non-removed elements matching a CSS selector, in document order.
    /// An invalid selector matches nothing.
    fn select<'a>(&'a self, selector: &str) -> Vec<Self::Element<'a>>;

    fn select_first<'a>(&'a self, selector: &str) -> Option<Self::Element<'a>> {
        self.select(selector).into_iter().next()
    }

    /// Removes every element matching the selector. Returns the number removed.
    fn remove(&mut self, selector: &str) -> usize;

    /// Removes every element for which `pred` holds. Returns the number removed.
    fn remove_where(&mut self, pred: &dyn Fn(ElementInfo<'_>) -> bool) -> usize;

    /// Serialized markup of the document, without removed subtrees.
    fn html(&self) -> String;

    /// Text content of the whole document, without removed subtrees.
    fn text(&self) -> String;
}

/// An element within a document.
pub trait HtmlElement: Sized {
    fn tag(&self) -> String;

    fn attr(&self, name: &str) -> Option<String>;

    /// Concatenated text of the element and its non-removed descendants.
    fn text(&self) -> String;

    /// Serialized markup of the children, without removed subtrees.
    fn inner_html(&self) -> String;

    /// Matching non-removed descendants, in document order.
    fn select(&self, selector: &str) -> Vec<Self>;

    /// Text with runs of whitespace collapsed.
    fn clean_text(&self) -> String {
        self.text().split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Selectors of subtrees that never hold article text.
pub const NON_CONTENT_SELECTOR: &str =
    "script, style, noscript, template, nav, aside, footer, header, form, iframe";

/// Selectors of subtrees with no renderable text.
pub const NON_TEXT_SELECTOR: &str = "script, style, noscript, template";

/// Strips non-content tags and noise-classed elements from a document.
pub fn strip_non_content<D: HtmlDocument>(doc: &mut D, noise: &NoiseFilter) -> usize {
    let mut removed = doc.remove(NON_CONTENT_SELECTOR);
    removed += doc.remove_where(&|info| noise.is_noise(info));
    removed
}
