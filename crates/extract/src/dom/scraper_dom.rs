// ABOUTME: scraper-backed implementation of the DOM traits.
// ABOUTME: Removal marks NodeIds in a skip set that traversal and serialization honor.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};

use super::{ElementInfo, HtmlDocument, HtmlElement, HtmlParser};
use crate::error::ExtractError;
use crate::resource::MAX_CONTENT_LENGTH;

/// Default parser built on `scraper` (html5ever).
#[derive(Debug, Clone, Copy)]
pub struct ScraperParser {
    /// Inputs longer than this many bytes are rejected.
    pub max_input_len: usize,
}

impl Default for ScraperParser {
    fn default() -> Self {
        Self {
            max_input_len: MAX_CONTENT_LENGTH,
        }
    }
}

impl ScraperParser {
    fn check_len(&self, html: &str) -> Result<(), ExtractError> {
        if html.len() > self.max_input_len {
            return Err(ExtractError::parse(
                "",
                "ParseHtml",
                Some(anyhow::anyhow!(
                    "input of {} bytes exceeds limit of {}",
                    html.len(),
                    self.max_input_len
                )),
            ));
        }
        Ok(())
    }
}

impl HtmlParser for ScraperParser {
    type Document = ScraperDocument;

    fn parse_document(&self, html: &str) -> Result<ScraperDocument, ExtractError> {
        self.check_len(html)?;
        Ok(ScraperDocument {
            html: Html::parse_document(html),
            removed: HashSet::new(),
            fragment: false,
        })
    }

    fn parse_fragment(&self, html: &str) -> Result<ScraperDocument, ExtractError> {
        self.check_len(html)?;
        Ok(ScraperDocument {
            html: Html::parse_fragment(html),
            removed: HashSet::new(),
            fragment: true,
        })
    }
}

/// A parsed document plus the set of removed subtrees.
pub struct ScraperDocument {
    html: Html,
    removed: HashSet<NodeId>,
    fragment: bool,
}

impl ScraperDocument {
    fn is_removed(&self, el: &ElementRef) -> bool {
        is_removed(el, &self.removed)
    }
}

fn is_removed(el: &ElementRef, removed: &HashSet<NodeId>) -> bool {
    if removed.is_empty() {
        return false;
    }
    removed.contains(&el.id()) || el.ancestors().any(|a| removed.contains(&a.id()))
}

impl HtmlDocument for ScraperDocument {
    type Element<'a> = ScraperElement<'a>;

    fn select<'a>(&'a self, selector: &str) -> Vec<ScraperElement<'a>> {
        let Ok(sel) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.html
            .select(&sel)
            .filter(|el| !self.is_removed(el))
            .map(|el| ScraperElement {
                el,
                removed: &self.removed,
            })
            .collect()
    }

    fn remove(&mut self, selector: &str) -> usize {
        let Ok(sel) = Selector::parse(selector) else {
            return 0;
        };
        let ids: Vec<NodeId> = self.html.select(&sel).map(|el| el.id()).collect();
        ids.into_iter().filter(|id| self.removed.insert(*id)).count()
    }

    fn remove_where(&mut self, pred: &dyn Fn(ElementInfo<'_>) -> bool) -> usize {
        let ids: Vec<NodeId> = self
            .html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| {
                let value = el.value();
                pred(ElementInfo {
                    tag: value.name(),
                    id: value.id(),
                    class: value.attr("class"),
                })
            })
            .map(|el| el.id())
            .collect();
        ids.into_iter().filter(|id| self.removed.insert(*id)).count()
    }

    fn html(&self) -> String {
        let root = self.html.root_element();
        let mut out = String::new();
        if self.fragment {
            for child in root.children() {
                serialize_node(child, &self.removed, &mut out);
            }
        } else {
            serialize_node(*root, &self.removed, &mut out);
        }
        out
    }

    fn text(&self) -> String {
        let mut out = String::new();
        collect_text(*self.html.root_element(), &self.removed, &mut out);
        out
    }
}

/// An element borrowed from a [`ScraperDocument`].
#[derive(Clone, Copy)]
pub struct ScraperElement<'a> {
    el: ElementRef<'a>,
    removed: &'a HashSet<NodeId>,
}

impl<'a> HtmlElement for ScraperElement<'a> {
    fn tag(&self) -> String {
        self.el.value().name().to_string()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.el.value().attr(name).map(str::to_string)
    }

    fn text(&self) -> String {
        let mut out = String::new();
        collect_text(*self.el, self.removed, &mut out);
        out
    }

    fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.el.children() {
            serialize_node(child, self.removed, &mut out);
        }
        out
    }

    fn select(&self, selector: &str) -> Vec<Self> {
        let Ok(sel) = Selector::parse(selector) else {
            return Vec::new();
        };
        let removed = self.removed;
        self.el
            .select(&sel)
            .filter(|el| !is_removed(el, removed))
            .map(|el| ScraperElement { el, removed })
            .collect()
    }
}

fn collect_text(node: NodeRef<Node>, removed: &HashSet<NodeId>, out: &mut String) {
    if removed.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Text(t) => out.push_str(t),
        Node::Element(el) => {
            // Keep adjacent block texts apart
            let block = is_block_element(el.name());
            if block {
                out.push(' ');
            }
            for child in node.children() {
                collect_text(child, removed, out);
            }
            if block {
                out.push(' ');
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, removed, out);
            }
        }
    }
}

fn serialize_node(node: NodeRef<Node>, removed: &HashSet<NodeId>, out: &mut String) {
    if removed.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Text(t) => out.push_str(&escape_text(t)),
        Node::Element(el) => {
            let name = el.name();
            out.push('<');
            out.push_str(name);
            for (k, v) in el.attrs() {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                out.push_str(&escape_attr(v));
                out.push('"');
            }
            if is_void_element(name) {
                out.push_str(" />");
                return;
            }
            out.push('>');
            for child in node.children() {
                serialize_node(child, removed, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Node::Comment(_) | Node::Doctype(_) | Node::ProcessingInstruction(_) => {}
        _ => {
            for child in node.children() {
                serialize_node(child, removed, out);
            }
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_block_element(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "section"
            | "article"
            | "main"
            | "br"
            | "li"
            | "ul"
            | "ol"
            | "blockquote"
            | "pre"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "table"
            | "tr"
            | "td"
            | "th"
            | "figure"
            | "figcaption"
            | "header"
            | "footer"
            | "aside"
            | "nav"
            | "title"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{strip_non_content, NoiseFilter};

    fn doc(html: &str) -> ScraperDocument {
        ScraperParser::default().parse_document(html).unwrap()
    }

    #[test]
    fn select_and_text() {
        let d = doc("<html><body><p>One <b>two</b></p><p>three</p></body></html>");
        let ps = d.select("p");
        assert_eq!(ps.len(), 2);
        assert_eq!(ps[0].clean_text(), "One two");
        assert_eq!(ps[0].inner_html(), "One <b>two</b>");
        assert_eq!(d.select_first("p").map(|p| p.tag()), Some("p".to_string()));
    }

    #[test]
    fn removed_subtrees_are_skipped() {
        let mut d = doc(
            r#"<html><body><article><p>Keep me</p><div class="share-tools"><p>Tweet</p></div>
            <script>var x;</script></article></body></html>"#,
        );
        let removed = strip_non_content(&mut d, &NoiseFilter::all());
        assert_eq!(removed, 2);

        let article = d.select_first("article").unwrap();
        assert_eq!(article.clean_text(), "Keep me");
        assert!(!article.inner_html().contains("Tweet"));
        assert_eq!(d.select("p").len(), 1);
        assert!(!d.html().contains("<script"));
    }

    #[test]
    fn invalid_selector_matches_nothing() {
        let mut d = doc("<p>x</p>");
        assert!(d.select("p[").is_empty());
        assert_eq!(d.remove("p["), 0);
    }

    #[test]
    fn fragment_html_has_no_wrapper() {
        let d = ScraperParser::default()
            .parse_fragment("<p>a &amp; b</p><img src=\"x.png\">")
            .unwrap();
        assert_eq!(d.html(), "<p>a &amp; b</p><img src=\"x.png\" />");
    }

    #[test]
    fn oversized_input_is_rejected() {
        let parser = ScraperParser { max_input_len: 4 };
        let err = parser.parse_fragment("<p>too long</p>").err().unwrap();
        assert!(err.is_parse());
    }

    #[test]
    fn block_texts_do_not_run_together() {
        let d = doc("<div><p>First.</p><p>Second.</p></div>");
        assert_eq!(d.select_first("div").unwrap().clean_text(), "First. Second.");
    }
}
