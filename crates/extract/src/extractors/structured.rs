// ABOUTME: Structured-data strategy: schema.org articles from JSON-LD blocks or microdata.
// ABOUTME: Maps headline, articleBody, description, author, datePublished, image and publisher.

use coinwire_feed::{resolve_image_url, strip_html, strip_html_paragraphs};
use serde_json::Value;

use super::metadata::{collect_element_images, parse_date};
use super::PageContext;
use crate::content::ArticleFields;
use crate::dom::{HtmlDocument, HtmlElement};
use crate::error::ExtractError;

/// schema.org types accepted as articles.
const ARTICLE_TYPES: &[&str] = &["Article", "NewsArticle", "BlogPosting", "ReportageNewsArticle"];

/// Keys searched for nested article objects before the remaining values.
const GRAPH_KEYS: &[&str] = &[
    "@graph",
    "graph",
    "mainEntity",
    "mainEntityOfPage",
    "itemListElement",
];

/// Finds an article in JSON-LD first, then in microdata.
///
/// A malformed JSON-LD block is an error only when nothing else on the page
/// yields an article.
pub fn extract<D: HtmlDocument>(
    doc: &D,
    ctx: &PageContext<'_>,
) -> Result<Option<ArticleFields>, ExtractError> {
    let mut parse_error = None;

    for script in doc.select("script[type='application/ld+json']") {
        let text = script.text();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => {
                if let Some(fields) = find_article(&value, ctx) {
                    return Ok(Some(fields));
                }
            }
            Err(e) => {
                parse_error.get_or_insert_with(|| {
                    ExtractError::parse(
                        ctx.url,
                        "StructuredData",
                        Some(anyhow::anyhow!("invalid JSON-LD: {}", e)),
                    )
                });
            }
        }
    }

    if let Some(fields) = extract_microdata(doc, ctx) {
        return Ok(Some(fields));
    }

    match parse_error {
        Some(err) => Err(err),
        None => Ok(None),
    }
}

fn find_article(value: &Value, ctx: &PageContext<'_>) -> Option<ArticleFields> {
    match value {
        Value::Object(map) => {
            let is_article = map
                .get("@type")
                .map(|t| ARTICLE_TYPES.iter().any(|ty| matches_type(t, ty)))
                .unwrap_or(false);
            if is_article {
                if let Some(fields) = map_json_article(value, ctx) {
                    return Some(fields);
                }
            }
            for key in GRAPH_KEYS {
                if let Some(found) = map.get(*key).and_then(|v| find_article(v, ctx)) {
                    return Some(found);
                }
            }
            map.iter()
                .filter(|(k, _)| !GRAPH_KEYS.contains(&k.as_str()))
                .find_map(|(_, v)| find_article(v, ctx))
        }
        Value::Array(arr) => arr.iter().find_map(|v| find_article(v, ctx)),
        _ => None,
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => {
            let s = s.rsplit('/').next().unwrap_or(s);
            s.eq_ignore_ascii_case(expected)
        }
        Value::Array(arr) => arr.iter().any(|v| matches_type(v, expected)),
        _ => false,
    }
}

fn map_json_article(value: &Value, ctx: &PageContext<'_>) -> Option<ArticleFields> {
    let body = match value.get("articleBody")? {
        Value::String(s) => s.clone(),
        Value::Array(arr) => arr
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n\n"),
        _ => return None,
    };
    let content = strip_html_paragraphs(&body);
    if content.is_empty() {
        return None;
    }

    let title = value
        .get("headline")
        .or_else(|| value.get("name"))
        .and_then(Value::as_str)
        .map(strip_html)
        .unwrap_or_default();

    let mut fields = ArticleFields {
        title,
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(strip_html)
            .unwrap_or_default(),
        content,
        html: Some(body),
        author: value.get("author").and_then(json_names),
        published_at: value
            .get("datePublished")
            .or_else(|| value.get("dateCreated"))
            .and_then(Value::as_str)
            .and_then(parse_date),
        source: value
            .get("publisher")
            .and_then(json_names)
            .filter(|s| !s.is_empty()),
        ..Default::default()
    };

    if ctx.include_images {
        if let Some(image) = value.get("image") {
            for url in json_urls(image) {
                fields.push_image(resolve_image_url(&url, ctx.url).unwrap_or(url));
            }
        }
    }

    Some(fields)
}

/// Names from a string, an object with `name`, or a list of either; joined with ", ".
fn json_names(value: &Value) -> Option<String> {
    let names: Vec<String> = match value {
        Value::String(s) => vec![s.trim().to_string()],
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(|s| vec![s.trim().to_string()])
            .unwrap_or_default(),
        Value::Array(arr) => arr.iter().filter_map(json_names).collect(),
        _ => Vec::new(),
    };
    let names: Vec<String> = names.into_iter().filter(|n| !n.is_empty()).collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

/// URLs from a string, an ImageObject (`url` or `contentUrl`), or a list of either.
fn json_urls(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .map(json_urls)
            .unwrap_or_default(),
        Value::Array(arr) => arr.iter().flat_map(json_urls).collect(),
        _ => Vec::new(),
    }
}

fn extract_microdata<D: HtmlDocument>(doc: &D, ctx: &PageContext<'_>) -> Option<ArticleFields> {
    doc.select("[itemscope][itemtype]")
        .into_iter()
        .filter(|el| {
            el.attr("itemtype")
                .map(|t| is_article_itemtype(&t))
                .unwrap_or(false)
        })
        .find_map(|el| map_microdata_article(&el, ctx))
}

fn is_article_itemtype(itemtype: &str) -> bool {
    itemtype.split_whitespace().any(|t| {
        let name = t.trim_end_matches('/').rsplit('/').next().unwrap_or(t);
        ARTICLE_TYPES.iter().any(|ty| name.eq_ignore_ascii_case(ty))
    })
}

fn map_microdata_article<E: HtmlElement>(scope: &E, ctx: &PageContext<'_>) -> Option<ArticleFields> {
    let body_el = scope.select("[itemprop='articleBody']").into_iter().next()?;
    let html = body_el.inner_html();
    let content = strip_html_paragraphs(&html);
    if content.is_empty() {
        return None;
    }

    let author = scope
        .select("[itemprop='author']")
        .into_iter()
        .next()
        .and_then(|a| {
            a.select("[itemprop='name']")
                .into_iter()
                .next()
                .map(|n| prop_value(&n))
                .or_else(|| Some(prop_value(&a)))
        })
        .filter(|s| !s.is_empty());

    let source = scope
        .select("[itemprop='publisher'] [itemprop='name']")
        .into_iter()
        .next()
        .map(|n| prop_value(&n))
        .filter(|s| !s.is_empty());

    let mut fields = ArticleFields {
        title: first_prop(scope, "headline")
            .or_else(|| first_prop(scope, "name"))
            .unwrap_or_default(),
        description: first_prop(scope, "description").unwrap_or_default(),
        content,
        author,
        published_at: first_prop(scope, "datePublished").and_then(|s| parse_date(&s)),
        source,
        ..Default::default()
    };

    if ctx.include_images {
        for img in scope.select("[itemprop='image']") {
            let url = prop_value(&img);
            if !url.is_empty() {
                fields.push_image(resolve_image_url(&url, ctx.url).unwrap_or(url));
            }
        }
        for url in collect_element_images(&body_el, ctx.url) {
            fields.push_image(url);
        }
    }
    fields.html = Some(html);

    Some(fields)
}

fn first_prop<E: HtmlElement>(scope: &E, prop: &str) -> Option<String> {
    scope
        .select(&format!("[itemprop='{}']", prop))
        .into_iter()
        .map(|el| prop_value(&el))
        .find(|v| !v.is_empty())
}

/// Microdata property value: content, datetime, src or href attribute, else text.
fn prop_value<E: HtmlElement>(el: &E) -> String {
    ["content", "datetime", "src", "href"]
        .iter()
        .find_map(|attr| el.attr(attr).filter(|v| !v.trim().is_empty()))
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| el.clean_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{HtmlParser, ScraperParser};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn ctx() -> PageContext<'static> {
        PageContext {
            url: "https://news.example.com/a/story",
            include_images: true,
        }
    }

    fn run(html: &str) -> Result<Option<ArticleFields>, ExtractError> {
        let doc = ScraperParser::default().parse_document(html).unwrap();
        extract(&doc, &ctx())
    }

    #[test]
    fn json_ld_news_article() {
        let html = r#"<html><head><script type="application/ld+json">
        {"@context":"https://schema.org","@type":"NewsArticle","headline":"X",
         "articleBody":"Y","description":"Short",
         "author":[{"@type":"Person","name":"Ann"},{"@type":"Person","name":"Bo"}],
         "datePublished":"2024-02-03T04:05:06Z",
         "image":["/img/1.jpg",{"@type":"ImageObject","url":"https://cdn.example.com/2.jpg"}],
         "publisher":{"@type":"Organization","name":"Example News"}}
        </script></head><body></body></html>"#;

        let fields = run(html).unwrap().expect("article found");
        assert_eq!(fields.title, "X");
        assert_eq!(fields.content, "Y");
        assert_eq!(fields.description, "Short");
        assert_eq!(fields.author.as_deref(), Some("Ann, Bo"));
        assert_eq!(fields.source.as_deref(), Some("Example News"));
        assert_eq!(
            fields.published_at,
            Some(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap())
        );
        assert_eq!(
            fields.images,
            vec!["https://news.example.com/img/1.jpg", "https://cdn.example.com/2.jpg"]
        );
    }

    #[test]
    fn json_ld_graph_and_type_array() {
        let html = r#"<script type="application/ld+json">
        {"@graph":[{"@type":"WebPage","name":"Page"},
                   {"@type":["BlogPosting"],"headline":"In graph","articleBody":["One.","Two."]}]}
        </script>"#;
        let fields = run(html).unwrap().unwrap();
        assert_eq!(fields.title, "In graph");
        assert_eq!(fields.content, "One.\n\nTwo.");
    }

    #[test]
    fn json_ld_without_body_is_skipped() {
        let html = r#"<script type="application/ld+json">
        {"@type":"Article","headline":"No body"}</script>"#;
        assert_eq!(run(html).unwrap(), None);
    }

    #[test]
    fn malformed_json_ld_is_parse_error() {
        let html = r#"<script type="application/ld+json">{"@type": "Article",</script>"#;
        let err = run(html).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn malformed_block_does_not_hide_valid_one() {
        let html = r#"<script type="application/ld+json">{oops</script>
        <script type="application/ld+json">{"@type":"ReportageNewsArticle","headline":"H","articleBody":"B"}</script>"#;
        let fields = run(html).unwrap().unwrap();
        assert_eq!(fields.title, "H");
    }

    #[test]
    fn microdata_article() {
        let html = r#"<html><body>
        <div itemscope itemtype="https://schema.org/NewsArticle">
            <h1 itemprop="headline">Micro headline</h1>
            <span itemprop="author" itemscope itemtype="https://schema.org/Person">
                <span itemprop="name">Kim</span></span>
            <meta itemprop="datePublished" content="2024-05-06">
            <div itemprop="articleBody"><p>First para.</p><p>Second para.</p><img src="b.png"></div>
        </div></body></html>"#;
        let fields = run(html).unwrap().unwrap();
        assert_eq!(fields.title, "Micro headline");
        assert_eq!(fields.author.as_deref(), Some("Kim"));
        assert_eq!(fields.content, "First para.\n\nSecond para.");
        assert_eq!(fields.images, vec!["https://news.example.com/a/b.png"]);
        assert!(fields.html.unwrap().contains("<p>First para.</p>"));
        assert!(fields.published_at.is_some());
    }

    #[test]
    fn non_article_microdata_ignored() {
        let html = r#"<div itemscope itemtype="https://schema.org/Recipe">
            <div itemprop="articleBody">Not an article</div></div>"#;
        assert_eq!(run(html).unwrap(), None);
    }
}
