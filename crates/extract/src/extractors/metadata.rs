// ABOUTME: Page-level metadata extraction: title, description, author, date, site name and images.
// ABOUTME: Selector lists are tried in order; the first non-empty value wins.

use chrono::{DateTime, Utc};
use coinwire_feed::{resolve_image_url, source_name};

use crate::content::ArticleFields;
use crate::dom::{HtmlDocument, HtmlElement};

/// Generic title selectors in priority order.
const GENERIC_TITLE_SELECTORS: &[&str] = &[
    "meta[property='og:title']",
    "meta[name='twitter:title']",
    "meta[name='title']",
    "title",
    "h1",
];

/// Generic description selectors in priority order.
const GENERIC_DESCRIPTION_SELECTORS: &[&str] = &[
    "meta[name='description']",
    "meta[property='og:description']",
    "meta[name='twitter:description']",
];

/// Generic author selectors in priority order.
const GENERIC_AUTHOR_SELECTORS: &[&str] = &[
    "meta[name='author']",
    "meta[property='article:author']",
    "[rel='author']",
    ".byline",
    ".author",
    "[itemprop='author']",
];

/// Generic date selectors for meta tags (content attribute).
const GENERIC_DATE_META_SELECTORS: &[&str] = &[
    "meta[property='article:published_time']",
    "meta[name='date']",
    "meta[name='pubdate']",
    "meta[itemprop='datePublished']",
];

/// Generic site name selectors.
const GENERIC_SITE_NAME_SELECTORS: &[&str] = &[
    "meta[property='og:site_name']",
    "meta[name='application-name']",
];

/// Page-level image selectors in priority order.
const GENERIC_IMAGE_SELECTORS: &[(&str, &str)] = &[
    ("meta[property='og:image']", "content"),
    ("meta[property='og:image:url']", "content"),
    ("meta[name='twitter:image']", "content"),
    ("link[rel='image_src']", "href"),
];

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts an attribute value from the first matching selector that yields a non-empty result.
pub fn extract_first_attr<D: HtmlDocument>(doc: &D, selectors: &[&str], attr: &str) -> Option<String> {
    selectors.iter().find_map(|sel| {
        doc.select(sel).into_iter().find_map(|el| {
            el.attr(attr)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    })
}

/// Extracts text from the first selector that yields a non-empty match.
///
/// Meta selectors read the `content` attribute; anything else reads normalized text.
pub fn extract_field_text_single<D: HtmlDocument>(doc: &D, selectors: &[&str]) -> Option<String> {
    for &sel in selectors {
        if sel.starts_with("meta[") {
            if let Some(value) = extract_first_attr(doc, &[sel], "content") {
                return Some(normalize_whitespace(&value));
            }
            continue;
        }
        let found = doc
            .select(sel)
            .into_iter()
            .map(|el| el.clean_text())
            .find(|t| !t.is_empty());
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Parse a date string, trying RFC3339 first then falling back to dateparser.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Loose date-only formats are read as UTC midnight to avoid local timezone shifts.
    const LOOSE_PATTERNS: &[&str] = &[
        "%b %e, %Y",
        "%e %b %Y",
        "%b %d, %Y",
        "%d %b %Y",
        "%B %e, %Y",
        "%e %B %Y",
        "%B %d, %Y",
        "%d %B %Y",
    ];
    for pat in LOOSE_PATTERNS {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, pat) {
            let naive_dt = date.and_hms_opt(0, 0, 0)?;
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive_dt, Utc));
        }
    }

    if let Some(dt) = coinwire_feed::parse_flexible_time(s) {
        return Some(dt);
    }

    dateparser::parse(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Extracts the publish date from meta tags, then `time[datetime]`, then `time` text.
pub fn extract_date_published<D: HtmlDocument>(doc: &D) -> Option<DateTime<Utc>> {
    for sel in GENERIC_DATE_META_SELECTORS {
        if let Some(content) = extract_first_attr(doc, &[*sel], "content") {
            if let Some(dt) = parse_date(&content) {
                return Some(dt);
            }
        }
    }

    if let Some(dt) =
        extract_first_attr(doc, &["time[datetime]"], "datetime").and_then(|s| parse_date(&s))
    {
        return Some(dt);
    }

    extract_field_text_single(doc, &["time"]).and_then(|s| parse_date(&s))
}

/// Image URLs inside an element (`img[src]`, then `data-src`), resolved against `base`.
pub fn collect_element_images<E: HtmlElement>(el: &E, base: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for img in el.select("img") {
        let src = img
            .attr("src")
            .filter(|s| !s.trim().is_empty() && !s.trim_start().starts_with("data:"))
            .or_else(|| img.attr("data-src"));
        if let Some(src) = src {
            let resolved = resolve_image_url(&src, base).unwrap_or_else(|| src.trim().to_string());
            if !resolved.is_empty() && !out.contains(&resolved) {
                out.push(resolved);
            }
        }
    }
    out
}

/// Collects page-level metadata used to complete semantic and heuristic results.
pub fn page_metadata<D: HtmlDocument>(doc: &D, url: &str, include_images: bool) -> ArticleFields {
    let mut fields = ArticleFields {
        title: extract_field_text_single(doc, GENERIC_TITLE_SELECTORS).unwrap_or_default(),
        description: extract_field_text_single(doc, GENERIC_DESCRIPTION_SELECTORS)
            .unwrap_or_default(),
        author: extract_field_text_single(doc, GENERIC_AUTHOR_SELECTORS),
        published_at: extract_date_published(doc),
        source: extract_first_attr(doc, GENERIC_SITE_NAME_SELECTORS, "content")
            .or_else(|| source_name(url)),
        ..Default::default()
    };

    if include_images {
        for (sel, attr) in GENERIC_IMAGE_SELECTORS {
            if let Some(src) = extract_first_attr(doc, &[*sel], attr) {
                fields.push_image(resolve_image_url(&src, url).unwrap_or(src));
            }
        }
    }

    fields
}
