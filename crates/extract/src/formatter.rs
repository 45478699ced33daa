// ABOUTME: Content formatter turning raw article HTML or text into clean text with derived metrics.
// ABOUTME: DOM cleaning first, regex stripping when the DOM path fails; never returns an error.

//! Content formatting.
//!
//! [`format`] cleans markup (ads, social widgets and comment sections are
//! removed according to [`FormatOptions`]), derives a title, description and
//! excerpt, and computes word count, reading time and a language guess.
//!
//! Formatting its own `content` output again with the same options is a
//! no-op for `content`, `word_count` and `reading_time`. Input without element
//! markup is taken as text: entities are not decoded and nothing is stripped.
//! Text output writes a `<` that would open a tag as `&lt;`, so it never reads
//! as markup on the next pass.

use coinwire_feed::{collapse_whitespace, normalize_paragraphs, strip_html, strip_html_paragraphs};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::dom::{HtmlDocument, HtmlElement, HtmlParser, NoiseFilter, ScraperParser, NON_TEXT_SELECTOR};
use crate::error::ExtractError;
use crate::extractors::metadata::extract_first_attr;
use crate::options::FormatOptions;

/// Words per minute used for reading time.
pub const WORDS_PER_MINUTE: usize = 200;

/// Maximum excerpt length including the trailing ellipsis.
pub const EXCERPT_MAX_CHARS: usize = 300;

const ELLIPSIS: &str = "...";
const DESCRIPTION_FALLBACK_CHARS: usize = 200;
const TITLE_SELECTORS: &[&str] = &["h1", "title", "h2", "h3"];
const DESCRIPTION_SELECTORS: &[&str] = &["meta[name='description']", "meta[property='og:description']"];

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([a-zA-Z!/])").unwrap());
static IMG_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b").unwrap());
static LINK_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\b[^>]*\bhref\s*=").unwrap());
static LINK_HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});
static IMG_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});
static HEADING_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["h1", "title", "h2", "h3"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{0}\b[^>]*>(.*?)</{0}\s*>", tag)).unwrap())
        .collect()
});
static META_DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\b[^>]*?(?:name|property)\s*=\s*["'](?:og:)?description["'][^>]*?\scontent\s*=\s*["']([^"']*)["']"#)
        .unwrap()
});
static PARAGRAPH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").unwrap());
static SENTENCE_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?])[ \t]+(\p{Lu})").unwrap());
static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^.!?]+(?:[.!?]+["')\]]*|$)"#).unwrap());
static PUNCTUATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Formatted article content with derived metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedContent {
    pub title: String,
    pub description: String,
    pub content: String,
    pub excerpt: String,
    pub word_count: usize,
    /// Minutes, `ceil(word_count / 200)`.
    pub reading_time: usize,
    pub has_images: bool,
    pub has_links: bool,
    /// Two-letter language code.
    pub language: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// Intermediate output of the cleaning step.
#[derive(Debug, Default)]
struct Cleaned {
    heading: Option<String>,
    /// First line of a plausible title length.
    title_line: Option<String>,
    meta_description: Option<String>,
    paragraph_description: Option<String>,
    /// Plain text, paragraphs joined with "\n\n".
    text: String,
    /// Sanitized markup, only when formatting is preserved.
    markup: Option<String>,
    links: Vec<String>,
    images: Vec<String>,
}

/// Formats raw content with the default scraper-backed parser.
pub fn format(raw: &str, opts: &FormatOptions) -> FormattedContent {
    format_with(&ScraperParser::default(), raw, opts)
}

/// Formats raw content using the given HTML parser.
pub fn format_with<P: HtmlParser>(parser: &P, raw: &str, opts: &FormatOptions) -> FormattedContent {
    let has_images = IMG_TAG_RE.is_match(raw);
    let has_links = LINK_TAG_RE.is_match(raw);

    let cleaned = if MARKUP_RE.is_match(raw) {
        match clean_with_dom(parser, raw, opts) {
            Ok(cleaned) => cleaned,
            Err(err) => {
                tracing::debug!(error = %err, "DOM cleaning failed, using regex stripper");
                clean_with_regex(raw, opts)
            }
        }
    } else {
        clean_plain(raw)
    };

    let text = escape_tag_opens(&cleaned.text);
    let content = match cleaned.markup {
        Some(ref markup) => truncate_markup(markup, opts.max_length),
        None if opts.add_line_breaks => truncate_chars(&add_line_breaks(&text), opts.max_length),
        None => truncate_chars(&text, opts.max_length),
    };

    let plain_content = if cleaned.markup.is_some() {
        strip_html_paragraphs(&content)
    } else {
        content.clone()
    };
    let word_count = count_words(&plain_content);

    let single_line = collapse_whitespace(&text);

    FormattedContent {
        title: cleaned
            .heading
            .clone()
            .or_else(|| cleaned.title_line.clone())
            .unwrap_or_default(),
        description: cleaned
            .meta_description
            .clone()
            .or_else(|| cleaned.paragraph_description.clone())
            .unwrap_or_else(|| truncate_chars(&single_line, DESCRIPTION_FALLBACK_CHARS)),
        excerpt: excerpt(&single_line),
        word_count,
        reading_time: reading_time(word_count),
        has_images,
        has_links,
        language: if opts.detect_language {
            detect_language(&text).to_string()
        } else {
            "en".to_string()
        },
        links: cleaned.links,
        images: cleaned.images,
        content,
    }
}

fn noise_filter(opts: &FormatOptions) -> NoiseFilter {
    NoiseFilter {
        ads: opts.remove_ads,
        social: opts.remove_social,
        comments: opts.remove_comments,
    }
}

fn clean_with_dom<P: HtmlParser>(
    parser: &P,
    raw: &str,
    opts: &FormatOptions,
) -> Result<Cleaned, ExtractError> {
    let mut doc = parser
        .parse_document(raw)
        .map_err(|e| ExtractError::format("FormatDom", Some(anyhow::Error::new(e))))?;

    doc.remove(NON_TEXT_SELECTOR);
    let filter = noise_filter(opts);
    if filter.is_enabled() {
        doc.remove_where(&|info| filter.is_noise(info));
    }

    let heading = TITLE_SELECTORS.iter().find_map(|sel| {
        doc.select(sel)
            .into_iter()
            .map(|el| el.clean_text())
            .find(|t| !t.is_empty())
    });

    let meta_description = extract_first_attr(&doc, DESCRIPTION_SELECTORS, "content")
        .map(|d| collapse_whitespace(&d))
        .filter(|d| !d.is_empty());

    let paragraph_description = doc
        .select("p")
        .into_iter()
        .map(|p| p.clean_text())
        .find(|t| (50..=500).contains(&t.chars().count()));

    let body_html = doc
        .select_first("body")
        .map(|b| b.inner_html())
        .unwrap_or_else(|| doc.html());

    let links = if opts.extract_links {
        unique(doc.select("a[href]").into_iter().filter_map(|a| a.attr("href")))
    } else {
        Vec::new()
    };
    let images = if opts.extract_images {
        unique(doc.select("img[src]").into_iter().filter_map(|i| i.attr("src")))
    } else {
        Vec::new()
    };

    let text = strip_html_paragraphs(&body_html);

    Ok(Cleaned {
        heading,
        title_line: first_title_line(text.lines().map(collapse_whitespace)),
        meta_description,
        paragraph_description,
        text,
        markup: opts.preserve_formatting.then(|| sanitize_html(&body_html)),
        links,
        images,
    })
}

fn clean_with_regex(raw: &str, opts: &FormatOptions) -> Cleaned {
    let heading = HEADING_RES.iter().find_map(|re| {
        re.captures_iter(raw)
            .map(|c| strip_html(&c[1]))
            .find(|t| !t.is_empty())
    });

    let meta_description = META_DESCRIPTION_RE
        .captures(raw)
        .map(|c| strip_html(&c[1]))
        .filter(|d| !d.is_empty());

    let paragraph_description = PARAGRAPH_RE
        .captures_iter(raw)
        .map(|c| strip_html(&c[1]))
        .find(|t| (50..=500).contains(&t.chars().count()));

    let links = if opts.extract_links {
        unique(LINK_HREF_RE.captures_iter(raw).filter_map(|c| first_group(&c)))
    } else {
        Vec::new()
    };
    let images = if opts.extract_images {
        unique(IMG_SRC_RE.captures_iter(raw).filter_map(|c| first_group(&c)))
    } else {
        Vec::new()
    };

    // The body drops head-only text such as <title>
    let body = strip_head(raw);

    Cleaned {
        heading,
        title_line: first_title_line(body.lines().map(strip_html)),
        meta_description,
        paragraph_description,
        text: strip_html_paragraphs(&body),
        markup: None,
        links,
        images,
    }
}

fn clean_plain(raw: &str) -> Cleaned {
    Cleaned {
        title_line: first_title_line(raw.lines().map(collapse_whitespace)),
        text: normalize_paragraphs(raw),
        ..Cleaned::default()
    }
}

fn escape_tag_opens(text: &str) -> String {
    MARKUP_RE.replace_all(text, "&lt;$1").into_owned()
}

fn strip_head(raw: &str) -> String {
    static HEAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<head\b.*?</head\s*>").unwrap());
    HEAD_RE.replace_all(raw, " ").into_owned()
}

fn first_group(caps: &regex::Captures<'_>) -> Option<String> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().trim().to_string())
}

fn unique(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        let v = v.trim().to_string();
        if !v.is_empty() && !v.starts_with('#') && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Sanitize HTML keeping structural and inline tags.
///
/// Allowed elements: p, br, strong, b, em, i, u, h1-h6, ul, ol, li, blockquote, pre, code,
/// img, a, span, div, figure, figcaption.
pub fn sanitize_html(html: &str) -> String {
    let allowed_tags = [
        "p", "br", "strong", "b", "em", "i", "u", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol",
        "li", "blockquote", "pre", "code", "img", "a", "span", "div", "figure", "figcaption",
    ];

    let mut builder = ammonia::Builder::new();
    builder.tags(allowed_tags.iter().copied().collect());
    builder.add_tag_attributes("a", &["href"]);
    builder.add_tag_attributes("img", &["src", "alt", "width", "height"]);

    builder
        .url_schemes(["http", "https", "mailto"].iter().copied().collect())
        .clean(html)
        .to_string()
        .trim()
        .to_string()
}

/// Inserts a paragraph break after `.`, `!` or `?` followed by spaces and an uppercase letter.
pub fn add_line_breaks(text: &str) -> String {
    SENTENCE_BREAK_RE.replace_all(text, "$1\n\n$2").into_owned()
}

/// Cuts `text` to `max` characters plus "..." when longer; shorter text is returned as is.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    // Half of a paragraph break would not survive re-normalization
    if cut.ends_with('\n') && !cut.ends_with("\n\n") {
        cut.pop();
        cut.push(' ');
    }
    cut.push_str(ELLIPSIS);
    cut
}

/// Cuts sanitized markup to `max` characters without splitting a tag or an
/// entity, appends "...", and sanitizes again so open elements are closed.
fn truncate_markup(markup: &str, max: usize) -> String {
    if markup.chars().count() <= max {
        return markup.to_string();
    }
    let mut cut: String = markup.chars().take(max).collect();
    if let Some(open) = cut.rfind('<') {
        if !cut[open..].contains('>') {
            cut.truncate(open);
        }
    }
    if let Some(amp) = cut.rfind('&') {
        if !cut[amp..].contains(';') {
            cut.truncate(amp);
        }
    }
    cut.push_str(ELLIPSIS);
    sanitize_html(&cut)
}

/// Whole sentences up to 297 characters, then "..." if anything was left out.
pub fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    let budget = EXCERPT_MAX_CHARS - ELLIPSIS.len();
    if text.chars().count() <= EXCERPT_MAX_CHARS {
        let sentences: Vec<&str> = SENTENCE_RE.find_iter(text).map(|m| m.as_str()).collect();
        if sentences.concat().trim() == text {
            return text.to_string();
        }
    }

    let mut out = String::new();
    for sentence in SENTENCE_RE.find_iter(text) {
        let sentence = sentence.as_str().trim();
        if sentence.is_empty() {
            continue;
        }
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + sentence.chars().count() > budget {
            break;
        }
        if extra == 1 {
            out.push(' ');
        }
        out.push_str(sentence);
    }

    if out.is_empty() {
        let cut: String = text.chars().take(budget).collect();
        return format!("{}{}", cut.trim_end(), ELLIPSIS);
    }
    if out.chars().count() < text.chars().count() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Counts words after removing punctuation.
pub fn count_words(text: &str) -> usize {
    PUNCTUATION_RE.replace_all(text, "").split_whitespace().count()
}

/// `ceil(word_count / 200)`.
pub fn reading_time(word_count: usize) -> usize {
    word_count.div_ceil(WORDS_PER_MINUTE)
}

fn first_title_line(mut lines: impl Iterator<Item = String>) -> Option<String> {
    lines.find(|line| {
        let n = line.chars().count();
        n > 10 && n < 200
    })
}

const LANGUAGE_WORDS: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "and", "is", "are", "was", "were", "of", "to", "in", "that", "it", "for",
            "with", "on", "this", "be", "have", "has", "from", "by", "will", "not", "at", "as",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "los", "las", "de", "del", "que", "y", "en", "un", "una", "es", "por",
            "para", "con", "no", "se", "su", "al", "lo", "más", "pero", "como", "fue",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "les", "des", "de", "du", "et", "est", "un", "une", "que", "qui", "dans",
            "pour", "pas", "sur", "au", "avec", "ce", "il", "elle", "sont", "mais",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "zu", "den", "mit", "von",
            "sich", "auf", "für", "dem", "des", "im", "auch", "es", "sind", "wird",
        ],
    ),
    (
        "it",
        &[
            "il", "lo", "la", "gli", "le", "di", "che", "e", "è", "un", "una", "per", "non",
            "con", "sono", "del", "della", "nel", "da", "si", "ma", "anche",
        ],
    ),
];

/// Guesses the language from common-word frequency; ties and no matches yield "en".
pub fn detect_language(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let mut best = ("en", 0usize);
    let mut tied = false;
    for &(lang, words) in LANGUAGE_WORDS {
        let score = tokens
            .iter()
            .filter(|t| words.iter().any(|w| w == *t))
            .count();
        if score > best.1 {
            best = (lang, score);
            tied = false;
        } else if score == best.1 && score > 0 {
            tied = true;
        }
    }

    if best.1 == 0 || tied {
        "en"
    } else {
        best.0
    }
}
