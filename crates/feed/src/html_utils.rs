// ABOUTME: Regex-based HTML text utilities usable without a DOM.
// ABOUTME: Strips tags (dropping script/style bodies), decodes entities, and normalizes whitespace.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static NON_TEXT_BLOCKS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>|<!--.*?-->",
    )
    .unwrap()
});

static BLOCK_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(?:p|div|br|hr|li|ul|ol|dl|dt|dd|h[1-6]|section|article|aside|header|footer|nav|main|blockquote|pre|table|thead|tbody|tr|td|th|figure|figcaption)\b[^>]*>",
    )
    .unwrap()
});

static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z][a-zA-Z0-9]{1,31});").unwrap());

static PARAGRAPH_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r\f]*\n\s*").unwrap());

/// Named entities decoded by `decode_entities`. Anything else is left verbatim.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", " "),
    ("ndash", "\u{2013}"),
    ("mdash", "\u{2014}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("sbquo", "\u{201A}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("bdquo", "\u{201E}"),
    ("hellip", "\u{2026}"),
    ("laquo", "\u{00AB}"),
    ("raquo", "\u{00BB}"),
    ("copy", "\u{00A9}"),
    ("reg", "\u{00AE}"),
    ("trade", "\u{2122}"),
    ("bull", "\u{2022}"),
    ("middot", "\u{00B7}"),
    ("deg", "\u{00B0}"),
    ("plusmn", "\u{00B1}"),
    ("times", "\u{00D7}"),
    ("divide", "\u{00F7}"),
    ("frac12", "\u{00BD}"),
    ("frac14", "\u{00BC}"),
    ("frac34", "\u{00BE}"),
    ("euro", "\u{20AC}"),
    ("pound", "\u{00A3}"),
    ("yen", "\u{00A5}"),
    ("cent", "\u{00A2}"),
    ("iexcl", "\u{00A1}"),
    ("iquest", "\u{00BF}"),
    ("eacute", "\u{00E9}"),
    ("egrave", "\u{00E8}"),
    ("aacute", "\u{00E1}"),
    ("agrave", "\u{00E0}"),
    ("oacute", "\u{00F3}"),
    ("uacute", "\u{00FA}"),
    ("iacute", "\u{00ED}"),
    ("ntilde", "\u{00F1}"),
    ("ccedil", "\u{00E7}"),
    ("uuml", "\u{00FC}"),
    ("ouml", "\u{00F6}"),
    ("auml", "\u{00E4}"),
    ("szlig", "\u{00DF}"),
];

/// Strips HTML to a single line of plain text: tags removed, entities decoded,
/// whitespace collapsed to single spaces.
pub fn strip_html(s: &str) -> String {
    collapse_whitespace(&strip_tags_raw(s))
}

/// Strips HTML to plain text keeping paragraph structure: block-level tags
/// become blank lines, whitespace inside each paragraph is collapsed, and
/// paragraphs are joined with `"\n\n"`.
pub fn strip_html_paragraphs(s: &str) -> String {
    normalize_paragraphs(&strip_tags_raw(s))
}

fn strip_tags_raw(s: &str) -> String {
    let without_blocks = NON_TEXT_BLOCKS_RE.replace_all(s, " ");
    let with_breaks = BLOCK_TAG_RE.replace_all(&without_blocks, "\n\n");
    let text = ANY_TAG_RE.replace_all(&with_breaks, "");
    decode_entities(&text)
}

/// Decodes named and numeric HTML entities in a single pass, so `&amp;lt;`
/// becomes `&lt;` rather than `<`. Unknown or invalid entities are kept verbatim.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY_RE
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            decode_entity(body).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, v)| v.to_string())
}

/// Collapses runs of whitespace into single spaces and trims.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits text on blank lines, collapses whitespace within each paragraph,
/// drops empty paragraphs, and rejoins with `"\n\n"`. Idempotent.
pub fn normalize_paragraphs(s: &str) -> String {
    PARAGRAPH_SPLIT_RE
        .split(s)
        .map(collapse_whitespace)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strip_html_basic() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
        assert_eq!(strip_html("<b>Bold</b> and <i>italic</i>"), "Bold and italic");
        assert_eq!(strip_html("<p>Hello</p>\n\n<p>World</p>"), "Hello World");
        assert_eq!(strip_html("Multiple   spaces"), "Multiple spaces");
    }

    #[test]
    fn strip_html_drops_script_and_style_bodies() {
        let html = "<p>Before</p><script>var x = '<p>no</p>';</script><style>.a{}</style><p>After</p>";
        assert_eq!(strip_html(html), "Before After");
    }

    #[test]
    fn strip_html_keeps_inline_words_together() {
        assert_eq!(strip_html("Bit<b>coin</b> rallies"), "Bitcoin rallies");
        assert_eq!(strip_html("<p>One</p><p>Two</p>"), "One Two");
    }

    #[test]
    fn strip_html_decodes_entities() {
        assert_eq!(strip_html("<p>Tom &amp; Jerry</p>"), "Tom & Jerry");
        assert_eq!(strip_html("&lt;script&gt;"), "<script>");
    }

    #[test]
    fn paragraphs_survive_block_tags() {
        let html = "<h1>Title</h1><p>First   line.</p>\n<p>Second <br> part</p>";
        assert_eq!(strip_html_paragraphs(html), "Title\n\nFirst line.\n\nSecond\n\npart");
    }

    #[test]
    fn normalize_paragraphs_is_idempotent() {
        let once = normalize_paragraphs("  a  b \n\n\n c\nd \n \n e ");
        assert_eq!(once, "a b\n\nc d\n\ne");
        assert_eq!(normalize_paragraphs(&once), once);
    }

    #[test]
    fn decode_entities_named_and_numeric() {
        assert_eq!(decode_entities("&amp;&#38;&lt;"), "&&<");
        assert_eq!(decode_entities("&#169; &#xA9;"), "\u{00A9} \u{00A9}");
        assert_eq!(decode_entities("&mdash;"), "\u{2014}");
        assert_eq!(decode_entities("&nbsp;"), " ");
    }

    #[test]
    fn decode_entities_single_pass() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn decode_entities_leaves_unknown() {
        assert_eq!(decode_entities("&bogus; & &#xZZ;"), "&bogus; & &#xZZ;");
        assert_eq!(decode_entities(""), "");
    }
}
