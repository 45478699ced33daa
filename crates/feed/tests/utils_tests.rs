// ABOUTME: Integration tests for feed utility modules.
// ABOUTME: Tests flexible time parsing, HTML text utilities, and image URL resolution.

use coinwire_feed::{
    decode_entities, normalize_paragraphs, parse_flexible_time, resolve_image_url, source_name,
    strip_html, strip_html_paragraphs,
};

mod time_parse_tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_flexible_time("2023-06-15T14:30:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 6, 15, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc2822_with_timezone() {
        let dt = parse_flexible_time("Mon, 02 Jan 2006 15:04:05 -0700").unwrap();
        // -0700 means 15:04:05 local = 22:04:05 UTC
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap());
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_flexible_time("2023-12-25").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 12, 25, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_flexible_time(""), None);
        assert_eq!(parse_flexible_time("next tuesday-ish"), None);
    }
}

mod html_utils_tests {
    use super::*;

    #[test]
    fn test_strip_html_removes_tags() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn test_strip_html_drops_scripts() {
        assert_eq!(
            strip_html("<p>Price</p><script>var x = 1;</script><style>p{}</style>"),
            "Price"
        );
    }

    #[test]
    fn test_strip_html_paragraphs_keeps_breaks() {
        let text = strip_html_paragraphs("<p>First   line.</p><p>Second&nbsp;line.</p>");
        assert_eq!(text, "First line.\n\nSecond line.");
    }

    #[test]
    fn test_decode_entities_common() {
        assert_eq!(decode_entities("&amp;&lt;&gt;&quot;&#39;"), "&<>\"'");
        assert_eq!(decode_entities("&#x20AC;&#8364;"), "€€");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_normalize_paragraphs() {
        assert_eq!(normalize_paragraphs("  a \t b \n \n\n c  "), "a b\n\nc");
    }
}

mod url_tests {
    use super::*;

    #[test]
    fn test_resolve_image_url_absolute_unchanged() {
        assert_eq!(
            resolve_image_url("https://cdn.example.com/a.jpg", "https://example.com/post"),
            Some("https://cdn.example.com/a.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_image_url_relative_path() {
        assert_eq!(
            resolve_image_url("img/a.jpg", "https://example.com/blog/post"),
            Some("https://example.com/blog/img/a.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_image_url_bad_base() {
        assert_eq!(resolve_image_url("/a.jpg", "not a url"), None);
    }

    #[test]
    fn test_source_name_strips_www() {
        assert_eq!(
            source_name("https://www.theblock.example/post/1").as_deref(),
            Some("theblock.example")
        );
    }
}
