// ABOUTME: Class/id patterns for ads, social widgets and comment sections.
// ABOUTME: NoiseFilter decides which elements are removed based on the enabled pattern groups.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ElementInfo;

// Patterns match whole class/id tokens split on whitespace, '-' and '_'.
static AD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s_-])(?:ad|ads|adv|advert\w*|banner\w*|sponsor|sponsored|promo\w*)(?:$|[\s_-])")
        .unwrap()
});
static SOCIAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s_-])(?:social\w*|share|sharing|sharebar|facebook|twitter)(?:$|[\s_-])")
        .unwrap()
});
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s_-])(?:comment|comments|discussion|feedback|disqus\w*)(?:$|[\s_-])")
        .unwrap()
});

/// Container tags that are never removed by class/id matching.
const PROTECTED_TAGS: &[&str] = &["html", "head", "body", "article", "main"];

/// Which noise groups to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseFilter {
    pub ads: bool,
    pub social: bool,
    pub comments: bool,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl NoiseFilter {
    pub fn all() -> Self {
        Self {
            ads: true,
            social: true,
            comments: true,
        }
    }

    pub fn none() -> Self {
        Self {
            ads: false,
            social: false,
            comments: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ads || self.social || self.comments
    }

    /// True if the element's class or id matches an enabled group.
    pub fn is_noise(&self, info: ElementInfo<'_>) -> bool {
        if !self.is_enabled() || PROTECTED_TAGS.contains(&info.tag) {
            return false;
        }
        [info.class, info.id]
            .into_iter()
            .flatten()
            .any(|value| self.matches(value))
    }

    fn matches(&self, value: &str) -> bool {
        (self.ads && AD_RE.is_match(value))
            || (self.social && SOCIAL_RE.is_match(value))
            || (self.comments && COMMENT_RE.is_match(value))
    }
}
