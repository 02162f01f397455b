//! Shared coercion helpers used by every source adapter.
//!
//! Listing markup is messy: counts arrive as `"1,234회"` or `"[12]"`, hrefs
//! are relative (and in one case point at the wrong directory), and titles
//! hide inside nested spans. The helpers here normalize all of that.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use url::Url;

static FIRST_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Parse the first integer run out of locale-formatted text.
///
/// Strips thousands separators and tolerates surrounding text or brackets.
/// Empty or digit-free input yields `None`, never zero.
///
/// # Examples
///
/// ```
/// use buzzit_crawler::utils::to_int_safe;
/// assert_eq!(to_int_safe("1,234회"), Some(1234));
/// assert_eq!(to_int_safe("[12]"), Some(12));
/// assert_eq!(to_int_safe(""), None);
/// ```
pub fn to_int_safe(text: &str) -> Option<u64> {
    let cleaned = text.replace(',', "");
    FIRST_INT
        .find(cleaned.trim())
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolve a possibly-relative href against a base URL.
///
/// humoruniv emits `read.html?...` links relative to the board directory,
/// not the listing URL, so those are rebased onto the board path.
pub fn absolutize(href: &str, base: &str) -> Option<String> {
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    let base = if base.contains("humoruniv.com") && href.starts_with("read.html") {
        "https://web.humoruniv.com/board/humor/"
    } else {
        base
    };
    Url::parse(base).ok()?.join(href).ok().map(Into::into)
}

/// Concatenated, whitespace-normalized text of an element and its children.
pub fn text_of(el: &ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Walk up from an element to the nearest ancestor with the given tag name.
pub fn ancestor_element<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    ancestor(el, |candidate| candidate.value().name() == name)
}

/// Walk up from an element to the nearest ancestor matching a predicate.
pub fn ancestor<'a>(
    el: ElementRef<'a>,
    pred: impl Fn(&ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    let mut node = el.parent();
    while let Some(n) = node {
        if let Some(parent) = ElementRef::wrap(n) {
            if pred(&parent) {
                return Some(parent);
            }
        }
        node = n.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_to_int_safe_locale_formats() {
        assert_eq!(to_int_safe("1,234회"), Some(1234));
        assert_eq!(to_int_safe("[12]"), Some(12));
        assert_eq!(to_int_safe("조회 3,456"), Some(3456));
        assert_eq!(to_int_safe("  78 "), Some(78));
    }

    #[test]
    fn test_to_int_safe_absent_is_none_not_zero() {
        assert_eq!(to_int_safe(""), None);
        assert_eq!(to_int_safe("   "), None);
        assert_eq!(to_int_safe("없음"), None);
    }

    #[test]
    fn test_absolutize_relative_and_absolute() {
        assert_eq!(
            absolutize("/free/123", "https://www.ddanzi.com/"),
            Some("https://www.ddanzi.com/free/123".to_string())
        );
        assert_eq!(
            absolutize("https://a.example/x", "https://b.example/"),
            Some("https://a.example/x".to_string())
        );
    }

    #[test]
    fn test_absolutize_humoruniv_read_rewrite() {
        let resolved = absolutize(
            "read.html?table=pds&number=99",
            "https://web.humoruniv.com/board/humor/list.html?table=pds",
        )
        .unwrap();
        assert!(resolved.starts_with("https://web.humoruniv.com/board/humor/read.html"));
        assert!(resolved.contains("number=99"));
    }

    #[test]
    fn test_ancestor_element() {
        let html = Html::parse_fragment("<table><tr><td><a id=\"x\">hi</a></td></tr></table>");
        let sel = Selector::parse("a").unwrap();
        let a = html.select(&sel).next().unwrap();

        let tr = ancestor_element(a, "tr").unwrap();
        assert_eq!(tr.value().name(), "tr");
        assert!(ancestor_element(a, "ul").is_none());
    }

    #[test]
    fn test_text_of_normalizes_whitespace() {
        let html = Html::parse_fragment("<a> hello \n  <span>world</span> </a>");
        let sel = Selector::parse("a").unwrap();
        let a = html.select(&sel).next().unwrap();
        assert_eq!(text_of(&a), "hello world");
    }
}
