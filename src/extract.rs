//! On-demand article body extraction.
//!
//! Extraction never runs during a crawl; the caller asks for one post's body
//! at a time. The locator cascade tries the site's known body containers
//! first, then every registered container selector, then a generic
//! text-density scan. Whatever is found goes through the sanitizer before it
//! leaves this module.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

use crate::fetch::{self, BrowserSession};
use crate::models::ExtractedContent;
use crate::sanitize::sanitize_fragment;
use crate::scrapers;

/// Upper bound, in bytes, on both the sanitized HTML and the plain text.
pub const MAX_CONTENT_SIZE: usize = 500_000;
/// Upper bound on collected image URLs per extraction.
pub const MAX_IMAGES: usize = 50;

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static VIDEO: Lazy<Selector> = Lazy::new(|| Selector::parse("video").unwrap());
static P: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static A: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static CANDIDATES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article, main, section, div, td").unwrap());

/// Minimum paragraph-text mass for the generic fallback to accept a node.
const GENERIC_TEXT_FLOOR: i64 = 80;

/// Fetch a post page and extract its sanitized body.
///
/// Returns `None` when the page is unreachable or no plausible body
/// container can be located. fmkorea pages go through the browser session;
/// everything else uses the shared client.
#[instrument(level = "debug", skip(client, session), fields(%url, site))]
pub async fn extract_content(
    client: &Client,
    session: &BrowserSession,
    url: &str,
    site: Option<&str>,
) -> Option<ExtractedContent> {
    let html = if site == Some("fmkorea") {
        session.fetch(url).await
    } else {
        fetch::fetch_html(client, url).await
    };
    let html = match html {
        Ok(html) => html,
        Err(e) => {
            warn!(%url, error = %e, "extraction fetch failed");
            return None;
        }
    };
    let doc = Html::parse_document(&html);

    let element = locate_body(&doc, site)?;
    debug!(tag = element.value().name(), "body container located");

    let sanitized = sanitize_fragment(&element.html(), url);
    let mut images = sanitized.images;
    images.truncate(MAX_IMAGES);

    Some(ExtractedContent {
        html_content: truncate_to(sanitized.html, MAX_CONTENT_SIZE),
        text_content: truncate_to(plain_text(&element), MAX_CONTENT_SIZE),
        images,
        source_url: url.to_string(),
    })
}

/// The locator cascade: site selectors, then all known selectors with a
/// higher text floor, then the generic scan.
fn locate_body<'a>(doc: &'a Html, site: Option<&str>) -> Option<ElementRef<'a>> {
    if let Some(site) = site {
        for selector in scrapers::content_selectors(site) {
            let Ok(sel) = Selector::parse(selector) else {
                continue;
            };
            if let Some(el) = doc.select(&sel).next() {
                if has_content(&el, 10) {
                    return Some(el);
                }
            }
        }
    }
    for selector in scrapers::all_content_selectors() {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(el) = doc.select(&sel).next() {
            if has_content(&el, 50) {
                return Some(el);
            }
        }
    }
    generic_extract(doc)
}

/// True when the element carries meaningful text, or any media at all.
fn has_content(el: &ElementRef, min_text: usize) -> bool {
    let text_len: usize = el.text().map(|t| t.trim().len()).sum();
    if text_len > min_text {
        return true;
    }
    el.select(&IMG).next().is_some() || el.select(&VIDEO).next().is_some()
}

/// Generic body scan for pages with no registered container.
///
/// Scores each structural candidate by paragraph text mass penalized by
/// link text (navigation and comment lists are link-heavy), keeping the
/// highest-scoring node. Ties resolve to the later, deeper candidate since
/// document order visits ancestors first.
fn generic_extract(doc: &Html) -> Option<ElementRef<'_>> {
    let mut best: Option<(i64, ElementRef)> = None;
    for el in doc.select(&CANDIDATES) {
        let p_len: i64 = el
            .select(&P)
            .flat_map(|p| p.text())
            .map(|t| t.trim().chars().count() as i64)
            .sum();
        if p_len < GENERIC_TEXT_FLOOR {
            continue;
        }
        let link_len: i64 = el
            .select(&A)
            .flat_map(|a| a.text())
            .map(|t| t.trim().chars().count() as i64)
            .sum();
        let score = p_len - 2 * link_len;
        if score < GENERIC_TEXT_FLOOR {
            continue;
        }
        if best.map_or(true, |(s, _)| score >= s) {
            best = Some((score, el));
        }
    }
    best.map(|(_, el)| el)
}

/// Newline-joined text of the container, empty lines removed.
fn plain_text(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to at most `max` bytes, backing up to a char boundary.
fn truncate_to(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_body_prefers_site_selector() {
        let doc = Html::parse_document(concat!(
            "<html><body>",
            "<div class=\"sidebar\"><p>navigation links and more navigation</p></div>",
            "<div class=\"post_article\"><p>the actual body of the post here</p></div>",
            "</body></html>",
        ));
        let el = locate_body(&doc, Some("clien")).unwrap();
        assert!(el.value().classes().any(|c| c == "post_article"));
    }

    #[test]
    fn test_site_selector_with_only_media_is_accepted() {
        let doc = Html::parse_document(
            "<html><body><div class=\"xe_content\"><img src=\"https://x/a.jpg\"></div></body></html>",
        );
        assert!(locate_body(&doc, Some("theqoo")).is_some());
    }

    #[test]
    fn test_generic_fallback_penalizes_link_lists() {
        let body_text = "문단 ".repeat(60);
        let html = format!(
            concat!(
                "<html><body>",
                "<div id=\"nav\"><p>{links}</p><a href=\"/a\">{links}</a></div>",
                "<div id=\"story\"><p>{body}</p></div>",
                "</body></html>",
            ),
            links = "링크 ".repeat(60),
            body = body_text,
        );
        let doc = Html::parse_document(&html);
        let el = locate_body(&doc, None).unwrap();
        assert_eq!(el.value().id(), Some("story"));
    }

    #[test]
    fn test_no_plausible_body_yields_none() {
        let doc = Html::parse_document(
            "<html><body><div><p>short</p></div></body></html>",
        );
        assert!(locate_body(&doc, Some("ruliweb")).is_none());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // "가" is 3 bytes in UTF-8
        let s = "가".repeat(10);
        let cut = truncate_to(s, 10);
        assert_eq!(cut, "가".repeat(3));
        assert_eq!(truncate_to("abc".to_string(), 10), "abc");
    }

    #[test]
    fn test_plain_text_joins_trimmed_lines() {
        let doc = Html::parse_document(
            "<html><body><div id=\"c\"><p> one </p><p>two</p></div></body></html>",
        );
        let sel = Selector::parse("#c").unwrap();
        let el = doc.select(&sel).next().unwrap();
        assert_eq!(plain_text(&el), "one\ntwo");
    }
}
