//! Thumbnail resolution heuristics.
//!
//! Two call sites share the same idea — find the first *content* image —
//! with different scopes:
//!
//! - [`resolve_from_element`] scans a listing row while an adapter parses it.
//! - [`resolve_from_page`] scans a post's detail page, used by the backfill
//!   pass for posts whose listing row carried no usable image.
//!
//! Community boards decorate every row with avatars, rank badges, emoticons
//! and numbered list icons, so both resolvers run candidates through a
//! noise-pattern gauntlet before accepting anything. A post without a real
//! content image simply has no thumbnail; nothing is defaulted.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

use crate::fetch::{self, BrowserSession};
use crate::scrapers;
use crate::utils::absolutize;

/// Lazy-load attributes checked before `src`, in preference order.
const LAZY_ATTRS: [&str; 4] = ["data-src", "data-original", "data-lazy-src", "data-lazy"];

/// URL fragments that mark a listing image as UI noise rather than content.
const LISTING_NOISE: &[&str] = &[
    "profile", "avatar", "icon", "logo", "emoticon", "emot",
    "placeholder", "blank", "spacer", "noimg", "no_img",
    "/img/new_icon", "/img/renewal", "/img/rank/", "/renew/images/",
    "/newimg/",
    "/board/level/", "/level/",
    "num01", "num02", "num03", "num04", "num05",
    "num06", "num07", "num08", "num09", "num10",
    ".svg",
];

/// Broader exclusion set for detail-page images (lazy placeholders, buttons,
/// gallery numbering) on top of the usual icon noise.
const CONTENT_NOISE: &[&str] = &[
    "loading", "placeholder", "blank", "spacer", "pixel",
    "noimg", "no_img", "no_image", "no-image",
    "icon", "logo", "emoticon", "emot",
    "/newimg/", "/renew/images/", "/btn_", "btn_",
    "/board/level/", "/level/", "/img/rank/",
    "gallery_no", "thumb_no",
];

/// Patterns that mark an `og:image` as the site's default share image.
const OG_DEFAULT_PATTERNS: &[&str] = &[
    "headtitle", "default", "og_default", "og-default",
    "common/", "share_img", "share_icon", "logo", "favicon",
    "no_image", "noimage", "no-image",
];

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static VIDEO: Lazy<Selector> = Lazy::new(|| Selector::parse("video").unwrap());
static IFRAME: Lazy<Selector> = Lazy::new(|| Selector::parse("iframe").unwrap());
static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property=\"og:image\"]").unwrap());

static YOUTUBE_EMBED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtube\.com/embed/([a-zA-Z0-9_-]+)").unwrap());
static YOUTUBE_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtu\.be/([a-zA-Z0-9_-]+)").unwrap());

/// Pick the best-effort thumbnail from a listing row, or `None`.
///
/// Scans up to 5 images, preferring a lazy-load attribute over a possibly
/// placeholder `src`; rejects data-URLs, noise patterns, and images declared
/// smaller than 30px on either dimension.
pub fn resolve_from_element(element: ElementRef, base_url: &str) -> Option<String> {
    for img in element.select(&IMG).take(5) {
        let Some(src) = candidate_src(&img) else {
            continue;
        };
        let lower = src.to_lowercase();
        if LISTING_NOISE.iter().any(|p| lower.contains(p)) {
            continue;
        }
        if declared_below(&img, "width", 30) || declared_below(&img, "height", 30) {
            continue;
        }
        return absolutize(&src, base_url);
    }
    None
}

/// Resolve a thumbnail from a post's detail page, or `None`.
///
/// Strategy, in order: first non-noise image inside the site's body
/// container, then a `<video poster>`, then a YouTube embed rewritten to its
/// static thumbnail URL, then the page's `og:image` (guarded against site
/// default images). When the body container cannot be located at all, the
/// `og:image` guard is the only strategy tried.
pub fn resolve_from_page(doc: &Html, site: &str, base_url: &str) -> Option<String> {
    let container = scrapers::content_selectors(site)
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|sel| doc.select(&sel).next());

    let Some(container) = container else {
        return og_image(doc);
    };

    for img in container.select(&IMG).take(10) {
        let Some(src) = candidate_src(&img) else {
            continue;
        };
        let lower = src.to_lowercase();
        if CONTENT_NOISE.iter().any(|p| lower.contains(p)) {
            continue;
        }
        if declared_below(&img, "width", 50) || declared_below(&img, "height", 50) {
            continue;
        }
        return absolutize(&src, base_url);
    }

    for video in container.select(&VIDEO).take(5) {
        if let Some(poster) = video.value().attr("poster").filter(|p| !p.is_empty()) {
            return absolutize(poster, base_url);
        }
    }

    for iframe in container.select(&IFRAME).take(5) {
        let src = iframe.value().attr("src").unwrap_or("");
        if let Some(id) = youtube_id(src) {
            return Some(format!("https://img.youtube.com/vi/{id}/hqdefault.jpg"));
        }
    }

    og_image(doc)
}

/// Fetch a post's detail page and resolve its thumbnail.
///
/// Failures are logged and reported as `None`; an unreachable page simply
/// leaves the post without a thumbnail.
#[instrument(level = "debug", skip_all, fields(site, %url))]
pub async fn fetch_detail_thumbnail(
    client: &Client,
    session: &BrowserSession,
    url: &str,
    site: &str,
) -> Option<String> {
    let html = if site == "fmkorea" {
        session.fetch(url).await
    } else {
        fetch::fetch_html(client, url).await
    };
    let html = match html {
        Ok(html) => html,
        Err(e) => {
            warn!(site, %url, error = %e, "thumbnail page fetch failed");
            return None;
        }
    };
    let doc = Html::parse_document(&html);
    let thumb = resolve_from_page(&doc, site, url);
    debug!(site, found = thumb.is_some(), "detail thumbnail resolution");
    thumb
}

/// Real image URL for an `<img>`: lazy-load attributes win over `src`;
/// data-URLs and empty sources are rejected.
fn candidate_src(img: &ElementRef) -> Option<String> {
    let lazy = LAZY_ATTRS.iter().find_map(|attr| {
        img.value()
            .attr(attr)
            .filter(|v| v.starts_with("http") || v.starts_with('/'))
    });
    let src = lazy.or_else(|| img.value().attr("src")).unwrap_or("");
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    Some(src.to_string())
}

fn declared_below(img: &ElementRef, attr: &str, min: u32) -> bool {
    img.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .is_some_and(|dim| dim < min)
}

fn youtube_id(src: &str) -> Option<String> {
    YOUTUBE_EMBED
        .captures(src)
        .or_else(|| YOUTUBE_SHORT.captures(src))
        .map(|c| c[1].to_string())
}

fn og_image(doc: &Html) -> Option<String> {
    let content = doc
        .select(&OG_IMAGE)
        .next()
        .and_then(|meta| meta.value().attr("content"))?;
    (content.starts_with("http") && is_valid_og_image(content)).then(|| content.to_string())
}

/// Reject `og:image` values that are site default/share images rather than
/// post content.
fn is_valid_og_image(url: &str) -> bool {
    let lower = url.to_lowercase();
    if OG_DEFAULT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return false;
    }
    // etoland serves resize.php with an empty src= parameter on imageless posts
    if lower.contains("resize.php") && lower.trim_end().ends_with("src=") {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_div(html: &Html) -> ElementRef<'_> {
        let sel = Selector::parse("div").unwrap();
        html.select(&sel).next().unwrap()
    }

    #[test]
    fn test_listing_prefers_lazy_attr_over_placeholder_src() {
        let html = Html::parse_fragment(
            "<div><img src=\"/img/loading_placeholder.gif\" data-src=\"/files/photo.jpg\"></div>",
        );
        let thumb = resolve_from_element(first_div(&html), "https://www.clien.net/");
        assert_eq!(thumb, Some("https://www.clien.net/files/photo.jpg".to_string()));
    }

    #[test]
    fn test_listing_rejects_noise_and_data_urls() {
        let html = Html::parse_fragment(concat!(
            "<div>",
            "<img src=\"data:image/gif;base64,R0lGOD\">",
            "<img src=\"/img/rank/gold.png\">",
            "<img src=\"/member/avatar_12.png\">",
            "<img src=\"/uploads/vector.svg\">",
            "</div>",
        ));
        assert_eq!(resolve_from_element(first_div(&html), "https://example.com/"), None);
    }

    #[test]
    fn test_listing_rejects_small_declared_dimensions() {
        let html = Html::parse_fragment(
            "<div><img src=\"/files/tiny.png\" width=\"16\" height=\"16\"></div>",
        );
        assert_eq!(resolve_from_element(first_div(&html), "https://example.com/"), None);
    }

    #[test]
    fn test_listing_accepts_first_surviving_candidate() {
        let html = Html::parse_fragment(concat!(
            "<div>",
            "<img src=\"/img/new_icon/hot.gif\">",
            "<img src=\"//cdn.example.com/content/a.jpg\">",
            "</div>",
        ));
        let thumb = resolve_from_element(first_div(&html), "https://example.com/");
        assert_eq!(thumb, Some("https://cdn.example.com/content/a.jpg".to_string()));
    }

    #[test]
    fn test_detail_page_video_poster_fallback() {
        let html = Html::parse_document(concat!(
            "<html><body><div class=\"post_article\">",
            "<p>short</p><video poster=\"/files/poster.jpg\"></video>",
            "</div></body></html>",
        ));
        let thumb = resolve_from_page(&html, "clien", "https://www.clien.net/");
        assert_eq!(thumb, Some("https://www.clien.net/files/poster.jpg".to_string()));
    }

    #[test]
    fn test_detail_page_youtube_iframe_rewrite() {
        let html = Html::parse_document(concat!(
            "<html><body><div class=\"xe_content\">",
            "<iframe src=\"https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0\"></iframe>",
            "</div></body></html>",
        ));
        let thumb = resolve_from_page(&html, "theqoo", "https://theqoo.net/");
        assert_eq!(
            thumb,
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string())
        );
    }

    #[test]
    fn test_detail_page_og_image_when_no_container() {
        let html = Html::parse_document(concat!(
            "<html><head>",
            "<meta property=\"og:image\" content=\"https://cdn.example.com/post/42.jpg\">",
            "</head><body><p>nothing recognizable</p></body></html>",
        ));
        let thumb = resolve_from_page(&html, "ruliweb", "https://bbs.ruliweb.com/");
        assert_eq!(thumb, Some("https://cdn.example.com/post/42.jpg".to_string()));
    }

    #[test]
    fn test_detail_page_rejects_default_og_image() {
        let html = Html::parse_document(concat!(
            "<html><head>",
            "<meta property=\"og:image\" content=\"https://example.com/img/og_default.png\">",
            "</head><body></body></html>",
        ));
        assert_eq!(resolve_from_page(&html, "ruliweb", "https://bbs.ruliweb.com/"), None);
    }

    #[test]
    fn test_resolver_never_returns_noise_url() {
        let html = Html::parse_document(concat!(
            "<html><body><div class=\"xe_content\">",
            "<img src=\"/img/loading.gif\">",
            "<img src=\"/styles/btn_reply.png\">",
            "</div></body></html>",
        ));
        assert_eq!(resolve_from_page(&html, "theqoo", "https://theqoo.net/"), None);
    }
}
