//! Source adapters for the registered community sites.
//!
//! Each submodule owns one site: its listing URL(s), the listing markup it
//! understands, and any site policy (popularity filters, excluded rows).
//! Adapters share a contract:
//!
//! - `parse(base_url, html)` turns one listing page into normalized
//!   [`Post`](crate::models::Post)s. A page whose structural anchor is
//!   missing parses to an empty list, never an error.
//! - `collect(...)` fetches the site's page range and returns the deduped
//!   posts. Multi-page sites tolerate individual page failures.
//!
//! # Registered sources
//!
//! | Site | Pages | Notes |
//! |------|-------|-------|
//! | [`fmkorea`] | 1-2 | browser-profile transport, notice rows skipped |
//! | [`humoruniv`] | 1-2 | EUC-KR, reply-count tail stripped from titles |
//! | [`ruliweb`] | 1 | |
//! | [`etoland`] | 1 | EUC-KR, ad rows skipped |
//! | [`inven`] | 1 | view-count floor, official-account posts skipped |
//! | [`clien`] | 1 | |
//! | [`mlbpark`] | 1 | lossy UTF-8 decode |
//! | [`ddanzi`] | 1-2 | |
//! | [`bobaedream`] | 1-5 | like-count floor |
//! | [`ppomppu`] | 1-2 | post URLs canonicalized to `id`/`no` params |
//! | [`slrclub`] | 1 | comment count parsed from title tail |
//! | [`damoang`] | 1-3 | two-phase: listing, then per-post detail pages |

pub mod bobaedream;
pub mod clien;
pub mod damoang;
pub mod ddanzi;
pub mod etoland;
pub mod fmkorea;
pub mod humoruniv;
pub mod inven;
pub mod mlbpark;
pub mod ppomppu;
pub mod ruliweb;
pub mod slrclub;

use reqwest::Client;
use tracing::warn;

use crate::dedupe::dedupe_posts;
use crate::fetch;
use crate::models::Post;

/// Listing-page parser: `(base_url, html) -> posts`.
pub type ParseFn = fn(&str, &str) -> Vec<Post>;

/// Known body containers per site, best first.
///
/// Includes sites with no listing adapter (dcinside, dogdrip, theqoo,
/// 82cook); extraction accepts any reachable post URL, not just ones a crawl
/// produced.
const CONTENT_SELECTORS: &[(&str, &[&str])] = &[
    ("humoruniv", &["#cnts", "#wrap_img"]),
    ("ruliweb", &["div.view_content", "div.board_main_view"]),
    ("etoland", &["div#view_content", "td.mw_basic_view_content"]),
    ("inven", &["div#powerbbsContent", "div.contentBody"]),
    ("clien", &["div.post_article", "div.post_view"]),
    ("mlbpark", &["div#contentDetail", "div.ar_txt"]),
    ("ddanzi", &["div.xe_content", "div.read_content"]),
    ("bobaedream", &["div.bodyCont", "div.content02"]),
    ("ppomppu", &["td.board-contents"]),
    ("fmkorea", &["div.xe_content", "article"]),
    ("dcinside", &["div.write_div", "div.writing_view_box"]),
    ("damoang", &["div.fr-view", "div.view_content"]),
    ("dogdrip", &["div.xe_content"]),
    ("theqoo", &["div.xe_content"]),
    ("82cook", &["div.view_content", "div.post_content"]),
    ("slrclub", &["div#userct"]),
];

/// Body container selectors for a site, best first. Empty for unknown sites.
pub fn content_selectors(site: &str) -> &'static [&'static str] {
    CONTENT_SELECTORS
        .iter()
        .find(|(name, _)| *name == site)
        .map(|(_, selectors)| *selectors)
        .unwrap_or(&[])
}

/// Every registered body container selector, in table order.
pub fn all_content_selectors() -> impl Iterator<Item = &'static str> {
    CONTENT_SELECTORS
        .iter()
        .flat_map(|(_, selectors)| selectors.iter().copied())
}

/// Fetch and parse a sequence of listing pages, tolerating page failures.
///
/// A failed page is logged and skipped; the result is whatever the
/// remaining pages produced, deduped across the whole range.
pub(crate) async fn collect_pages(
    client: &Client,
    site: &'static str,
    urls: &[String],
    parse: ParseFn,
) -> Vec<Post> {
    let mut all = Vec::new();
    for (page, url) in urls.iter().enumerate() {
        match fetch::fetch_html(client, url).await {
            Ok(html) => {
                let posts = parse(url, &html);
                tracing::debug!(site, page = page + 1, count = posts.len(), "listing page parsed");
                all.extend(posts);
            }
            Err(e) => {
                warn!(site, page = page + 1, %url, error = %e, "listing page failed");
            }
        }
    }
    dedupe_posts(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_selectors_cover_extract_only_sites() {
        assert!(!content_selectors("dcinside").is_empty());
        assert!(!content_selectors("theqoo").is_empty());
        assert!(content_selectors("unknown-site").is_empty());
    }

    #[test]
    fn test_all_content_selectors_flattens_table() {
        let all: Vec<&str> = all_content_selectors().collect();
        assert!(all.contains(&"div.post_article"));
        assert!(all.contains(&"td.board-contents"));
        assert!(all.len() >= CONTENT_SELECTORS.len());
    }
}
