//! ppomppu free board (hot listing).
//!
//! Post links carry listing-state query parameters (`page`, `divpage`,
//! `hotlist_flag`) that 404 when replayed later, so URLs are canonicalized
//! down to the `id` and `no` parameters.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;
use url::Url;

use crate::dedupe::dedupe_posts;
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, ancestor_element, text_of, to_int_safe};

pub const SITE: &str = "ppomppu";
const LISTING: &str = "https://www.ppomppu.co.kr/zboard/zboard.php?id=freeboard&hotlist_flag=999";

static TITLE_LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a.baseList-title").unwrap());
static VIEWS: Lazy<Selector> = Lazy::new(|| Selector::parse("td.baseList-views").unwrap());
static NAME: Lazy<Selector> = Lazy::new(|| Selector::parse("td.baseList-name span").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time.baseList-time").unwrap());

/// Drop every query parameter except `id` and `no`.
fn canonicalize(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let keep: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k == "id" || k == "no")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed.set_query(None);
    if !keep.is_empty() {
        let mut pairs = parsed.query_pairs_mut();
        for (k, v) in &keep {
            pairs.append_pair(k, v);
        }
    }
    parsed.to_string()
}

/// Parse one listing page. Only freeboard posts are taken.
pub fn parse(base_url: &str, html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    for link in doc.select(&TITLE_LINKS) {
        let title = text_of(&link);
        let href = link.value().attr("href").unwrap_or("");
        if href.is_empty() || title.chars().count() < 5 {
            continue;
        }
        if !href.contains("view.php?id=freeboard") {
            continue;
        }
        let Some(url) = absolutize(href, base_url) else {
            continue;
        };
        let url = canonicalize(&url);

        let row = ancestor_element(link, "tr");
        let mut post = Post::new(SITE, title, url);
        post.views = row
            .and_then(|tr| tr.select(&VIEWS).next())
            .and_then(|td| to_int_safe(&text_of(&td)));
        post.author = row
            .and_then(|tr| tr.select(&NAME).next())
            .map(|s| text_of(&s))
            .filter(|s| !s.is_empty());
        post.timestamp = row
            .and_then(|tr| tr.select(&TIME).next())
            .map(|t| text_of(&t))
            .filter(|s| !s.is_empty());
        post.thumbnail = row.and_then(|tr| thumbs::resolve_from_element(tr, base_url));
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl listing pages 1-2.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Vec<Post> {
    let urls: Vec<String> = (1..=2u32)
        .map(|page| {
            if page == 1 {
                LISTING.to_string()
            } else {
                format!("{LISTING}&page={page}")
            }
        })
        .collect();
    super::collect_pages(client, SITE, &urls, parse).await
}
