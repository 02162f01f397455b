//! bobaedream strange-news board.
//!
//! Article rows are marked with a schema.org itemtype, which also excludes
//! the pinned best-of rows. A like-count floor filters the board down to
//! posts the community actually reacted to.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::dedupe::dedupe_posts;
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, text_of, to_int_safe};

pub const SITE: &str = "bobaedream";
const BASE: &str = "https://www.bobaedream.co.kr/";
const LISTING: &str = "https://www.bobaedream.co.kr/list?code=strange";

static ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr[itemtype=\"http://schema.org/Article\"]").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.bsubject").unwrap());
static RECOMM: Lazy<Selector> = Lazy::new(|| Selector::parse("td.recomm").unwrap());
static COMMENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.Comment strong.totreply").unwrap());
static COUNT: Lazy<Selector> = Lazy::new(|| Selector::parse("td.count").unwrap());
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.author").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("td.date").unwrap());

/// Popularity rules for the board.
#[derive(Debug, Clone)]
pub struct BobaedreamPolicy {
    /// When the row exposes a like count, posts below this floor are dropped.
    pub min_likes: u64,
}

impl Default for BobaedreamPolicy {
    fn default() -> Self {
        Self { min_likes: 3 }
    }
}

/// Parse one listing page with the default policy.
pub fn parse(base_url: &str, html: &str) -> Vec<Post> {
    parse_with(base_url, html, &BobaedreamPolicy::default())
}

pub fn parse_with(_base_url: &str, html: &str, policy: &BobaedreamPolicy) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    for tr in doc.select(&ROWS) {
        let Some(link) = tr.select(&TITLE_LINK).next() else {
            continue;
        };
        let title = text_of(&link);
        let href = link.value().attr("href").unwrap_or("");
        if href.is_empty() || title.chars().count() < 5 {
            continue;
        }
        let Some(url) = absolutize(href, BASE) else {
            continue;
        };

        let mut likes = None;
        if let Some(cell) = tr.select(&RECOMM).next() {
            likes = to_int_safe(&text_of(&cell));
            match likes {
                Some(l) if l >= policy.min_likes => {}
                _ => continue,
            }
        }

        let mut post = Post::new(SITE, title, url);
        post.likes = likes;
        post.comments = tr.select(&COMMENT).next().and_then(|s| to_int_safe(&text_of(&s)));
        post.views = tr.select(&COUNT).next().and_then(|td| to_int_safe(&text_of(&td)));
        post.author = tr
            .select(&AUTHOR)
            .next()
            .map(|s| text_of(&s))
            .filter(|s| !s.is_empty());
        post.timestamp = tr
            .select(&DATE)
            .next()
            .map(|td| text_of(&td))
            .filter(|s| !s.is_empty());
        post.thumbnail = thumbs::resolve_from_element(tr, BASE);
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl listing pages 1-5.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Vec<Post> {
    let urls: Vec<String> = (1..=5u32)
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
