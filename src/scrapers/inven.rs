//! inven open-issue webzine board.
//!
//! The board mixes curated and user posts, so a popularity policy applies:
//! posts below the view-count floor, posts in the `[기타]` category and
//! posts by the site's official account are dropped. A `[유머]` category
//! tag is stripped from surviving titles.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::dedupe::dedupe_posts;
use crate::fetch::{self, FetchError};
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, ancestor_element, text_of, to_int_safe};

pub const SITE: &str = "inven";
const BASE: &str = "https://www.inven.co.kr/";
const LISTING: &str = "https://www.inven.co.kr/board/webzine/2097?category=유머";

static TITLE_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.subject-link[href*=\"board/webzine/2097\"]").unwrap());
static CATEGORY: Lazy<Selector> = Lazy::new(|| Selector::parse("span.category").unwrap());
static VIEW: Lazy<Selector> = Lazy::new(|| Selector::parse("td.view").unwrap());
static RECO: Lazy<Selector> = Lazy::new(|| Selector::parse("td.reco").unwrap());
static COMMENT: Lazy<Selector> = Lazy::new(|| Selector::parse(".con-comment").unwrap());
static AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.user span.layerNickName").unwrap());

/// Popularity and exclusion rules for the board.
#[derive(Debug, Clone)]
pub struct InvenPolicy {
    /// Posts with fewer (or unknown) views are dropped.
    pub min_views: u64,
    /// Posts authored by this account are dropped.
    pub official_author: &'static str,
}

impl Default for InvenPolicy {
    fn default() -> Self {
        Self {
            min_views: 3000,
            official_author: "인벤운영팀",
        }
    }
}

/// Parse one listing page with the default policy.
pub fn parse(base_url: &str, html: &str) -> Vec<Post> {
    parse_with(base_url, html, &InvenPolicy::default())
}

pub fn parse_with(_base_url: &str, html: &str, policy: &InvenPolicy) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    for link in doc.select(&TITLE_LINKS) {
        let raw_title = text_of(&link);
        let href = link.value().attr("href").unwrap_or("");
        if href.is_empty() || raw_title.chars().count() < 5 {
            continue;
        }
        if link
            .select(&CATEGORY)
            .next()
            .is_some_and(|span| text_of(&span).contains("[기타]"))
        {
            continue;
        }
        let title = raw_title
            .strip_prefix("[유머]")
            .map(|rest| rest.trim_start())
            .unwrap_or(&raw_title)
            .to_string();
        let Some(url) = absolutize(href, BASE) else {
            continue;
        };

        let row = ancestor_element(link, "tr");
        let views = row
            .and_then(|tr| tr.select(&VIEW).next())
            .and_then(|td| to_int_safe(&text_of(&td)));
        let author = row
            .and_then(|tr| tr.select(&AUTHOR).next())
            .map(|s| text_of(&s))
            .filter(|s| !s.is_empty());

        if author
            .as_deref()
            .is_some_and(|a| a.contains(policy.official_author))
        {
            continue;
        }
        match views {
            Some(v) if v >= policy.min_views => {}
            _ => continue,
        }

        let mut post = Post::new(SITE, title, url);
        post.views = views;
        post.author = author;
        post.likes = row
            .and_then(|tr| tr.select(&RECO).next())
            .and_then(|td| to_int_safe(&text_of(&td)));
        post.comments = row
            .and_then(|tr| tr.select(&COMMENT).next())
            .and_then(|s| to_int_safe(&text_of(&s)));
        post.thumbnail = row.and_then(|tr| thumbs::resolve_from_element(tr, BASE));
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl the single listing page.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Result<Vec<Post>, FetchError> {
    let html = fetch::fetch_html(client, LISTING).await?;
    Ok(parse(LISTING, &html))
}
