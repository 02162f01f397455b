//! etoland humor board (hit listing).
//!
//! EUC-KR pages; the listing URL's `sca` parameter is percent-encoded
//! EUC-KR and must not be re-encoded. Ad rows carry an `ad_list` class,
//! and comment anchors on the same row link into `#commentContents`.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::dedupe::dedupe_posts;
use crate::fetch::{self, FetchError};
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, text_of, to_int_safe};

pub const SITE: &str = "etoland";
const BASE: &str = "https://www.etoland.co.kr/";
const LISTING: &str =
    "https://www.etoland.co.kr/bbs/board.php?bo_table=etohumor07&hit=y&sca=%C0%AF%B8%D3";

static BOARD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#fboardlist, .board_list_wrap").unwrap());
static ITEMS: Lazy<Selector> = Lazy::new(|| Selector::parse("li.list").unwrap());
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.subject a.subject_a").unwrap());
static TITLE_LINK_ALT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*=\"etohumor07&wr_id=\"]").unwrap());
static VIEWS: Lazy<Selector> = Lazy::new(|| Selector::parse("div.views").unwrap());
static LIKES: Lazy<Selector> = Lazy::new(|| Selector::parse("div.sympathys").unwrap());
static COMMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.comment_count b, span.comment_count b").unwrap());
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.writer span.member").unwrap());
static DATETIME: Lazy<Selector> = Lazy::new(|| Selector::parse("div.datetime").unwrap());

/// Parse one listing page. Missing board container parses to an empty list.
pub fn parse(_base_url: &str, html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    let Some(board) = doc.select(&BOARD).next() else {
        return posts;
    };
    for li in board.select(&ITEMS) {
        if li.value().classes().any(|c| c == "ad_list") {
            continue;
        }
        let link = li
            .select(&TITLE_LINK)
            .next()
            .or_else(|| li.select(&TITLE_LINK_ALT).next());
        let Some(link) = link else {
            continue;
        };
        let href = link.value().attr("href").unwrap_or("");
        if href.is_empty() || href.contains("#commentContents") {
            continue;
        }
        // listing rows prefix the title with a row number
        let title = text_of(&link)
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .trim()
            .to_string();
        if title.chars().count() < 5 {
            continue;
        }
        let Some(url) = absolutize(href, BASE) else {
            continue;
        };

        let mut post = Post::new(SITE, title, url);
        post.views = li.select(&VIEWS).next().and_then(|d| to_int_safe(&text_of(&d)));
        post.likes = li.select(&LIKES).next().and_then(|d| to_int_safe(&text_of(&d)));
        post.comments = li.select(&COMMENTS).next().and_then(|b| to_int_safe(&text_of(&b)));
        post.author = li
            .select(&AUTHOR)
            .next()
            .map(|s| text_of(&s))
            .filter(|s| !s.is_empty());
        post.timestamp = li
            .select(&DATETIME)
            .next()
            .map(|d| text_of(&d))
            .filter(|s| !s.is_empty());
        post.thumbnail = thumbs::resolve_from_element(li, BASE);
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl the single hit-listing page.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Result<Vec<Post>, FetchError> {
    let html = fetch::fetch_html(client, LISTING).await?;
    Ok(parse(LISTING, &html))
}
