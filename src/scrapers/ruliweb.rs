//! ruliweb best-humor board.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::dedupe::dedupe_posts;
use crate::fetch::{self, FetchError};
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, text_of, to_int_safe};

pub const SITE: &str = "ruliweb";
const BASE: &str = "https://bbs.ruliweb.com/";
const LISTING: &str = "https://bbs.ruliweb.com/best/humor";

static ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.board_list_table tr.table_body").unwrap());
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.subject a.subject_link").unwrap());
static HIT: Lazy<Selector> = Lazy::new(|| Selector::parse("td.hit").unwrap());
static RECOMD: Lazy<Selector> = Lazy::new(|| Selector::parse("td.recomd").unwrap());
static REPLY: Lazy<Selector> = Lazy::new(|| Selector::parse("span.num_reply").unwrap());
static WRITER: Lazy<Selector> = Lazy::new(|| Selector::parse("td.writer").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("td.time").unwrap());

/// Parse one listing page. Rows with a `notice` class are skipped.
pub fn parse(_base_url: &str, html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    for tr in doc.select(&ROWS) {
        if tr.value().classes().any(|c| c == "notice") {
            continue;
        }
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

        let mut post = Post::new(SITE, title, url);
        post.views = tr.select(&HIT).next().and_then(|td| to_int_safe(&text_of(&td)));
        post.likes = tr.select(&RECOMD).next().and_then(|td| to_int_safe(&text_of(&td)));
        post.comments = tr.select(&REPLY).next().and_then(|s| to_int_safe(&text_of(&s)));
        post.author = tr
            .select(&WRITER)
            .next()
            .map(|td| text_of(&td))
            .filter(|s| !s.is_empty());
        post.timestamp = tr
            .select(&TIME)
            .next()
            .map(|td| text_of(&td))
            .filter(|s| !s.is_empty());
        post.thumbnail = thumbs::resolve_from_element(tr, BASE);
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl the single best-humor listing page.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Result<Vec<Post>, FetchError> {
    let html = fetch::fetch_html(client, LISTING).await?;
    Ok(parse(LISTING, &html))
}
