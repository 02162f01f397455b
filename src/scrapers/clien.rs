//! clien park board, sorted by popularity.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::dedupe::dedupe_posts;
use crate::fetch::{self, FetchError};
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, text_of, to_int_safe};

pub const SITE: &str = "clien";
const BASE: &str = "https://www.clien.net/";
const LISTING: &str = "https://www.clien.net/service/board/park?&od=T31&category=0";

static ITEMS: Lazy<Selector> = Lazy::new(|| Selector::parse(".list_item.symph_row").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.list_subject").unwrap());
static HIT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.list_hit span.hit").unwrap());
static SYMPH: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".list_symph.view_symph span").unwrap());
static REPLY: Lazy<Selector> = Lazy::new(|| Selector::parse(".rSymph05").unwrap());
static NICKNAME: Lazy<Selector> = Lazy::new(|| Selector::parse(".nickname span").unwrap());

/// Parse one listing page.
pub fn parse(_base_url: &str, html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    for item in doc.select(&ITEMS) {
        let Some(link) = item.select(&TITLE_LINK).next() else {
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
        post.views = item.select(&HIT).next().and_then(|s| to_int_safe(&text_of(&s)));
        post.likes = item.select(&SYMPH).next().and_then(|s| to_int_safe(&text_of(&s)));
        post.comments = item.select(&REPLY).next().and_then(|s| to_int_safe(&text_of(&s)));
        post.author = item
            .select(&NICKNAME)
            .next()
            .map(|s| text_of(&s))
            .filter(|s| !s.is_empty());
        post.thumbnail = thumbs::resolve_from_element(item, BASE);
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl the single park listing page.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Result<Vec<Post>, FetchError> {
    let html = fetch::fetch_html(client, LISTING).await?;
    Ok(parse(LISTING, &html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_item() {
        let html = concat!(
            "<div class=\"list_item symph_row\">",
            "<a class=\"list_subject\" href=\"/service/board/park/19000000\">공원 게시판 인기글</a>",
            "<div class=\"list_hit\"><span class=\"hit\">25.3 k</span></div>",
            "<div class=\"list_symph view_symph\"><span>31</span></div>",
            "<span class=\"rSymph05\">14</span>",
            "<div class=\"nickname\"><span>클리앙러</span></div>",
            "</div>",
        );
        let posts = parse(LISTING, html);

        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.url, "https://www.clien.net/service/board/park/19000000");
        assert_eq!(p.likes, Some(31));
        assert_eq!(p.comments, Some(14));
        assert_eq!(p.author.as_deref(), Some("클리앙러"));
    }

    #[test]
    fn test_rows_without_subject_link_are_skipped() {
        let html = "<div class=\"list_item symph_row\"><span>링크 없는 행</span></div>";
        assert!(parse(LISTING, html).is_empty());
    }
}
