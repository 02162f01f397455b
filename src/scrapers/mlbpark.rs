//! mlbpark bullpen board.
//!
//! Pages declare UTF-8 but occasionally contain broken byte sequences; the
//! fetch layer decodes this host lossily rather than falling through to
//! EUC-KR.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::dedupe::dedupe_posts;
use crate::fetch::{self, FetchError};
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, ancestor_element, text_of, to_int_safe};

pub const SITE: &str = "mlbpark";
const BASE: &str = "https://mlbpark.donga.com/";
const LISTING: &str = "https://mlbpark.donga.com/mp/b.php?p=1&b=bullpen&select=&query=&subselect=&subquery=&user=&site=&reply=&source=&pos=";

static TITLE_LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("div.tit a.txt").unwrap());
static VIEW: Lazy<Selector> = Lazy::new(|| Selector::parse("span.viewV").unwrap());
static NICK: Lazy<Selector> = Lazy::new(|| Selector::parse("span.nick").unwrap());
static REPLY: Lazy<Selector> = Lazy::new(|| Selector::parse("span.replycnt").unwrap());

/// Parse one listing page. Metadata lives on the row containing the link.
pub fn parse(_base_url: &str, html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    for link in doc.select(&TITLE_LINKS) {
        let title = text_of(&link);
        let href = link.value().attr("href").unwrap_or("");
        if href.is_empty() || title.chars().count() < 5 {
            continue;
        }
        let Some(url) = absolutize(href, BASE) else {
            continue;
        };

        let row = ancestor_element(link, "tr");
        let mut post = Post::new(SITE, title, url);
        post.views = row
            .and_then(|tr| tr.select(&VIEW).next())
            .and_then(|s| to_int_safe(&text_of(&s)));
        post.author = row
            .and_then(|tr| tr.select(&NICK).next())
            .map(|s| text_of(&s))
            .filter(|s| !s.is_empty());
        post.comments = row
            .and_then(|tr| tr.select(&REPLY).next())
            .and_then(|s| to_int_safe(&text_of(&s)));
        post.thumbnail = row.and_then(|tr| thumbs::resolve_from_element(tr, BASE));
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl the single bullpen listing page.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Result<Vec<Post>, FetchError> {
    let html = fetch::fetch_html(client, LISTING).await?;
    Ok(parse(LISTING, &html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_row() {
        let html = concat!(
            "<table><tbody><tr>",
            "<td><div class=\"tit\">",
            "<a class=\"txt\" href=\"/mp/b.php?b=bullpen&id=12345\">불펜 인기 게시물</a>",
            "<span class=\"replycnt\">[7]</span></div></td>",
            "<td><span class=\"nick\">야구팬</span></td>",
            "<td><span class=\"viewV\">8,765</span></td>",
            "</tr></tbody></table>",
        );
        let posts = parse(LISTING, html);

        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.url, "https://mlbpark.donga.com/mp/b.php?b=bullpen&id=12345");
        assert_eq!(p.views, Some(8765));
        assert_eq!(p.comments, Some(7));
        assert_eq!(p.author.as_deref(), Some("야구팬"));
    }

    #[test]
    fn test_link_outside_table_row_keeps_meta_absent() {
        let html = "<div class=\"tit\"><a class=\"txt\" href=\"/mp/b.php?id=9\">행 밖의 게시물 링크</a></div>";
        let posts = parse(LISTING, html);

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].views, None);
        assert_eq!(posts[0].author, None);
    }
}
