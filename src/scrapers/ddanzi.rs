//! ddanzi free board.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::dedupe::dedupe_posts;
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, text_of, to_int_safe};

pub const SITE: &str = "ddanzi";
const BASE: &str = "https://www.ddanzi.com/";

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table.fz_change").unwrap());
static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static TITLE_TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td.title").unwrap());
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*=\"/free/\"], a[href*=\"mid=free\"]").unwrap());
static VOTE: Lazy<Selector> = Lazy::new(|| Selector::parse("td.voteNum").unwrap());
static HIT: Lazy<Selector> = Lazy::new(|| Selector::parse("td.readNum, td.hit").unwrap());
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td.author").unwrap());

/// Parse one listing page. Missing board table parses to an empty list.
pub fn parse(_base_url: &str, html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    let Some(table) = doc.select(&TABLE).next() else {
        return posts;
    };
    for tr in table.select(&ROWS) {
        if tr.value().classes().any(|c| c == "notice") {
            continue;
        }
        if tr.select(&TD).count() < 5 {
            continue;
        }
        let Some(title_td) = tr.select(&TITLE_TD).next() else {
            continue;
        };
        let Some(link) = title_td.select(&TITLE_LINK).next() else {
            continue;
        };
        let title = text_of(&link);
        let href = link.value().attr("href").unwrap_or("");
        if title.chars().count() < 5 {
            continue;
        }
        let Some(url) = absolutize(href, BASE) else {
            continue;
        };

        let mut post = Post::new(SITE, title, url);
        post.likes = tr.select(&VOTE).next().and_then(|td| to_int_safe(&text_of(&td)));
        post.views = tr.select(&HIT).next().and_then(|td| to_int_safe(&text_of(&td)));
        post.author = tr
            .select(&AUTHOR)
            .next()
            .map(|td| text_of(&td))
            .filter(|s| !s.is_empty());
        post.thumbnail = thumbs::resolve_from_element(tr, BASE);
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl listing pages 1-2.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Vec<Post> {
    let urls = vec![
        "https://www.ddanzi.com/free".to_string(),
        "https://www.ddanzi.com/index.php?mid=free&page=2".to_string(),
    ];
    super::collect_pages(client, SITE, &urls, parse).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(class: &str, id: u64, title: &str) -> String {
        format!(
            concat!(
                "<tr class=\"{class}\"><td class=\"no\">{id}</td>",
                "<td class=\"title\"><a href=\"/free/{id}\">{title}</a></td>",
                "<td class=\"author\">딴지러</td>",
                "<td class=\"voteNum\">21</td>",
                "<td class=\"readNum\">5,432</td></tr>",
            ),
            class = class,
            id = id,
            title = title,
        )
    }

    fn listing(rows: &str) -> String {
        format!("<table class=\"fz_change\"><tbody>{rows}</tbody></table>")
    }

    #[test]
    fn test_parse_listing_row() {
        let html = listing(&row("", 77, "자유게시판 인기글"));
        let posts = parse("https://www.ddanzi.com/free", &html);

        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.url, "https://www.ddanzi.com/free/77");
        assert_eq!(p.likes, Some(21));
        assert_eq!(p.views, Some(5432));
        assert_eq!(p.author.as_deref(), Some("딴지러"));
    }

    #[test]
    fn test_notice_rows_are_skipped() {
        let html = listing(&row("notice", 1, "공지사항 안내글"));
        assert!(parse("https://www.ddanzi.com/free", &html).is_empty());
    }
}
