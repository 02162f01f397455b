//! slrclub free board.
//!
//! The comment count is not a separate cell; it trails the title text as
//! `[N]` inside the subject cell.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::dedupe::dedupe_posts;
use crate::fetch::{self, FetchError};
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, text_of, to_int_safe};

pub const SITE: &str = "slrclub";
const BASE: &str = "https://www.slrclub.com/";
const LISTING: &str = "https://www.slrclub.com/bbs/zboard.php?id=free";

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static NOTICE: Lazy<Selector> = Lazy::new(|| Selector::parse("td.list_notice").unwrap());
static NUM: Lazy<Selector> = Lazy::new(|| Selector::parse("td.list_num").unwrap());
static SBJ: Lazy<Selector> = Lazy::new(|| Selector::parse("td.sbj").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href*=\"id=free\"]").unwrap());
static NAME: Lazy<Selector> = Lazy::new(|| Selector::parse("td.list_name").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("td.list_date").unwrap());
static VOTE: Lazy<Selector> = Lazy::new(|| Selector::parse("td.list_vote").unwrap());
static CLICK: Lazy<Selector> = Lazy::new(|| Selector::parse("td.list_click").unwrap());

static COMMENT_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]\s*$").unwrap());

/// Parse one listing page.
pub fn parse(_base_url: &str, html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    let Some(table) = doc.select(&TABLE).next() else {
        return posts;
    };
    for tr in table.select(&ROWS) {
        if tr.select(&NOTICE).next().is_some() {
            continue;
        }
        if tr.select(&NUM).next().is_none() {
            continue;
        }
        let Some(sbj) = tr.select(&SBJ).next() else {
            continue;
        };
        let Some(link) = sbj.select(&TITLE_LINK).next() else {
            continue;
        };
        let title = text_of(&link);
        let href = link.value().attr("href").unwrap_or("");
        if href.is_empty() || title.chars().count() < 3 {
            continue;
        }
        let Some(url) = absolutize(href, BASE) else {
            continue;
        };

        let mut post = Post::new(SITE, title, url);
        post.comments = COMMENT_TAIL
            .captures(&text_of(&sbj))
            .and_then(|c| c[1].parse().ok());
        post.author = tr
            .select(&NAME)
            .next()
            .map(|td| text_of(&td))
            .filter(|s| !s.is_empty());
        post.timestamp = tr
            .select(&DATE)
            .next()
            .map(|td| text_of(&td))
            .filter(|s| !s.is_empty());
        post.likes = tr.select(&VOTE).next().and_then(|td| to_int_safe(&text_of(&td)));
        post.views = tr.select(&CLICK).next().and_then(|td| to_int_safe(&text_of(&td)));
        post.thumbnail = thumbs::resolve_from_element(tr, BASE);
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl the single free-board listing page.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Result<Vec<Post>, FetchError> {
    let html = fetch::fetch_html(client, LISTING).await?;
    Ok(parse(LISTING, &html))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(num_cell: &str, no: u64, subject: &str) -> String {
        format!(
            concat!(
                "<tr>{num_cell}",
                "<td class=\"sbj\"><a href=\"/bbs/zboard.php?id=free&no={no}\">{subject}</a> [15]</td>",
                "<td class=\"list_name\">슬러러</td>",
                "<td class=\"list_date\">02/11</td>",
                "<td class=\"list_vote\">3</td>",
                "<td class=\"list_click\">642</td></tr>",
            ),
            num_cell = num_cell,
            no = no,
            subject = subject,
        )
    }

    fn listing(rows: &str) -> String {
        format!("<table><tbody>{rows}</tbody></table>")
    }

    #[test]
    fn test_comment_count_parsed_from_title_tail() {
        let html = listing(&row("<td class=\"list_num\">8</td>", 8, "자유게시판 글"));
        let posts = parse(LISTING, &html);

        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.title, "자유게시판 글");
        assert_eq!(p.comments, Some(15));
        assert_eq!(p.likes, Some(3));
        assert_eq!(p.views, Some(642));
        assert_eq!(p.author.as_deref(), Some("슬러러"));
    }

    #[test]
    fn test_notice_rows_are_skipped() {
        let html = listing(&row("<td class=\"list_notice\">공지</td>", 1, "공지사항 안내"));
        assert!(parse(LISTING, &html).is_empty());
    }

    #[test]
    fn test_rows_without_number_cell_are_skipped() {
        let html = listing(&row("<td class=\"other\">x</td>", 2, "번호 없는 행의 글"));
        assert!(parse(LISTING, &html).is_empty());
    }
}
