//! damoang free board.
//!
//! Listing rows expose only a comment count, so collection runs in two
//! phases: parse pages 1-3 with a comment-count floor, then fetch each
//! surviving post's detail page serially (with a delay between requests)
//! to read views and likes, keeping only posts above the view floor.

use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::node::Node;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use crate::fetch;
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, ancestor, text_of, to_int_safe};

pub const SITE: &str = "damoang";
const BASE: &str = "https://damoang.net/";

/// Pause between detail-page requests.
const DETAIL_DELAY: Duration = Duration::from_millis(500);

static TITLE_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.da-link-block.da-article-link").unwrap());
static RCMD_BOX: Lazy<Selector> = Lazy::new(|| Selector::parse("div.rcmd-box").unwrap());
static NOTICE_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[alt=\"공지\"]").unwrap());
static COMMENT_COUNT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.count-plus.orangered").unwrap());

static EYE_ICON: Lazy<Selector> = Lazy::new(|| Selector::parse("i.bi-eye").unwrap());
static STAT_DIVS: Lazy<Selector> = Lazy::new(|| Selector::parse("div.pe-2.text-center").unwrap());
static RCMD_BTN: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.pe-2.text-center[onclick*=\"showRcmdList\"]").unwrap());

/// Popularity rules for the board.
#[derive(Debug, Clone)]
pub struct DamoangPolicy {
    /// Listing rows below this comment count are dropped before phase two.
    pub min_comments: u64,
    /// Detail pages below this view count drop the post.
    pub min_views: u64,
}

impl Default for DamoangPolicy {
    fn default() -> Self {
        Self {
            min_comments: 5,
            min_views: 1000,
        }
    }
}

/// Parse one listing page with the default policy.
///
/// Promoted rows (a `rcmd-box` marked 홍보) and notice rows are skipped;
/// rows with no comment count are treated as unpopular.
pub fn parse(base_url: &str, html: &str) -> Vec<Post> {
    parse_with(base_url, html, &DamoangPolicy::default())
}

pub fn parse_with(_base_url: &str, html: &str, policy: &DamoangPolicy) -> Vec<Post> {
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
        let Some(row) = ancestor(link, |el| el.value().classes().any(|c| c == "d-inline-flex"))
        else {
            continue;
        };
        if row
            .select(&RCMD_BOX)
            .next()
            .is_some_and(|b| text_of(&b).contains("홍보"))
        {
            continue;
        }
        if row.select(&NOTICE_IMG).next().is_some() {
            continue;
        }
        let comments = row
            .select(&COMMENT_COUNT)
            .next()
            .and_then(|s| to_int_safe(&text_of(&s)));
        let Some(comments) = comments else {
            continue;
        };
        if comments < policy.min_comments {
            continue;
        }

        let mut post = Post::new(SITE, title, url);
        post.comments = Some(comments);
        post.thumbnail = thumbs::resolve_from_element(row, BASE);
        posts.push(post);
    }
    crate::dedupe::dedupe_posts(posts)
}

/// Views and likes from a post's detail page. Views come from the text node
/// following the eye icon, with a stat-block scan as fallback.
fn detail_stats(html: &str) -> (Option<u64>, Option<u64>) {
    let doc = Html::parse_document(html);
    let mut views = doc
        .select(&EYE_ICON)
        .next()
        .and_then(|icon| icon.next_sibling())
        .and_then(|node| match node.value() {
            Node::Text(text) => to_int_safe(&text.text),
            _ => None,
        });
    if views.is_none() {
        views = doc
            .select(&STAT_DIVS)
            .find(|div| div.inner_html().contains("bi-eye"))
            .and_then(|div| to_int_safe(&text_of(&div).replace("조회", "")));
    }
    let likes = doc
        .select(&RCMD_BTN)
        .next()
        .and_then(|btn| to_int_safe(&text_of(&btn)));
    (views, likes)
}

/// Crawl listing pages 1-3, then enrich survivors from their detail pages.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Vec<Post> {
    let policy = DamoangPolicy::default();
    let urls: Vec<String> = (1..=3u32)
        .map(|page| format!("https://damoang.net/free?page={page}"))
        .collect();
    let listed = super::collect_pages(client, SITE, &urls, parse).await;

    let mut detailed = Vec::new();
    for mut post in listed {
        match fetch::fetch_html(client, &post.url).await {
            Ok(html) => {
                let (views, likes) = detail_stats(&html);
                if let Some(views) = views.filter(|v| *v >= policy.min_views) {
                    post.views = Some(views);
                    post.likes = likes;
                    debug!(title = %post.title, views, ?likes, "detail page read");
                    detailed.push(post);
                }
            }
            Err(e) => warn!(url = %post.url, error = %e, "detail page failed"),
        }
        tokio::time::sleep(DETAIL_DELAY).await;
    }
    detailed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64, title: &str, extra: &str, comments: &str) -> String {
        format!(
            concat!(
                "<div class=\"d-inline-flex\">{extra}",
                "<a class=\"da-link-block da-article-link\" href=\"/free/{id}\">{title}</a>",
                "{comments}</div>",
            ),
            extra = extra,
            id = id,
            title = title,
            comments = comments,
        )
    }

    fn comment_span(n: u64) -> String {
        format!("<span class=\"count-plus orangered\">{n}</span>")
    }

    #[test]
    fn test_parse_keeps_rows_above_comment_floor() {
        let html = format!(
            "{}{}",
            row(1, "댓글 많은 게시물", "", &comment_span(12)),
            row(2, "댓글 적은 게시물", "", &comment_span(2)),
        );
        let posts = parse(BASE, &html);

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "댓글 많은 게시물");
        assert_eq!(posts[0].comments, Some(12));
        assert_eq!(posts[0].url, "https://damoang.net/free/1");
    }

    #[test]
    fn test_rows_without_comment_count_are_dropped() {
        let html = row(3, "댓글 표시 없는 게시물", "", "");
        assert!(parse(BASE, &html).is_empty());
    }

    #[test]
    fn test_promoted_and_notice_rows_are_dropped() {
        let html = format!(
            "{}{}",
            row(
                4,
                "홍보성 게시물입니다",
                "<div class=\"rcmd-box\">홍보</div>",
                &comment_span(30),
            ),
            row(
                5,
                "공지 게시물입니다",
                "<img alt=\"공지\" src=\"/img/notice.png\">",
                &comment_span(30),
            ),
        );
        assert!(parse(BASE, &html).is_empty());
    }

    #[test]
    fn test_detail_stats_reads_eye_sibling_and_rcmd_button() {
        let html = concat!(
            "<html><body>",
            "<div class=\"pe-2 text-center\"><i class=\"bi-eye\"></i> 2,345</div>",
            "<div class=\"pe-2 text-center\" onclick=\"showRcmdList(1)\">67</div>",
            "</body></html>",
        );
        let (views, likes) = detail_stats(html);

        assert_eq!(views, Some(2345));
        assert_eq!(likes, Some(67));
    }

    #[test]
    fn test_detail_stats_absent_markup_is_none() {
        let (views, likes) = detail_stats("<html><body><p>본문</p></body></html>");
        assert_eq!(views, None);
        assert_eq!(likes, None);
    }
}
