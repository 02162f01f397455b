//! fmkorea humor board.
//!
//! The site sits behind a TLS-fingerprinting CDN, so listing pages are
//! fetched through [`BrowserSession`] instead of the shared client. Notice
//! rows carry a `notice` class and are skipped.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use crate::dedupe::dedupe_posts;
use crate::fetch::BrowserSession;
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, text_of, to_int_safe};

pub const SITE: &str = "fmkorea";
const BASE: &str = "https://www.fmkorea.com/";
const LISTING: &str = "https://www.fmkorea.com/index.php?mid=humor&category=486622";

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table.bd_lst").unwrap());
static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody tr").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.hx").unwrap());
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static REPLY: Lazy<Selector> = Lazy::new(|| Selector::parse("a.replyNum").unwrap());

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
        let Some(link) = tr.select(&TITLE_LINK).next() else {
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
        let tds: Vec<_> = tr.select(&TD).collect();
        if tds.len() < 5 {
            continue;
        }

        let mut post = Post::new(SITE, title, url);
        post.author = Some(text_of(&tds[2])).filter(|s| !s.is_empty());
        post.timestamp = Some(text_of(&tds[3])).filter(|s| !s.is_empty());
        post.views = to_int_safe(&text_of(&tds[4]));
        post.likes = tds.get(5).and_then(|td| to_int_safe(&text_of(td)));
        post.comments = tr.select(&REPLY).next().and_then(|a| to_int_safe(&text_of(&a)));
        post.thumbnail = thumbs::resolve_from_element(tr, BASE);
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl listing pages 1-2 through the browser session.
#[instrument(skip(session))]
pub async fn collect(session: &BrowserSession) -> Vec<Post> {
    let mut all = Vec::new();
    for page in 1..=2u32 {
        let url = if page == 1 {
            LISTING.to_string()
        } else {
            format!("{LISTING}&page={page}")
        };
        match session.fetch(&url).await {
            Ok(html) => {
                let posts = parse(&url, &html);
                debug!(page, count = posts.len(), "listing page parsed");
                all.extend(posts);
            }
            Err(e) => warn!(page, error = %e, "listing page failed"),
        }
    }
    dedupe_posts(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(class: &str, srl: u64, title: &str) -> String {
        format!(
            concat!(
                "<tr class=\"{class}\"><td></td>",
                "<td class=\"title\"><a class=\"hx\" href=\"/index.php?mid=humor&document_srl={srl}\">{title}</a>",
                "<a class=\"replyNum\" href=\"#\">12</a></td>",
                "<td>닉네임</td><td>10:31</td><td>15234</td><td>88</td></tr>",
            ),
            class = class,
            srl = srl,
            title = title,
        )
    }

    fn listing(rows: &str) -> String {
        format!("<table class=\"bd_lst\"><tbody>{rows}</tbody></table>")
    }

    #[test]
    fn test_parse_listing_row() {
        let html = listing(&row("", 100, "재미있는 게시물 제목"));
        let posts = parse(LISTING, &html);

        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.site, "fmkorea");
        assert_eq!(p.title, "재미있는 게시물 제목");
        assert_eq!(p.url, "https://www.fmkorea.com/index.php?mid=humor&document_srl=100");
        assert_eq!(p.author.as_deref(), Some("닉네임"));
        assert_eq!(p.views, Some(15234));
        assert_eq!(p.likes, Some(88));
        assert_eq!(p.comments, Some(12));
    }

    #[test]
    fn test_notice_rows_are_skipped() {
        let html = listing(&format!(
            "{}{}",
            row("notice", 1, "공지사항 안내"),
            row("", 2, "일반 게시물 제목"),
        ));
        let posts = parse(LISTING, &html);

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "일반 게시물 제목");
    }

    #[test]
    fn test_missing_board_table_parses_empty() {
        assert!(parse(LISTING, "<html><body><p>점검 중</p></body></html>").is_empty());
    }

    #[test]
    fn test_duplicate_posts_across_rows_collapse() {
        let html = listing(&format!(
            "{}{}",
            row("", 7, "같은 글 첫 번째"),
            row("", 7, "같은 글 두 번째"),
        ));
        let posts = parse(LISTING, &html);

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "같은 글 첫 번째");
    }
}
