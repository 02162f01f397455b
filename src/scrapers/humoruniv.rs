//! humoruniv daily-best board.
//!
//! EUC-KR pages (decode hints live in the fetch layer). Titles carry a
//! `[N]` reply-count tail plus trailing decoration, stripped here. Post
//! links are relative to the board directory, not the listing URL.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::dedupe::dedupe_posts;
use crate::models::Post;
use crate::thumbs;
use crate::utils::{absolutize, text_of, to_int_safe};

pub const SITE: &str = "humoruniv";
const BASE: &str = "https://web.humoruniv.com/board/humor/";
const LISTING: &str = "https://web.humoruniv.com/board/humor/list.html?table=pds&st=day";

static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.li_sbj a[href*=\"read.html\"]").unwrap());
static UND_CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("td.li_und").unwrap());

static TITLE_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\].*$").unwrap());

/// Parse one listing page.
///
/// The count cells (`td.li_und`) hold views, likes and comments in that
/// order; rows with fewer cells keep the missing counts absent.
pub fn parse(_base_url: &str, html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut posts = Vec::new();
    for tr in doc.select(&ROWS) {
        let Some(link) = tr.select(&TITLE_LINK).next() else {
            continue;
        };
        let href = link.value().attr("href").unwrap_or("");
        let raw_title = text_of(&link);
        if href.is_empty() || raw_title.chars().count() < 3 {
            continue;
        }
        let title = TITLE_TAIL.replace(&raw_title, "").trim().to_string();
        if title.chars().count() < 3 {
            continue;
        }
        let Some(url) = absolutize(href, BASE) else {
            continue;
        };

        let cells: Vec<_> = tr.select(&UND_CELLS).collect();
        let mut post = Post::new(SITE, title, url);
        post.views = cells.first().and_then(|td| to_int_safe(&text_of(td)));
        post.likes = cells.get(1).and_then(|td| to_int_safe(&text_of(td)));
        post.comments = cells.get(2).and_then(|td| to_int_safe(&text_of(td)));
        post.thumbnail = thumbs::resolve_from_element(tr, "https://web.humoruniv.com/");
        posts.push(post);
    }
    dedupe_posts(posts)
}

/// Crawl listing pages 1-2.
#[instrument(skip(client))]
pub async fn collect(client: &Client) -> Vec<Post> {
    let urls: Vec<String> = (1..=2u32)
        .map(|page| {
            if page == 1 {
                LISTING.to_string()
            } else {
                format!("{LISTING}&pg={page}")
            }
        })
        .collect();
    super::collect_pages(client, SITE, &urls, parse).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(number: u64, title: &str, counts: &[u64]) -> String {
        let cells: String = counts
            .iter()
            .map(|c| format!("<td class=\"li_und\">{c}</td>"))
            .collect();
        format!(
            concat!(
                "<tr><td class=\"li_num\">1</td>",
                "<td class=\"li_sbj\"><a href=\"read.html?table=pds&number={number}\">{title}</a></td>",
                "{cells}</tr>",
            ),
            number = number,
            title = title,
            cells = cells,
        )
    }

    #[test]
    fn test_parse_row_with_counts() {
        let html = format!("<table>{}</table>", row(55, "오늘의 유머 모음", &[1234, 56, 7]));
        let posts = parse(LISTING, &html);

        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.title, "오늘의 유머 모음");
        assert_eq!(
            p.url,
            "https://web.humoruniv.com/board/humor/read.html?table=pds&number=55"
        );
        assert_eq!(p.views, Some(1234));
        assert_eq!(p.likes, Some(56));
        assert_eq!(p.comments, Some(7));
    }

    #[test]
    fn test_reply_count_tail_is_stripped_from_title() {
        let html = format!(
            "<table>{}</table>",
            row(1, "제목입니다 [37]답글추천 +12", &[100]),
        );
        let posts = parse(LISTING, &html);

        assert_eq!(posts[0].title, "제목입니다");
    }

    #[test]
    fn test_title_too_short_after_strip_is_dropped() {
        let html = format!("<table>{}</table>", row(2, "ㅋㅋ [5]", &[]));
        assert!(parse(LISTING, &html).is_empty());
    }

    #[test]
    fn test_missing_count_cells_stay_absent() {
        let html = format!("<table>{}</table>", row(3, "카운트 없는 게시물", &[]));
        let posts = parse(LISTING, &html);

        assert_eq!(posts[0].views, None);
        assert_eq!(posts[0].likes, None);
        assert_eq!(posts[0].comments, None);
    }
}
