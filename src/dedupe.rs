//! Cross-page duplicate suppression.
//!
//! Paginated listings shift while a crawl walks them, so the same post can
//! appear on two consecutive pages under slightly different URLs. Each source
//! exposes a numeric post ID somewhere in its URLs; the key table below
//! extracts it so that `?page=2&document_srl=123` and `?document_srl=123`
//! collapse to one record. Sources never overlap in canonical ID space, so
//! dedupe runs once per source after its multi-page collection — no second
//! pass at the aggregation boundary is needed.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Post;

/// Ordered `(site, id pattern)` table for canonical-key extraction.
static KEY_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("humoruniv", Regex::new(r"number=(\d+)").unwrap()),
        ("fmkorea", Regex::new(r"document_srl=(\d+)").unwrap()),
        ("ruliweb", Regex::new(r"read/(\d+)").unwrap()),
        ("etoland", Regex::new(r"wr_id=(\d+)").unwrap()),
        ("inven", Regex::new(r"board/webzine/2097/(\d+)").unwrap()),
        ("bobaedream", Regex::new(r"No=(\d+)").unwrap()),
        ("ppomppu", Regex::new(r"view\.php\?.*\bno=(\d+)").unwrap()),
    ]
});

/// Derive the canonical dedupe key for a post URL.
///
/// Sources with a recognizable numeric post ID key as `{site}_{id}`;
/// everything else falls back to exact URL equality.
pub fn dedupe_key(url: &str) -> String {
    for (site, pattern) in KEY_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(url) {
            return format!("{site}_{}", &captures[1]);
        }
    }
    url.to_string()
}

/// Collapse duplicate posts, keeping the first occurrence of each key.
///
/// Stable: relative order of first occurrences is preserved, so earlier
/// pages win over later ones.
pub fn dedupe_posts(posts: Vec<Post>) -> Vec<Post> {
    posts
        .into_iter()
        .unique_by(|p| dedupe_key(&p.url))
        .collect()
}
