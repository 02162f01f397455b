//! Data models for collected posts and extracted content.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Post`]: a normalized record for one community post, regardless of source
//! - [`ExtractedContent`]: the result of on-demand body extraction
//! - [`Snapshot`] / [`SnapshotMetadata`]: the complete result of one crawl run,
//!   serialized as the `buzzit_posts.json` bootstrap document
//!
//! Field names match the JSON document consumed by the serving layer, so the
//! structs serialize without renames.

use chrono::Local;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A normalized community post collected from one of the registered sites.
///
/// Adapters only construct a `Post` after the candidate has passed the
/// site's title-length and exclusion checks, so every instance carries a
/// non-empty title and an absolute URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Post {
    /// Identifier of the originating site (e.g. `"ruliweb"`, `"clien"`).
    pub site: String,
    /// Post title, trimmed, at least the site's minimum length.
    pub title: String,
    /// Absolute URL of the post.
    pub url: String,
    /// Author nickname, where the listing exposes one.
    pub author: Option<String>,
    /// Source-native timestamp string; not parsed into a structured type.
    pub timestamp: Option<String>,
    /// View count parsed from the listing (or detail page).
    pub views: Option<u64>,
    /// Like/recommend count.
    pub likes: Option<u64>,
    /// Comment count.
    pub comments: Option<u64>,
    /// When this record was collected, RFC 3339.
    pub collected_at: String,
    /// Best-effort thumbnail URL; never a placeholder.
    pub thumbnail: Option<String>,
}

impl Post {
    /// Create a record with the mandatory fields set and all metadata empty.
    pub fn new(site: &str, title: String, url: String) -> Self {
        Self {
            site: site.to_string(),
            title,
            url,
            author: None,
            timestamp: None,
            views: None,
            likes: None,
            comments: None,
            collected_at: Local::now().to_rfc3339(),
            thumbnail: None,
        }
    }
}

/// Sanitized article body produced by on-demand extraction.
///
/// Not persisted; ownership ends when the value is returned to the caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractedContent {
    /// Sanitized display HTML, truncated to [`crate::extract::MAX_CONTENT_SIZE`].
    pub html_content: String,
    /// Plain text of the extracted region, truncated independently.
    pub text_content: String,
    /// Absolute image URLs found in the sanitized HTML, capped in count.
    pub images: Vec<String>,
    /// The URL the content was extracted from.
    pub source_url: String,
}

/// Metadata block of a persisted crawl snapshot.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotMetadata {
    pub total_posts: usize,
    pub collected_at: String,
    pub sites: Vec<String>,
}

/// The complete, immutable result of one aggregation run.
///
/// A new snapshot fully replaces the prior one; it is never mutated after
/// construction (see [`crate::aggregate::SnapshotCell`]).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub posts: Vec<Post>,
}

impl Snapshot {
    /// Build a snapshot from a finished post list, stamping the collection
    /// time and the set of contributing sites.
    pub fn build(posts: Vec<Post>) -> Self {
        let sites: Vec<String> = posts.iter().map(|p| p.site.clone()).unique().collect();
        Self {
            metadata: SnapshotMetadata {
                total_posts: posts.len(),
                collected_at: Local::now().to_rfc3339(),
                sites,
            },
            posts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(site: &str, url: &str) -> Post {
        Post::new(site, "a long enough title".to_string(), url.to_string())
    }

    #[test]
    fn test_post_serialization_field_names() {
        let mut p = post("clien", "https://www.clien.net/service/board/park/1");
        p.views = Some(1234);

        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"site\":\"clien\""));
        assert!(json.contains("\"views\":1234"));
        // absent metadata serializes as null, matching the served document
        assert!(json.contains("\"likes\":null"));
    }

    #[test]
    fn test_snapshot_build_collects_unique_sites() {
        let posts = vec![
            post("clien", "https://example.com/1"),
            post("ruliweb", "https://example.com/2"),
            post("clien", "https://example.com/3"),
        ];
        let snapshot = Snapshot::build(posts);

        assert_eq!(snapshot.metadata.total_posts, 3);
        assert_eq!(snapshot.metadata.sites, vec!["clien", "ruliweb"]);
        assert!(!snapshot.metadata.collected_at.is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snapshot = Snapshot::build(vec![post("ddanzi", "https://www.ddanzi.com/free/1")]);
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.metadata.total_posts, 1);
        assert_eq!(parsed.posts[0].site, "ddanzi");
    }
}
