//! Crawl orchestration, thumbnail backfill, and snapshot persistence.
//!
//! One crawl run fans out to every registered source concurrently, merges
//! whatever succeeded (a failed source never sinks the run), optionally
//! backfills missing thumbnails from detail pages, and produces an immutable
//! [`Snapshot`] that replaces the previous one wholesale.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::Client;
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::fetch::BrowserSession;
use crate::models::{Post, Snapshot};
use crate::scrapers;
use crate::thumbs;

/// Per-site cap applied when merging crawl results.
pub const MAX_POSTS_PER_SITE: usize = 30;

/// Concurrent detail-page fetches per site during thumbnail backfill.
const THUMBNAIL_CONCURRENCY: usize = 4;

/// Outcome of one source's crawl: the site name with its posts, or a
/// description of why the source produced nothing.
pub type SiteResult = Result<(&'static str, Vec<Post>), String>;

/// Crawl every registered source concurrently and merge the results.
///
/// Sources that fail are logged and contribute nothing; each successful
/// source is capped at [`MAX_POSTS_PER_SITE`] posts.
#[instrument(skip_all)]
pub async fn collect_all(client: &Client, session: &BrowserSession) -> Vec<Post> {
    let mut handles = Vec::new();

    {
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            Ok::<_, String>((scrapers::fmkorea::SITE, scrapers::fmkorea::collect(&session).await))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            Ok::<_, String>((scrapers::humoruniv::SITE, scrapers::humoruniv::collect(&client).await))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            scrapers::ruliweb::collect(&client)
                .await
                .map(|posts| (scrapers::ruliweb::SITE, posts))
                .map_err(|e| format!("ruliweb: {e}"))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            scrapers::etoland::collect(&client)
                .await
                .map(|posts| (scrapers::etoland::SITE, posts))
                .map_err(|e| format!("etoland: {e}"))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            scrapers::inven::collect(&client)
                .await
                .map(|posts| (scrapers::inven::SITE, posts))
                .map_err(|e| format!("inven: {e}"))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            scrapers::clien::collect(&client)
                .await
                .map(|posts| (scrapers::clien::SITE, posts))
                .map_err(|e| format!("clien: {e}"))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            scrapers::mlbpark::collect(&client)
                .await
                .map(|posts| (scrapers::mlbpark::SITE, posts))
                .map_err(|e| format!("mlbpark: {e}"))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            Ok::<_, String>((scrapers::ddanzi::SITE, scrapers::ddanzi::collect(&client).await))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            Ok::<_, String>((
                scrapers::bobaedream::SITE,
                scrapers::bobaedream::collect(&client).await,
            ))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            Ok::<_, String>((scrapers::ppomppu::SITE, scrapers::ppomppu::collect(&client).await))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            scrapers::slrclub::collect(&client)
                .await
                .map(|posts| (scrapers::slrclub::SITE, posts))
                .map_err(|e| format!("slrclub: {e}"))
        }));
    }
    {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            Ok::<_, String>((scrapers::damoang::SITE, scrapers::damoang::collect(&client).await))
        }));
    }

    let results: Vec<SiteResult> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap_or_else(|e| Err(format!("task panicked: {e}"))))
        .collect();
    merge_site_results(results)
}

/// Merge per-site outcomes, capping each site and dropping failures.
pub fn merge_site_results(results: Vec<SiteResult>) -> Vec<Post> {
    let mut merged = Vec::new();
    for result in results {
        match result {
            Ok((site, posts)) => {
                let total = posts.len();
                let capped = total.min(MAX_POSTS_PER_SITE);
                info!(site, parsed = total, collected = capped, "source merged");
                merged.extend(posts.into_iter().take(MAX_POSTS_PER_SITE));
            }
            Err(e) => warn!(error = %e, "source failed"),
        }
    }
    merged
}

/// Fill in thumbnails for posts whose listing row had none, by visiting
/// their detail pages. Fetches run per site with bounded concurrency so no
/// single host sees a request burst.
#[instrument(skip_all, fields(posts = posts.len()))]
pub async fn backfill_thumbnails(client: &Client, session: &BrowserSession, posts: &mut [Post]) {
    let missing: Vec<(usize, String, String)> = posts
        .iter()
        .enumerate()
        .filter(|(_, p)| p.thumbnail.is_none())
        .map(|(i, p)| (i, p.site.clone(), p.url.clone()))
        .collect();
    if missing.is_empty() {
        return;
    }
    info!(count = missing.len(), "backfilling thumbnails from detail pages");

    let by_site = missing
        .into_iter()
        .into_group_map_by(|(_, site, _)| site.clone());

    let mut tasks = Vec::new();
    for (_, entries) in by_site {
        let client = client.clone();
        let session = session.clone();
        tasks.push(async move {
            stream::iter(entries)
                .map(|(index, site, url)| {
                    let client = client.clone();
                    let session = session.clone();
                    async move {
                        let thumb =
                            thumbs::fetch_detail_thumbnail(&client, &session, &url, &site).await;
                        (index, thumb)
                    }
                })
                .buffer_unordered(THUMBNAIL_CONCURRENCY)
                .collect::<Vec<_>>()
                .await
        });
    }

    let mut found = 0usize;
    for (index, thumb) in join_all(tasks).await.into_iter().flatten() {
        if let Some(thumb) = thumb {
            posts[index].thumbnail = Some(thumb);
            found += 1;
        }
    }
    info!(found, "thumbnail backfill finished");
}

/// Shared handle to the most recent snapshot.
///
/// Readers get an `Arc` to a fully built snapshot; a finished crawl swaps
/// the whole snapshot in one store. Snapshots are never mutated in place.
pub struct SnapshotCell {
    inner: RwLock<Arc<Snapshot>>,
}

impl SnapshotCell {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(initial)),
        }
    }

    /// The current snapshot.
    pub fn load(&self) -> Arc<Snapshot> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current snapshot.
    pub fn store(&self, snapshot: Snapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persist a snapshot as pretty-printed JSON.
pub async fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), SnapshotError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json).await?;
    info!(path = %path.display(), posts = snapshot.metadata.total_posts, "snapshot saved");
    Ok(())
}

/// Load a previously saved snapshot.
pub async fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let data = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&data)?)
}
