//! # buzzit crawler
//!
//! Aggregates popular posts from a dozen Korean community sites into a
//! single normalized snapshot, and extracts sanitized post bodies on
//! demand.
//!
//! ## Usage
//!
//! ```sh
//! buzzit_crawler crawl -o buzzit_posts.json
//! buzzit_crawler extract --url "https://theqoo.net/square/1" --site theqoo
//! ```
//!
//! ## Architecture
//!
//! A crawl run fans out to every registered source concurrently, normalizes
//! listing rows into posts, dedupes across pagination, backfills missing
//! thumbnails from detail pages, and writes the snapshot wholesale.

use std::error::Error;
use std::path::Path;

use clap::Parser;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use buzzit_crawler::aggregate::{backfill_thumbnails, collect_all, save_snapshot};
use buzzit_crawler::extract::extract_content;
use buzzit_crawler::fetch::{BrowserSession, build_client};
use buzzit_crawler::models::Snapshot;

mod cli;

use cli::{Cli, Command};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let client = build_client()?;
    let session = BrowserSession::new()?;

    match args.command() {
        Command::Crawl {
            output,
            skip_thumbnails,
        } => {
            info!("crawl starting");
            let mut posts = collect_all(&client, &session).await;
            info!(posts = posts.len(), "all sources merged");

            if skip_thumbnails {
                info!("thumbnail backfill skipped");
            } else {
                backfill_thumbnails(&client, &session, &mut posts).await;
            }

            for (i, post) in posts.iter().enumerate() {
                println!("{:03}. [{}] {}  -> {}", i + 1, post.site, post.title, post.url);
            }

            let snapshot = Snapshot::build(posts);
            save_snapshot(&snapshot, Path::new(&output)).await?;
        }
        Command::Extract { url, site } => {
            match extract_content(&client, &session, &url, site.as_deref()).await {
                Some(content) => {
                    info!(
                        images = content.images.len(),
                        text_bytes = content.text_content.len(),
                        "content extracted"
                    );
                    println!("{}", serde_json::to_string_pretty(&content)?);
                }
                None => {
                    info!(%url, "no content could be extracted");
                }
            }
        }
    }

    info!(elapsed = ?start_time.elapsed(), "done");
    Ok(())
}
