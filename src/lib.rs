//! Multi-source community post aggregation.
//!
//! The crate crawls a fixed set of Korean community boards, normalizes their
//! listings into [`models::Post`] records, and can extract a sanitized HTML
//! body for any collected post on demand.
//!
//! Pipeline stages, in crate layout order:
//!
//! - [`fetch`]: retrying HTTP transport, charset fallback decoding, and the
//!   browser-profile session for the bot-shielded source
//! - [`scrapers`]: one adapter per site, turning listing markup into posts
//! - [`dedupe`]: canonical-key duplicate suppression across pagination
//! - [`thumbs`]: content-image thumbnail heuristics
//! - [`aggregate`]: concurrent fan-out, merge, backfill, snapshot persistence
//! - [`extract`] / [`sanitize`]: on-demand body extraction behind an
//!   allow-list sanitizer

pub mod aggregate;
pub mod dedupe;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod sanitize;
pub mod scrapers;
pub mod thumbs;
pub mod utils;

pub use aggregate::{SnapshotCell, backfill_thumbnails, collect_all, load_snapshot, save_snapshot};
pub use extract::extract_content;
pub use fetch::{BrowserSession, build_client};
pub use models::{ExtractedContent, Post, Snapshot};
