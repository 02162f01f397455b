//! Command-line interface definitions.
//!
//! Two modes: a full crawl run that writes a snapshot file, and a one-off
//! body extraction for a single post URL.

use clap::{Parser, Subcommand};

/// Command-line arguments for the crawler binary.
///
/// # Examples
///
/// ```sh
/// # Crawl every registered site and write the snapshot
/// buzzit_crawler crawl -o buzzit_posts.json
///
/// # Skip the thumbnail backfill pass (faster, fewer requests)
/// buzzit_crawler crawl --skip-thumbnails
///
/// # Extract one post body
/// buzzit_crawler extract --url "https://www.clien.net/service/board/park/1" --site clien
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Defaults to `crawl` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The selected command, with a bare invocation meaning a default crawl.
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Crawl {
            output: "buzzit_posts.json".to_string(),
            skip_thumbnails: false,
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl all registered sites and write a snapshot file
    Crawl {
        /// Path of the snapshot JSON file
        #[arg(short, long, default_value = "buzzit_posts.json")]
        output: String,

        /// Skip the detail-page thumbnail backfill pass
        #[arg(long)]
        skip_thumbnails: bool,
    },
    /// Extract the sanitized body of a single post
    Extract {
        /// Post URL
        #[arg(long)]
        url: String,

        /// Site identifier, enables the site's body selectors
        #[arg(long)]
        site: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_defaults_to_crawl() {
        let cli = Cli::parse_from(["buzzit_crawler"]);
        match cli.command() {
            Command::Crawl {
                output,
                skip_thumbnails,
            } => {
                assert_eq!(output, "buzzit_posts.json");
                assert!(!skip_thumbnails);
            }
            _ => panic!("expected crawl command"),
        }
    }

    #[test]
    fn test_crawl_defaults() {
        let cli = Cli::parse_from(["buzzit_crawler", "crawl"]);
        match cli.command() {
            Command::Crawl {
                output,
                skip_thumbnails,
            } => {
                assert_eq!(output, "buzzit_posts.json");
                assert!(!skip_thumbnails);
            }
            _ => panic!("expected crawl command"),
        }
    }

    #[test]
    fn test_crawl_flags() {
        let cli = Cli::parse_from([
            "buzzit_crawler",
            "crawl",
            "-o",
            "/tmp/out.json",
            "--skip-thumbnails",
        ]);
        match cli.command() {
            Command::Crawl {
                output,
                skip_thumbnails,
            } => {
                assert_eq!(output, "/tmp/out.json");
                assert!(skip_thumbnails);
            }
            _ => panic!("expected crawl command"),
        }
    }

    #[test]
    fn test_extract_args() {
        let cli = Cli::parse_from([
            "buzzit_crawler",
            "extract",
            "--url",
            "https://theqoo.net/1",
            "--site",
            "theqoo",
        ]);
        match cli.command() {
            Command::Extract { url, site } => {
                assert_eq!(url, "https://theqoo.net/1");
                assert_eq!(site.as_deref(), Some("theqoo"));
            }
            _ => panic!("expected extract command"),
        }
    }
}
