pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "swipefeed")]
#[command(about = "RSS/Atom feed reader core: subscribe, refresh, triage", long_about = None)]
pub struct Cli {
    /// Database file path (default: platform data directory)
    #[arg(long, global = true)]
    pub db: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to a feed (validates the URL by fetching it)
    Add {
        /// Feed URL; a missing scheme defaults to https://
        url: String,
    },
    /// Unsubscribe from a feed and delete its articles
    Remove {
        url: String,
    },
    /// Pause or resume a feed's participation in bulk refresh
    Toggle {
        url: String,
    },
    /// Refresh all active feeds
    Refresh,
    /// List feeds, or articles with --articles
    List {
        #[arg(long)]
        articles: bool,
    },
    /// Show the unread queue (not read, not skipped, newest first)
    Unread,
    /// Show bookmarked articles
    Bookmarks,
    /// Mark an article as read
    Read {
        article_id: String,
    },
    /// Bookmark an article (or remove the bookmark)
    Bookmark {
        article_id: String,
        #[arg(long)]
        remove: bool,
    },
    /// Skip an article without marking it read
    Skip {
        article_id: String,
    },
    /// Delete old articles, keeping bookmarked ones
    Cleanup {
        /// Days of articles to keep (default from config)
        #[arg(short, long)]
        days: Option<i64>,
    },
    /// Refresh periodically until interrupted
    Watch {
        /// Minutes between refreshes (default from config)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}
