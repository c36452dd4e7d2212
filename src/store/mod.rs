pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Article, Feed};

pub use sqlite::SqliteStore;

/// Persistence contract consumed by the reconciliation engine. The store is
/// assumed to provide atomic upsert/delete primitives; no locking happens
/// above this boundary.
pub trait Store {
    // Feed operations
    fn save_feed(&self, feed: &Feed) -> Result<()>;
    fn get_feed(&self, id: &str) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn get_all_feeds(&self) -> Result<Vec<Feed>>;
    fn delete_feed(&self, id: &str) -> Result<()>;
    fn set_feed_active(&self, id: &str, active: bool) -> Result<()>;
    fn set_feed_rank(&self, id: &str, rank: i64) -> Result<()>;
    /// Record a successful reconciliation: refresh timestamp + cached count.
    fn set_feed_refreshed(&self, id: &str, at: DateTime<Utc>, unread: i64) -> Result<()>;
    /// Update the cached unread count alone, leaving the refresh timestamp as
    /// is. Flag mutations are not reconciliations.
    fn set_feed_unread_count(&self, id: &str, unread: i64) -> Result<()>;

    // Article operations
    /// Insert new articles, silently skipping ids that already exist so that
    /// re-fetching never resets read/bookmark/skip state. Returns the number
    /// of rows actually inserted.
    fn add_articles(&self, articles: &[Article]) -> Result<usize>;
    fn get_article(&self, id: &str) -> Result<Option<Article>>;
    fn get_articles(&self, limit: Option<usize>) -> Result<Vec<Article>>;
    fn get_articles_by_feed(&self, feed_id: &str) -> Result<Vec<Article>>;
    /// The unread working set: not read, not skipped, belonging to an active
    /// feed, newest first.
    fn get_unread_articles(&self) -> Result<Vec<Article>>;
    fn get_bookmarked_articles(&self) -> Result<Vec<Article>>;
    fn article_exists(&self, id: &str) -> Result<bool>;

    // Flag mutations (idempotent, single article)
    fn mark_read(&self, article_id: &str) -> Result<()>;
    fn set_bookmark(&self, article_id: &str, bookmarked: bool) -> Result<()>;
    fn mark_skipped(&self, article_id: &str) -> Result<()>;

    fn unread_count(&self, feed_id: &str) -> Result<i64>;
    /// Age-based retention. Bookmarked articles are always exempt.
    fn delete_articles_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
