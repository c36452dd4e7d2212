use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::app::{Result, SwipeFeedError};
use crate::domain::{Article, Feed};
use crate::fetcher::{normalize_url, Transport};
use crate::normalizer::{clean_text, Normalizer};
use crate::parser::{FeedParser, RawFeed};
use crate::store::Store;

/// How many feeds are refreshed concurrently during a bulk refresh. Batches
/// are awaited to completion before the next batch starts, keeping upstream
/// servers and relays from being hammered.
pub const DEFAULT_BATCH_WIDTH: usize = 3;

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Result of a bulk refresh. Per-feed failures are collected, labeled with
/// the feed's title; they never abort sibling feeds.
#[derive(Debug, Default)]
pub struct RefreshOutcome {
    pub feeds_refreshed: usize,
    pub new_articles: usize,
    pub errors: Vec<String>,
}

/// Merges freshly fetched articles into persisted state without duplicating
/// existing ones or losing their flags. Transport and store are injected so
/// tests can substitute both.
pub struct ReconcileEngine<S: Store> {
    transport: Arc<dyn Transport + Send + Sync>,
    store: Arc<S>,
    parser: FeedParser,
    normalizer: Normalizer,
    batch_width: usize,
}

impl<S: Store> ReconcileEngine<S> {
    pub fn new(transport: Arc<dyn Transport + Send + Sync>, store: Arc<S>) -> Self {
        Self::with_batch_width(transport, store, DEFAULT_BATCH_WIDTH)
    }

    pub fn with_batch_width(
        transport: Arc<dyn Transport + Send + Sync>,
        store: Arc<S>,
        batch_width: usize,
    ) -> Self {
        Self {
            transport,
            store,
            parser: FeedParser::new(),
            normalizer: Normalizer::new(),
            batch_width: batch_width.max(1),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch and parse a candidate URL. A feed that parses but yields zero
    /// usable items is not a valid feed.
    pub async fn validate_feed(&self, raw_url: &str) -> Result<(String, RawFeed)> {
        let url = normalize_url(raw_url)?;
        let body = self.transport.fetch_document(&url).await?;
        let raw = self.parser.parse(&body)?;

        if raw.items.is_empty() {
            return Err(SwipeFeedError::Validation(format!(
                "{} contains no usable items",
                url
            )));
        }

        Ok((url, raw))
    }

    /// Subscribe to a feed. Re-adding an already-subscribed URL returns the
    /// existing feed unchanged; feed ids are a pure function of the
    /// normalized URL.
    pub async fn add_feed(&self, raw_url: &str) -> Result<Feed> {
        let (url, raw) = self.validate_feed(raw_url).await?;

        if let Some(existing) = self.store.get_feed_by_url(&url)? {
            tracing::debug!("Feed already subscribed: {}", url);
            return Ok(existing);
        }

        let title = raw
            .title
            .as_deref()
            .map(clean_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled Feed".to_string());

        let mut feed = Feed::new(url, title);
        feed.description = raw.description.as_deref().map(clean_text);
        self.store.save_feed(&feed)?;

        let articles = self.normalizer.normalize_batch(&feed.id, &raw.items);
        let added = self.store.add_articles(&articles)?;
        self.sync_feed_after_merge(&feed.id)?;
        tracing::info!("Added feed {} with {} articles", feed.url, added);

        self.store
            .get_feed(&feed.id)?
            .ok_or_else(|| SwipeFeedError::FeedNotFound(feed.id.clone()))
    }

    pub fn remove_feed(&self, raw_url: &str) -> Result<Feed> {
        let url = normalize_url(raw_url)?;
        let feed = self
            .store
            .get_feed_by_url(&url)?
            .ok_or_else(|| SwipeFeedError::FeedNotFound(url))?;
        self.store.delete_feed(&feed.id)?;
        Ok(feed)
    }

    pub fn set_feed_active(&self, raw_url: &str, active: bool) -> Result<Feed> {
        let url = normalize_url(raw_url)?;
        let feed = self
            .store
            .get_feed_by_url(&url)?
            .ok_or_else(|| SwipeFeedError::FeedNotFound(url))?;
        self.store.set_feed_active(&feed.id, active)?;
        self.store
            .get_feed(&feed.id)?
            .ok_or_else(|| SwipeFeedError::FeedNotFound(feed.id.clone()))
    }

    /// Reconcile one feed: fetch, parse, normalize, merge. Known article ids
    /// are skipped by the store, so existing flags are never overwritten.
    /// Returns the number of newly inserted articles.
    pub async fn refresh_feed(&self, feed: &Feed) -> Result<usize> {
        let body = self.transport.fetch_document(&feed.url).await?;
        let raw = self.parser.parse(&body)?;
        let articles = self.normalizer.normalize_batch(&feed.id, &raw.items);

        let added = self.store.add_articles(&articles)?;
        self.sync_feed_after_merge(&feed.id)?;

        tracing::debug!("Refreshed {}: {} new articles", feed.url, added);
        Ok(added)
    }

    /// Refresh every active feed in bounded-width batches. A failure in one
    /// feed is recorded and the remaining feeds keep going.
    pub async fn refresh_all(&self) -> Result<RefreshOutcome> {
        let feeds: Vec<Feed> = self
            .store
            .get_all_feeds()?
            .into_iter()
            .filter(|f| f.is_active)
            .collect();

        let mut outcome = RefreshOutcome::default();

        for batch in feeds.chunks(self.batch_width) {
            let results = futures::future::join_all(
                batch.iter().map(|feed| self.refresh_feed(feed)),
            )
            .await;

            for (feed, result) in batch.iter().zip(results) {
                match result {
                    Ok(added) => {
                        outcome.feeds_refreshed += 1;
                        outcome.new_articles += added;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to refresh {}: {}", feed.display_title(), e);
                        outcome
                            .errors
                            .push(format!("{}: {}", feed.display_title(), e));
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Mark an article read. Read articles leave the unread set; bookmarks
    /// are untouched.
    pub fn mark_read(&self, article_id: &str) -> Result<()> {
        self.store.mark_read(article_id)?;
        self.sync_owner_unread(article_id)
    }

    /// Toggle an article's bookmark. Orthogonal to read/skip state.
    pub fn set_bookmark(&self, article_id: &str, bookmarked: bool) -> Result<()> {
        self.store.set_bookmark(article_id, bookmarked)
    }

    /// Skip an article: it leaves the unread set without being marked read.
    pub fn mark_skipped(&self, article_id: &str) -> Result<()> {
        self.store.mark_skipped(article_id)?;
        self.sync_owner_unread(article_id)
    }

    /// Delete articles whose publish date is older than `days_to_keep` days,
    /// except bookmarked ones, then refresh the cached per-feed counts.
    pub fn cleanup_old_articles(&self, days_to_keep: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(days_to_keep);
        let deleted = self.store.delete_articles_older_than(cutoff)?;

        if deleted > 0 {
            for feed in self.store.get_all_feeds()? {
                let unread = self.store.unread_count(&feed.id)?;
                self.store.set_feed_unread_count(&feed.id, unread)?;
            }
            tracing::info!("Cleanup removed {} articles", deleted);
        }

        Ok(deleted)
    }

    pub fn unread_articles(&self) -> Result<Vec<Article>> {
        self.store.get_unread_articles()
    }

    pub fn bookmarked_articles(&self) -> Result<Vec<Article>> {
        self.store.get_bookmarked_articles()
    }

    fn sync_feed_after_merge(&self, feed_id: &str) -> Result<()> {
        let unread = self.store.unread_count(feed_id)?;
        self.store.set_feed_refreshed(feed_id, Utc::now(), unread)
    }

    fn sync_owner_unread(&self, article_id: &str) -> Result<()> {
        let article = self
            .store
            .get_article(article_id)?
            .ok_or_else(|| SwipeFeedError::ArticleNotFound(article_id.to_string()))?;
        let unread = self.store.unread_count(&article.feed_id)?;
        self.store.set_feed_unread_count(&article.feed_id, unread)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::store::SqliteStore;

    /// Canned transport: maps normalized URLs to documents or failures.
    struct FakeTransport {
        documents: HashMap<String, String>,
    }

    impl FakeTransport {
        fn new() -> Self {
            Self {
                documents: HashMap::new(),
            }
        }

        fn with_document(mut self, url: &str, body: &str) -> Self {
            self.documents.insert(url.to_string(), body.to_string());
            self
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn fetch_document(&self, url: &str) -> Result<String> {
            self.documents
                .get(url)
                .cloned()
                .ok_or_else(|| SwipeFeedError::Fetch(format!("unreachable: {}", url)))
        }
    }

    fn rss_doc(title: &str, items: &[(&str, &str)]) -> String {
        // Use the current time so fixture items always count as "fresh"
        // relative to retention cutoffs computed from Utc::now().
        let pub_date = Utc::now().to_rfc2822();
        let items_xml: String = items
            .iter()
            .map(|(item_title, link)| {
                format!(
                    "<item><title>{}</title><link>{}</link><guid>{}</guid>\
                     <pubDate>{}</pubDate></item>",
                    item_title, link, link, pub_date
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>{}</title>{}</channel></rss>"#,
            title, items_xml
        )
    }

    fn engine_with(transport: FakeTransport) -> ReconcileEngine<SqliteStore> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        ReconcileEngine::new(Arc::new(transport), store)
    }

    #[tokio::test]
    async fn test_add_feed_stores_feed_and_articles() {
        let transport = FakeTransport::new().with_document(
            "https://example.com/feed.xml",
            &rss_doc(
                "Example",
                &[
                    ("First", "https://example.com/1"),
                    ("Second", "https://example.com/2"),
                ],
            ),
        );
        let engine = engine_with(transport);

        let feed = engine.add_feed("example.com/feed.xml").await.unwrap();
        assert_eq!(feed.title, "Example");
        assert_eq!(feed.unread_count, 2);
        assert!(feed.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_add_feed_is_idempotent() {
        let transport = FakeTransport::new().with_document(
            "https://example.com/feed.xml",
            &rss_doc("Example", &[("First", "https://example.com/1")]),
        );
        let engine = engine_with(transport);

        let first = engine.add_feed("example.com/feed.xml").await.unwrap();
        let second = engine.add_feed("https://example.com/feed.xml").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(engine.store().get_all_feeds().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_feed_with_no_items_is_invalid() {
        let transport = FakeTransport::new().with_document(
            "https://example.com/feed.xml",
            &rss_doc("Empty", &[]),
        );
        let engine = engine_with(transport);

        let err = engine.add_feed("example.com/feed.xml").await.unwrap_err();
        assert!(matches!(err, SwipeFeedError::Validation(_)));
        assert!(engine.store().get_all_feeds().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_feed_fetch_failure_propagates() {
        let engine = engine_with(FakeTransport::new());
        let err = engine.add_feed("example.com/feed.xml").await.unwrap_err();
        assert!(matches!(err, SwipeFeedError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_refresh_twice_does_not_duplicate() {
        let transport = FakeTransport::new().with_document(
            "https://example.com/feed.xml",
            &rss_doc(
                "Example",
                &[
                    ("First", "https://example.com/1"),
                    ("Second", "https://example.com/2"),
                ],
            ),
        );
        let engine = engine_with(transport);
        let feed = engine.add_feed("example.com/feed.xml").await.unwrap();

        let added = engine.refresh_feed(&feed).await.unwrap();
        assert_eq!(added, 0);
        assert_eq!(
            engine.store().get_articles_by_feed(&feed.id).unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_refresh_preserves_read_state() {
        let transport = FakeTransport::new().with_document(
            "https://example.com/feed.xml",
            &rss_doc("Example", &[("First", "https://example.com/1")]),
        );
        let engine = engine_with(transport);
        let feed = engine.add_feed("example.com/feed.xml").await.unwrap();

        let articles = engine.store().get_articles_by_feed(&feed.id).unwrap();
        engine.mark_read(&articles[0].id).unwrap();

        engine.refresh_feed(&feed).await.unwrap();

        let after = engine.store().get_article(&articles[0].id).unwrap().unwrap();
        assert!(after.is_read);

        let feed_after = engine.store().get_feed(&feed.id).unwrap().unwrap();
        assert_eq!(feed_after.unread_count, 0);
    }

    #[tokio::test]
    async fn test_refresh_all_isolates_per_feed_failures() {
        let transport = FakeTransport::new()
            .with_document(
                "https://one.example/feed.xml",
                &rss_doc("One", &[("A", "https://one.example/a")]),
            )
            .with_document(
                "https://three.example/feed.xml",
                &rss_doc("Three", &[("C", "https://three.example/c")]),
            );
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = ReconcileEngine::new(Arc::new(transport), store.clone());

        store
            .save_feed(&Feed::new("https://one.example/feed.xml".into(), "One".into()))
            .unwrap();
        store
            .save_feed(&Feed::new("https://two.example/feed.xml".into(), "Two".into()))
            .unwrap();
        store
            .save_feed(&Feed::new(
                "https://three.example/feed.xml".into(),
                "Three".into(),
            ))
            .unwrap();

        let outcome = engine.refresh_all().await.unwrap();
        assert_eq!(outcome.feeds_refreshed, 2);
        assert_eq!(outcome.new_articles, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("Two:"));
    }

    #[tokio::test]
    async fn test_refresh_all_skips_inactive_feeds() {
        let transport = FakeTransport::new().with_document(
            "https://one.example/feed.xml",
            &rss_doc("One", &[("A", "https://one.example/a")]),
        );
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = ReconcileEngine::new(Arc::new(transport), store.clone());

        store
            .save_feed(&Feed::new("https://one.example/feed.xml".into(), "One".into()))
            .unwrap();
        let mut paused = Feed::new("https://two.example/feed.xml".into(), "Two".into());
        paused.is_active = false;
        store.save_feed(&paused).unwrap();

        let outcome = engine.refresh_all().await.unwrap();
        assert_eq!(outcome.feeds_refreshed, 1);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_skip_removes_from_unread_and_updates_count() {
        let transport = FakeTransport::new().with_document(
            "https://example.com/feed.xml",
            &rss_doc(
                "Example",
                &[
                    ("First", "https://example.com/1"),
                    ("Second", "https://example.com/2"),
                ],
            ),
        );
        let engine = engine_with(transport);
        let feed = engine.add_feed("example.com/feed.xml").await.unwrap();

        let unread = engine.unread_articles().unwrap();
        engine.mark_skipped(&unread[0].id).unwrap();

        assert_eq!(engine.unread_articles().unwrap().len(), 1);
        let feed_after = engine.store().get_feed(&feed.id).unwrap().unwrap();
        assert_eq!(feed_after.unread_count, 1);
    }

    #[tokio::test]
    async fn test_bookmark_does_not_touch_unread_set() {
        let transport = FakeTransport::new().with_document(
            "https://example.com/feed.xml",
            &rss_doc("Example", &[("First", "https://example.com/1")]),
        );
        let engine = engine_with(transport);
        engine.add_feed("example.com/feed.xml").await.unwrap();

        let unread = engine.unread_articles().unwrap();
        engine.set_bookmark(&unread[0].id, true).unwrap();

        assert_eq!(engine.unread_articles().unwrap().len(), 1);
        assert_eq!(engine.bookmarked_articles().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_flag_mutation_keeps_refresh_timestamp() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = ReconcileEngine::new(Arc::new(FakeTransport::new()), store.clone());

        // Never refreshed: last_updated starts out unset.
        let f = Feed::new("https://example.com/feed.xml".into(), "Example".into());
        store.save_feed(&f).unwrap();
        let a = Article::new(&f.id, Some("e1"), "https://example.com/1");
        store.add_articles(std::slice::from_ref(&a)).unwrap();

        engine.mark_read(&a.id).unwrap();

        let after = store.get_feed(&f.id).unwrap().unwrap();
        assert_eq!(after.unread_count, 0);
        assert!(after.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_respects_bookmark_exemption() {
        let transport = FakeTransport::new().with_document(
            "https://example.com/feed.xml",
            &rss_doc("Example", &[("Fresh", "https://example.com/fresh")]),
        );
        let engine = engine_with(transport);
        let feed = engine.add_feed("example.com/feed.xml").await.unwrap();

        let mut old_bookmarked = Article::new(&feed.id, Some("old-b"), "https://example.com/ob");
        old_bookmarked.pub_date = Utc::now() - Duration::days(60);
        let mut old_plain = Article::new(&feed.id, Some("old-p"), "https://example.com/op");
        old_plain.pub_date = Utc::now() - Duration::days(60);
        engine
            .store()
            .add_articles(&[old_bookmarked.clone(), old_plain.clone()])
            .unwrap();
        engine.set_bookmark(&old_bookmarked.id, true).unwrap();

        let deleted = engine.cleanup_old_articles(30).unwrap();
        assert_eq!(deleted, 1);
        assert!(engine.store().article_exists(&old_bookmarked.id).unwrap());
        assert!(!engine.store().article_exists(&old_plain.id).unwrap());
    }

    #[tokio::test]
    async fn test_remove_feed_deletes_articles() {
        let transport = FakeTransport::new().with_document(
            "https://example.com/feed.xml",
            &rss_doc("Example", &[("First", "https://example.com/1")]),
        );
        let engine = engine_with(transport);
        let feed = engine.add_feed("example.com/feed.xml").await.unwrap();

        engine.remove_feed("example.com/feed.xml").unwrap();
        assert!(engine.store().get_feed(&feed.id).unwrap().is_none());
        assert!(engine.store().get_articles(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_feed_fails() {
        let engine = engine_with(FakeTransport::new());
        let err = engine.remove_feed("example.com/feed.xml").unwrap_err();
        assert!(matches!(err, SwipeFeedError::FeedNotFound(_)));
    }
}
