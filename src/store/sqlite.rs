use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, SwipeFeedError};
use crate::domain::{Article, Feed};
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| SwipeFeedError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            SwipeFeedError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            last_updated: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| Self::parse_datetime(&s)),
            unread_count: row.get(5)?,
            is_active: row.get::<_, i64>(6)? != 0,
            rank: row.get(7)?,
            created_at: row
                .get::<_, String>(8)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
        Ok(Article {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            content: row.get(4)?,
            link: row.get(5)?,
            image_url: row.get(6)?,
            pub_date: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
            fetched_at: row
                .get::<_, String>(8)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
            is_read: row.get::<_, i64>(9)? != 0,
            is_bookmarked: row.get::<_, i64>(10)? != 0,
            is_skipped: row.get::<_, i64>(11)? != 0,
        })
    }
}

const FEED_COLUMNS: &str =
    "id, url, title, description, last_updated, unread_count, is_active, rank, created_at";

const ARTICLE_COLUMNS: &str = "id, feed_id, title, description, content, link, image_url, \
     pub_date, fetched_at, is_read, is_bookmarked, is_skipped";

impl Store for SqliteStore {
    fn save_feed(&self, feed: &Feed) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO feeds (id, url, title, description, last_updated, unread_count, is_active, rank, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 is_active = excluded.is_active,
                 rank = excluded.rank",
            params![
                feed.id,
                feed.url,
                feed.title,
                feed.description,
                feed.last_updated.map(|dt| dt.to_rfc3339()),
                feed.unread_count,
                feed.is_active as i64,
                feed.rank,
                feed.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get_feed(&self, id: &str) -> Result<Option<Feed>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM feeds WHERE id = ?1", FEED_COLUMNS),
                params![id],
                Self::feed_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM feeds WHERE url = ?1", FEED_COLUMNS),
                params![url],
                Self::feed_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feeds ORDER BY rank, title, url",
            FEED_COLUMNS
        ))?;
        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feeds)
    }

    fn delete_feed(&self, id: &str) -> Result<()> {
        // Articles go first via ON DELETE CASCADE.
        let conn = self.lock()?;
        conn.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn set_feed_active(&self, id: &str, active: bool) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE feeds SET is_active = ?1 WHERE id = ?2",
            params![active as i64, id],
        )?;
        Ok(())
    }

    fn set_feed_rank(&self, id: &str, rank: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE feeds SET rank = ?1 WHERE id = ?2",
            params![rank, id],
        )?;
        Ok(())
    }

    fn set_feed_refreshed(&self, id: &str, at: DateTime<Utc>, unread: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE feeds SET last_updated = ?1, unread_count = ?2 WHERE id = ?3",
            params![at.to_rfc3339(), unread, id],
        )?;
        Ok(())
    }

    fn set_feed_unread_count(&self, id: &str, unread: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE feeds SET unread_count = ?1 WHERE id = ?2",
            params![unread, id],
        )?;
        Ok(())
    }

    fn add_articles(&self, articles: &[Article]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut count = 0;

        for article in articles {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO articles
                 (id, feed_id, title, description, content, link, image_url, pub_date, fetched_at, is_read, is_bookmarked, is_skipped)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    article.id,
                    article.feed_id,
                    article.title,
                    article.description,
                    article.content,
                    article.link,
                    article.image_url,
                    article.pub_date.to_rfc3339(),
                    article.fetched_at.to_rfc3339(),
                    article.is_read as i64,
                    article.is_bookmarked as i64,
                    article.is_skipped as i64
                ],
            )?;
            count += inserted;
        }

        tx.commit()?;
        Ok(count)
    }

    fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS),
                params![id],
                Self::article_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn get_articles(&self, limit: Option<usize>) -> Result<Vec<Article>> {
        let conn = self.lock()?;
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM articles ORDER BY pub_date DESC, fetched_at DESC LIMIT ?1",
            ARTICLE_COLUMNS
        ))?;
        let articles = stmt
            .query_map(params![limit], Self::article_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    fn get_articles_by_feed(&self, feed_id: &str) -> Result<Vec<Article>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM articles WHERE feed_id = ?1 ORDER BY pub_date DESC, fetched_at DESC",
            ARTICLE_COLUMNS
        ))?;
        let articles = stmt
            .query_map(params![feed_id], Self::article_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    fn get_unread_articles(&self) -> Result<Vec<Article>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM articles a
             WHERE a.is_read = 0 AND a.is_skipped = 0
               AND a.feed_id IN (SELECT id FROM feeds WHERE is_active = 1)
             ORDER BY a.pub_date DESC, a.fetched_at DESC",
            article_columns_qualified()
        ))?;
        let articles = stmt
            .query_map([], Self::article_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    fn get_bookmarked_articles(&self) -> Result<Vec<Article>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM articles WHERE is_bookmarked = 1 ORDER BY pub_date DESC, fetched_at DESC",
            ARTICLE_COLUMNS
        ))?;
        let articles = stmt
            .query_map([], Self::article_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    fn article_exists(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn mark_read(&self, article_id: &str) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE articles SET is_read = 1 WHERE id = ?1",
            params![article_id],
        )?;
        if updated == 0 {
            return Err(SwipeFeedError::ArticleNotFound(article_id.to_string()));
        }
        Ok(())
    }

    fn set_bookmark(&self, article_id: &str, bookmarked: bool) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE articles SET is_bookmarked = ?1 WHERE id = ?2",
            params![bookmarked as i64, article_id],
        )?;
        if updated == 0 {
            return Err(SwipeFeedError::ArticleNotFound(article_id.to_string()));
        }
        Ok(())
    }

    fn mark_skipped(&self, article_id: &str) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE articles SET is_skipped = 1 WHERE id = ?1",
            params![article_id],
        )?;
        if updated == 0 {
            return Err(SwipeFeedError::ArticleNotFound(article_id.to_string()));
        }
        Ok(())
    }

    fn unread_count(&self, feed_id: &str) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE feed_id = ?1 AND is_read = 0 AND is_skipped = 0",
            params![feed_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_articles_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM articles WHERE pub_date < ?1 AND is_bookmarked = 0",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(deleted)
    }
}

fn article_columns_qualified() -> String {
    ARTICLE_COLUMNS
        .split(',')
        .map(|c| format!("a.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
