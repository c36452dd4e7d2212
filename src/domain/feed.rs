use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: String,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub unread_count: i64,
    pub is_active: bool,
    /// Display rank maintained by the UI collaborator, persisted alongside.
    pub rank: i64,
    pub created_at: DateTime<Utc>,
}

impl Feed {
    /// Create a feed for an already-normalized URL. The id is derived from the
    /// URL alone, so re-adding the same URL always resolves to the same feed.
    pub fn new(url: String, title: String) -> Self {
        let id = Self::generate_id(&url);
        Self {
            id,
            url,
            title,
            description: None,
            last_updated: None,
            unread_count: 0,
            is_active: true,
            rank: 0,
            created_at: Utc::now(),
        }
    }

    /// Deterministic feed ID from the normalized URL.
    pub fn generate_id(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("feed_{}", &digest[..16])
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_id_deterministic() {
        let id1 = Feed::generate_id("https://example.com/feed.xml");
        let id2 = Feed::generate_id("https://example.com/feed.xml");
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_feed_id_distinct_urls() {
        let id1 = Feed::generate_id("https://example.com/feed.xml");
        let id2 = Feed::generate_id("https://other.com/feed.xml");
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_feed_defaults() {
        let feed = Feed::new("https://example.com/feed.xml".into(), "Example".into());
        assert!(feed.is_active);
        assert_eq!(feed.unread_count, 0);
        assert!(feed.last_updated.is_none());
        assert!(feed.id.starts_with("feed_"));
    }

    #[test]
    fn test_display_title_falls_back_to_url() {
        let feed = Feed::new("https://example.com/feed.xml".into(), String::new());
        assert_eq!(feed.display_title(), "https://example.com/feed.xml");
    }
}
