use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub feed_id: String,
    /// Plain text, tags stripped and entities decoded.
    pub title: String,
    /// Plain text summary, same cleaning as `title`.
    pub description: String,
    /// May retain markup; sanitization is the display layer's concern.
    pub content: Option<String>,
    pub link: String,
    pub image_url: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub is_read: bool,
    pub is_bookmarked: bool,
    pub is_skipped: bool,
}

impl Article {
    pub fn new(feed_id: &str, guid: Option<&str>, link: &str) -> Self {
        let id = Self::generate_id(guid, link);
        let now = Utc::now();
        Self {
            id,
            feed_id: feed_id.to_string(),
            title: String::new(),
            description: String::new(),
            content: None,
            link: link.to_string(),
            image_url: None,
            pub_date: now,
            fetched_at: now,
            is_read: false,
            is_bookmarked: false,
            is_skipped: false,
        }
    }

    /// Deterministic article ID from the upstream identity: the GUID/Atom id
    /// when present, the link otherwise. The same upstream item must resolve
    /// to the same local id on every fetch, so deduplication can key on it.
    pub fn generate_id(guid: Option<&str>, link: &str) -> String {
        let source = match guid {
            Some(g) if !g.is_empty() => g,
            _ => link,
        };
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("article_{}", &digest[..16])
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }

    /// An article is part of the unread working set until it has been either
    /// read or skipped. Bookmarking is orthogonal.
    pub fn is_unread(&self) -> bool {
        !self.is_read && !self.is_skipped
    }
}
