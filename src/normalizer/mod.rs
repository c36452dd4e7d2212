use chrono::Utc;
use html_escape::decode_html_entities;

use crate::domain::Article;
use crate::parser::RawItem;

#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Map one raw parsed item to a canonical [`Article`], or `None` when the
    /// item carries neither a title nor a link (same silent-drop rule the
    /// parser applies, repeated here defensively).
    pub fn normalize(&self, feed_id: &str, item: &RawItem) -> Option<Article> {
        if item.title.is_none() && item.link.is_none() {
            return None;
        }

        let link = item.link.clone().unwrap_or_default();
        let mut article = Article::new(feed_id, item.guid.as_deref(), &link);

        article.title = clean_text(item.title.as_deref().unwrap_or_default());
        article.description =
            clean_text(item.description.as_deref().or(item.content.as_deref()).unwrap_or_default());
        article.content = select_content(item.content.as_deref(), item.description.as_deref());
        article.image_url = item.image_url.clone();
        // Missing or unparsable dates fall back to fetch time, never an error.
        article.pub_date = item.pub_date.unwrap_or_else(Utc::now);

        Some(article)
    }

    /// Normalize a whole batch, dropping unusable items.
    pub fn normalize_batch(&self, feed_id: &str, items: &[RawItem]) -> Vec<Article> {
        items
            .iter()
            .filter_map(|item| self.normalize(feed_id, item))
            .collect()
    }
}

/// Full content is authoritative when it is non-blank after trimming; the
/// description is the fallback. Markup is kept for the display layer.
fn select_content(content: Option<&str>, description: Option<&str>) -> Option<String> {
    match content {
        Some(c) if !c.trim().is_empty() => Some(c.to_string()),
        _ => description
            .filter(|d| !d.trim().is_empty())
            .map(String::from),
    }
}

/// Strip markup, decode named HTML entities, collapse whitespace, trim.
pub fn clean_text(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    let decoded = decode_html_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
