use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, FeedType};
use feed_rs::parser::{self, ParseErrorKind, ParseFeedError};

use crate::app::{Result, SwipeFeedError};

/// Structured intermediate representation of a parsed feed document. Items
/// appear in document order; date-based ordering happens downstream.
#[derive(Debug, Clone)]
pub struct RawFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Vec<RawItem>,
}

/// One item/entry before normalization. Fields carry the upstream text as-is
/// (markup included); cleaning is the normalizer's job.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    pub guid: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Clone, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw document text into a [`RawFeed`].
    ///
    /// Malformed XML is a terminal `Parse` error; a well-formed document whose
    /// root is neither an RSS `channel` nor an Atom `feed` is
    /// `UnsupportedFormat`. JSON Feed documents are rejected the same way.
    pub fn parse(&self, body: &str) -> Result<RawFeed> {
        let feed = parser::parse(body.as_bytes()).map_err(map_parse_error)?;

        if feed.feed_type == FeedType::JSON {
            return Err(SwipeFeedError::UnsupportedFormat);
        }

        let items = feed.entries.into_iter().filter_map(raw_item).collect();

        Ok(RawFeed {
            title: feed.title.map(|t| t.content),
            description: feed.description.map(|d| d.content),
            items,
        })
    }
}

fn map_parse_error(e: ParseFeedError) -> SwipeFeedError {
    match e {
        ParseFeedError::ParseError(ParseErrorKind::NoFeedRoot) => {
            SwipeFeedError::UnsupportedFormat
        }
        other => SwipeFeedError::Parse(other.to_string()),
    }
}

/// Items missing both a title and a resolvable link produce no article and no
/// error.
fn raw_item(entry: Entry) -> Option<RawItem> {
    let title = entry.title.as_ref().map(|t| t.content.clone());
    let link = select_link(&entry);

    if title.is_none() && link.is_none() {
        return None;
    }

    let guid = if entry.id.trim().is_empty() {
        None
    } else {
        Some(entry.id.clone())
    };

    let description = entry.summary.as_ref().map(|s| s.content.clone());
    let content = entry.content.as_ref().and_then(|c| c.body.clone());
    let pub_date = entry.published.or(entry.updated);
    let image_url = select_image(&entry, content.as_deref());

    Some(RawItem {
        title,
        link,
        description,
        content,
        pub_date,
        guid,
        image_url,
    })
}

/// The "alternate" link when one is marked, else the first link.
fn select_link(entry: &Entry) -> Option<String> {
    entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone())
}

/// Image resolution priority: image-typed enclosure/media content, then a
/// media thumbnail, then the first `<img src>` inside the item's content.
fn select_image(entry: &Entry, content: Option<&str>) -> Option<String> {
    for media in &entry.media {
        for mc in &media.content {
            let is_image = mc
                .content_type
                .as_ref()
                .map(|m| m.to_string().starts_with("image/"))
                .unwrap_or(false);
            if is_image {
                if let Some(url) = &mc.url {
                    return Some(url.to_string());
                }
            }
        }
    }

    for media in &entry.media {
        if let Some(thumb) = media.thumbnails.first() {
            return Some(thumb.image.uri.clone());
        }
    }

    content.and_then(extract_img_src)
}

/// Pull the src attribute out of the first `<img>` tag in an HTML fragment.
fn extract_img_src(html: &str) -> Option<String> {
    let img_at = html.find("<img")?;
    let rest = &html[img_at..];
    let tag_end = rest.find('>')?;
    let tag = &rest[..tag_end];

    let mut from = 0;
    while let Some(found) = tag[from..].find("src=\"") {
        let at = from + found;
        from = at + "src=\"".len();
        // `data-src` and friends carry lazy-load placeholders, not the image
        if !tag[..at].ends_with(char::is_whitespace) {
            continue;
        }
        let value = &tag[from..];
        let end = value.find('"')?;
        return Some(value[..end].to_string());
    }
    None
}
