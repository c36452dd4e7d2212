use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwipeFeedError {
    /// Network failure, timeout, bad HTTP status, empty body, or an exhausted
    /// proxy fallback chain. The message preserves the last underlying cause.
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Feed parsing error: {0}")]
    Parse(String),

    #[error("Unsupported feed format: expected RSS or Atom")]
    UnsupportedFormat,

    /// Candidate feed URL fetched and parsed but yielded nothing usable.
    #[error("Not a valid feed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SwipeFeedError>;
