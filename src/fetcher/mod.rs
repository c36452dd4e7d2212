pub mod direct;
pub mod proxied;

use async_trait::async_trait;
use url::Url;

use crate::app::Result;

pub use direct::DirectTransport;
pub use proxied::{ProxiedTransport, ProxyEndpoint};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const USER_AGENT: &str = "swipefeed/0.1.0 (RSS reader)";

/// Document transport: given a feed URL, produce the raw feed document text.
///
/// Two implementations exist: [`DirectTransport`] for environments with
/// unrestricted cross-origin fetch, and [`ProxiedTransport`] which tunnels
/// through an ordered chain of relay endpoints. Selected at composition time.
#[async_trait]
pub trait Transport {
    async fn fetch_document(&self, url: &str) -> Result<String>;
}

/// Ensure the URL is protocol-qualified (defaulting to `https://`) and
/// well-formed. Identifier derivation depends on this normalized form, so it
/// runs before anything else touches the URL.
pub fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let parsed = Url::parse(&candidate)?;
    Ok(parsed.to_string())
}
