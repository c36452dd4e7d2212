use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::{Result, SwipeFeedError};
use crate::fetcher::{Transport, DEFAULT_TIMEOUT_SECS, USER_AGENT};

/// Plain cross-origin fetch for platforms that allow it.
pub struct DirectTransport {
    client: Client,
}

impl DirectTransport {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for DirectTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn fetch_document(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SwipeFeedError::Fetch(e.to_string()))?;
        if let Err(e) = response.error_for_status_ref() {
            return Err(SwipeFeedError::Fetch(e.to_string()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SwipeFeedError::Fetch(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(SwipeFeedError::Fetch(format!("empty body from {}", url)));
        }

        Ok(body)
    }
}
