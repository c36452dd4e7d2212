use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::form_urlencoded;

use crate::app::{Result, SwipeFeedError};
use crate::fetcher::{Transport, DEFAULT_TIMEOUT_SECS, USER_AGENT};

/// One relay in the fallback chain. The target URL is percent-encoded and
/// appended to `prefix`. Relays wrap the payload differently: some return the
/// body verbatim, some wrap it in a JSON envelope with the document under
/// `json_field`.
#[derive(Debug, Clone)]
pub struct ProxyEndpoint {
    pub prefix: String,
    pub json_field: Option<String>,
}

impl ProxyEndpoint {
    pub fn raw(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            json_field: None,
        }
    }

    pub fn json(prefix: &str, field: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            json_field: Some(field.to_string()),
        }
    }

    fn wrap(&self, url: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(url.as_bytes()).collect();
        format!("{}{}", self.prefix, encoded)
    }

    /// Normalize a relay response to plain document text.
    fn unwrap_body(&self, body: &str) -> Result<String> {
        match &self.json_field {
            None => Ok(body.to_string()),
            Some(field) => {
                let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
                    SwipeFeedError::Fetch(format!("proxy returned invalid JSON envelope: {}", e))
                })?;
                value
                    .get(field)
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .ok_or_else(|| {
                        SwipeFeedError::Fetch(format!(
                            "proxy envelope missing '{}' field",
                            field
                        ))
                    })
            }
        }
    }
}

/// Default relay chain, tried in order.
pub fn default_proxies() -> Vec<ProxyEndpoint> {
    vec![
        ProxyEndpoint::json("https://api.allorigins.win/get?url=", "contents"),
        ProxyEndpoint::raw("https://corsproxy.io/?url="),
        ProxyEndpoint::raw("https://api.codetabs.com/v1/proxy?quest="),
    ]
}

/// Fetch through an ordered proxy fallback chain. Each attempt gets its own
/// timeout; a timed-out attempt falls through to the next relay. If every
/// relay fails, the error preserves the last underlying cause.
pub struct ProxiedTransport {
    client: Client,
    proxies: Vec<ProxyEndpoint>,
    attempt_timeout: Duration,
}

impl ProxiedTransport {
    pub fn new() -> Self {
        Self::with_proxies(default_proxies(), Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_proxies(proxies: Vec<ProxyEndpoint>, attempt_timeout: Duration) -> Self {
        // No client-level timeout: each attempt is bounded individually.
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            proxies,
            attempt_timeout,
        }
    }

    async fn try_proxy(&self, proxy: &ProxyEndpoint, url: &str) -> Result<String> {
        let wrapped = proxy.wrap(url);
        let response = self
            .client
            .get(&wrapped)
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
        let document = proxy.unwrap_body(&body)?;
        if document.trim().is_empty() {
            return Err(SwipeFeedError::Fetch(format!(
                "empty body via {}",
                proxy.prefix
            )));
        }

        Ok(document)
    }
}

impl Default for ProxiedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ProxiedTransport {
    async fn fetch_document(&self, url: &str) -> Result<String> {
        let mut last_error = SwipeFeedError::Fetch("no proxies configured".into());

        for proxy in &self.proxies {
            match tokio::time::timeout(self.attempt_timeout, self.try_proxy(proxy, url)).await {
                Ok(Ok(document)) => return Ok(document),
                Ok(Err(e)) => {
                    tracing::debug!("Proxy {} failed for {}: {}", proxy.prefix, url, e);
                    last_error = e;
                }
                Err(_) => {
                    tracing::debug!("Proxy {} timed out for {}", proxy.prefix, url);
                    last_error = SwipeFeedError::Fetch(format!(
                        "timed out after {:?} via {}",
                        self.attempt_timeout, proxy.prefix
                    ));
                }
            }
        }

        Err(SwipeFeedError::Fetch(format!(
            "all {} proxy attempts failed for {}: {}",
            self.proxies.len(),
            url,
            last_error
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn spawn_relay(status_line: &'static str, body: &'static str) -> ProxyEndpoint {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        ProxyEndpoint::raw(&format!("http://{}/?url=", addr))
    }

    #[tokio::test]
    async fn test_failing_relay_falls_through_to_next() {
        let broken = spawn_relay("500 Internal Server Error", "").await;
        let working = spawn_relay("200 OK", "<rss><channel></channel></rss>").await;
        let transport =
            ProxiedTransport::with_proxies(vec![broken, working], Duration::from_secs(5));

        let doc = transport
            .fetch_document("https://example.com/feed.xml")
            .await
            .unwrap();
        assert_eq!(doc, "<rss><channel></channel></rss>");
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_last_cause() {
        let first = spawn_relay("500 Internal Server Error", "").await;
        let last = spawn_relay("404 Not Found", "").await;
        let transport =
            ProxiedTransport::with_proxies(vec![first, last], Duration::from_secs(5));

        let err = transport
            .fetch_document("https://example.com/feed.xml")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("all 2 proxy attempts failed"));
        assert!(message.contains("404 Not Found"));
        assert!(!message.contains("500 Internal Server Error"));
    }

    #[test]
    fn test_wrap_encodes_target_url() {
        let proxy = ProxyEndpoint::raw("https://relay.example/?url=");
        let wrapped = proxy.wrap("https://example.com/feed?a=1&b=2");
        assert_eq!(
            wrapped,
            "https://relay.example/?url=https%3A%2F%2Fexample.com%2Ffeed%3Fa%3D1%26b%3D2"
        );
    }

    #[test]
    fn test_unwrap_raw_passthrough() {
        let proxy = ProxyEndpoint::raw("https://relay.example/?url=");
        let body = proxy.unwrap_body("<rss></rss>").unwrap();
        assert_eq!(body, "<rss></rss>");
    }

    #[test]
    fn test_unwrap_json_envelope() {
        let proxy = ProxyEndpoint::json("https://relay.example/get?url=", "contents");
        let body = proxy
            .unwrap_body(r#"{"contents":"<rss></rss>","status":{"http_code":200}}"#)
            .unwrap();
        assert_eq!(body, "<rss></rss>");
    }

    #[test]
    fn test_unwrap_json_envelope_missing_field() {
        let proxy = ProxyEndpoint::json("https://relay.example/get?url=", "contents");
        let err = proxy.unwrap_body(r#"{"status":{"http_code":200}}"#).unwrap_err();
        assert!(matches!(err, SwipeFeedError::Fetch(_)));
    }

    #[test]
    fn test_unwrap_json_envelope_invalid_json() {
        let proxy = ProxyEndpoint::json("https://relay.example/get?url=", "contents");
        let err = proxy.unwrap_body("<rss></rss>").unwrap_err();
        assert!(matches!(err, SwipeFeedError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_empty_chain_fails_with_aggregate_error() {
        let transport =
            ProxiedTransport::with_proxies(Vec::new(), Duration::from_secs(1));
        let err = transport
            .fetch_document("https://example.com/feed.xml")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("all 0 proxy attempts failed"));
    }
}
