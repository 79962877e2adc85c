//! Outbound HTTP abstraction
//!
//! Fetchers only need "GET this URL and give me the JSON body", so the
//! transport is a one-method trait. `ReqwestHttpClient` is the production
//! implementation; tests plug in canned responses.

use crate::error::{EmoteError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Minimal JSON-over-HTTP client
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` and parse the body as JSON
    ///
    /// Non-success statuses are errors. The body is returned untyped so
    /// that schema validation stays with the caller.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value>;
}

/// `reqwest`-backed HTTP client
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client with an optional per-request timeout
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| EmoteError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest::Client`
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::from_client(reqwest::Client::new())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EmoteError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmoteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| EmoteError::Network {
                url: url.to_string(),
                reason: format!("invalid JSON body: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_with_timeout_builds() {
        assert!(ReqwestHttpClient::new(Some(Duration::from_secs(5))).is_ok());
        assert!(ReqwestHttpClient::new(None).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = ReqwestHttpClient::new(Some(Duration::from_secs(2))).unwrap();
        let err = client.get_json("http://127.0.0.1:1/users").await.unwrap_err();
        assert!(matches!(err, EmoteError::Network { ref url, .. } if url == "http://127.0.0.1:1/users"));
    }
}
