//! HTTP art fetcher
//!
//! Image hosts are picky about clients, so requests carry a browser-like
//! user agent and a referer. Each request gets its own timeout.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ArtError, ArtFetcher};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; release-minder/0.1)";
const REFERER: &str = "http://www.google.com/";

/// [`ArtFetcher`] backed by `reqwest`.
pub struct HttpArtFetcher {
    http_client: reqwest::Client,
}

impl HttpArtFetcher {
    /// Create a new fetcher
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<reqwest::Response, ArtError> {
        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::REFERER, REFERER)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ArtError::Timeout(timeout)
                } else {
                    ArtError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ArtError::NotFound(url.to_string()));
        }

        if !status.is_success() {
            return Err(ArtError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        Ok(response)
    }
}

impl Default for HttpArtFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtFetcher for HttpArtFetcher {
    async fn probe(&self, url: &str, timeout: Duration) -> bool {
        match self.get(url, timeout).await {
            Ok(_) => true,
            Err(e) => {
                debug!(url, error = %e, "Art probe failed");
                false
            }
        }
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, ArtError> {
        let response = self.get(url, timeout).await?;
        let data = response
            .bytes()
            .await
            .map_err(|e| ArtError::Network(e.to_string()))?
            .to_vec();
        Ok(data)
    }
}
