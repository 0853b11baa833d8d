//! MusicBrainz HTTP client
//!
//! Handles communication with the MusicBrainz web service.
//! See: https://musicbrainz.org/doc/MusicBrainz_API
//!
//! IMPORTANT: MusicBrainz requires a User-Agent header and rate limits to 1 req/sec.
//! Every request made through one client is spaced [`REQUEST_INTERVAL`] apart.

use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::debug;

use super::dto;
use crate::search::{SearchError, http_client, query_string};

/// Minimum spacing between two requests.
pub const REQUEST_INTERVAL: Duration = Duration::from_millis(1100);

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
    interval: Duration,
    /// When the most recent request was (or is scheduled to be) sent
    last_request: Mutex<Option<Instant>>,
}

impl MusicBrainzClient {
    /// Create a new client
    pub fn new() -> Self {
        Self::with_base_url("https://musicbrainz.org/ws/2")
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: http_client(),
            base_url: base_url.into(),
            interval: REQUEST_INTERVAL,
            last_request: Mutex::new(None),
        }
    }

    /// Change the spacing between requests
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request slot. Slots are reserved under the lock,
    /// so concurrent callers queue up instead of bursting.
    pub(crate) async fn pace(&self) {
        let wait = {
            let mut last = self.last_request.lock();
            let now = Instant::now();
            let slot = match *last {
                Some(previous) => (previous + self.interval).max(now),
                None => now,
            };
            *last = Some(slot);
            slot - now
        };
        if !wait.is_zero() {
            debug!(?wait, "Waiting for MusicBrainz rate limit");
            tokio::time::sleep(wait).await;
        }
    }

    /// Lucene search over recordings
    pub async fn search_recordings(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<dto::RecordingSearch, SearchError> {
        let limit = limit.to_string();
        let url = format!(
            "{}/recording?{}",
            self.base_url,
            query_string(&[("query", query), ("limit", &limit), ("fmt", "json")])
        );
        self.get(&url).await
    }

    /// Lucene search over releases
    pub async fn search_releases(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<dto::ReleaseSearch, SearchError> {
        let limit = limit.to_string();
        let url = format!(
            "{}/release?{}",
            self.base_url,
            query_string(&[("query", query), ("limit", &limit), ("fmt", "json")])
        );
        self.get(&url).await
    }

    /// Full release with tracks, credits and genres
    pub async fn lookup_release(&self, release_id: &str) -> Result<dto::Release, SearchError> {
        let url = format!(
            "{}/release/{}?inc=recordings+artist-credits+genres&fmt=json",
            self.base_url,
            urlencoding::encode(release_id)
        );
        self.get(&url).await
    }

    /// Send the HTTP request and parse the response
    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, SearchError> {
        self.pace().await;
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SearchError::NoMatches);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }

        if !status.is_success() {
            // Try to parse error response
            if let Ok(error) = response.json::<dto::ApiError>().await {
                return Err(SearchError::InvalidResponse(error.error));
            }
            return Err(SearchError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))
    }
}

impl Default for MusicBrainzClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = MusicBrainzClient::new();
        assert_eq!(client.base_url, "https://musicbrainz.org/ws/2");
    }

    #[test]
    fn test_client_with_custom_url() {
        let client = MusicBrainzClient::with_base_url("http://localhost:8080");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced() {
        let client = MusicBrainzClient::new();
        let start = Instant::now();

        client.pace().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        client.pace().await;
        client.pace().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= REQUEST_INTERVAL * 2, "only waited {elapsed:?}");
        assert!(elapsed < REQUEST_INTERVAL * 3, "waited {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_client_does_not_wait() {
        let client = MusicBrainzClient::new().with_interval(Duration::from_secs(1));
        client.pace().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let start = Instant::now();
        client.pace().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client = MusicBrainzClient::with_base_url("http://127.0.0.1:9");
        let result = client.lookup_release("x").await;
        assert!(matches!(result, Err(SearchError::Network(_))));
    }
}
