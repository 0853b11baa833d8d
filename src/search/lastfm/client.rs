//! Last.fm HTTP client
//!
//! Every call is a GET against the single 2.0 endpoint with a `method`
//! parameter and the API key.

use serde::de::DeserializeOwned;

use super::dto;
use crate::search::{SearchError, get_json, http_client, query_string};

/// Last.fm API client
pub struct LastfmClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LastfmClient {
    /// Create a new client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://ws.audioscrobbler.com/2.0/")
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http_client: http_client(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn track_info(&self, artist: &str, track: &str) -> Result<dto::TrackInfoResponse, SearchError> {
        self.call("track.getInfo", &[("artist", artist), ("track", track), ("autocorrect", "1")])
            .await
    }

    pub async fn album_search(&self, album: &str, limit: usize) -> Result<dto::AlbumSearchResponse, SearchError> {
        let limit = limit.to_string();
        self.call("album.search", &[("album", album), ("limit", &limit)]).await
    }

    pub async fn top_albums(&self, artist: &str, limit: usize) -> Result<dto::TopAlbumsResponse, SearchError> {
        let limit = limit.to_string();
        self.call("artist.getTopAlbums", &[("artist", artist), ("limit", &limit)])
            .await
    }

    pub async fn album_info(&self, artist: &str, album: &str) -> Result<dto::AlbumInfoResponse, SearchError> {
        self.call("album.getInfo", &[("artist", artist), ("album", album), ("autocorrect", "1")])
            .await
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, &str)]) -> Result<T, SearchError> {
        let mut all = vec![("method", method), ("api_key", self.api_key.as_str()), ("format", "json")];
        all.extend_from_slice(params);
        let url = format!("{}?{}", self.base_url, query_string(&all));

        // errors arrive as JSON bodies, sometimes with a 200 status
        let body: serde_json::Value = get_json(&self.http_client, &url).await?;
        if let Ok(error) = serde_json::from_value::<dto::ApiError>(body.clone()) {
            return Err(match error.error {
                // invalid parameters / not found
                6 => SearchError::NoMatches,
                10 | 26 => SearchError::MissingCredentials("lastfm"),
                29 => SearchError::RateLimited,
                _ => SearchError::InvalidResponse(error.message),
            });
        }
        serde_json::from_value(body).map_err(|e| SearchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = LastfmClient::new("key");
        assert_eq!(client.base_url, "https://ws.audioscrobbler.com/2.0/");
        assert_eq!(client.api_key, "key");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client = LastfmClient::with_base_url("key", "http://127.0.0.1:9/2.0/");
        let result = client.album_info("a", "b").await;
        assert!(matches!(result, Err(SearchError::Network(_))));
    }
}
