//! iTunes Search API lookup
//!
//! No key required. Sub-queries search songs (artist and title), albums
//! (artist and release) and albums by artist name; each album hit is
//! looked up with its songs.

mod adapter;
pub mod dto;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    QueryScope, SearchError, SearchHints, SearchProvider, Tokens, get_json, http_client, insert_token,
    query_string, sanitize, token,
};
use crate::metadata::{MetadataCollection, MetadataSource};

/// iTunes Search API client and provider
pub struct ITunesProvider {
    http_client: reqwest::Client,
    base_url: String,
}

impl ITunesProvider {
    pub fn new() -> Self {
        Self::with_base_url("https://itunes.apple.com")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: http_client(),
            base_url: base_url.into(),
        }
    }

    /// Search URL for a sub-query.
    pub fn search_url(&self, scope: QueryScope, tokens: &Tokens, limit: usize) -> String {
        let artist = token(tokens, "artist");
        let limit = limit.to_string();
        let params: Vec<(&str, String)> = match scope {
            QueryScope::Track => vec![
                ("term", format!("{} {}", artist, token(tokens, "title"))),
                ("entity", "song".into()),
            ],
            QueryScope::Release => vec![
                ("term", format!("{} {}", artist, token(tokens, "release"))),
                ("entity", "album".into()),
            ],
            QueryScope::Artist => vec![
                ("term", artist.to_string()),
                ("entity", "album".into()),
                ("attribute", "artistTerm".into()),
            ],
        };
        let mut params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        params.push(("limit", &limit));
        format!("{}/search?{}", self.base_url, query_string(&params))
    }

    async fn lookup_album(&self, collection_id: u64) -> Result<dto::SearchResponse, SearchError> {
        let url = format!("{}/lookup?id={}&entity=song", self.base_url, collection_id);
        get_json(&self.http_client, &url).await
    }
}

impl Default for ITunesProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for ITunesProvider {
    fn source(&self) -> MetadataSource {
        MetadataSource::ITunes
    }

    fn tokens(&self, hints: &SearchHints) -> Tokens {
        let mut tokens = Tokens::new();
        let clean = |v: &Option<String>| v.as_deref().map(|v| sanitize(v, false));
        insert_token(&mut tokens, "artist", clean(&hints.artist));
        insert_token(&mut tokens, "release", clean(&hints.release));
        insert_token(&mut tokens, "title", clean(&hints.title));
        tokens
    }

    async fn search(
        &self,
        scope: QueryScope,
        tokens: &Tokens,
        limit: usize,
    ) -> Result<Vec<MetadataCollection>, SearchError> {
        let url = self.search_url(scope, tokens, limit);
        debug!(%scope, url = %url, "iTunes search");

        let response: dto::SearchResponse = match get_json(&self.http_client, &url).await {
            Ok(response) => response,
            Err(SearchError::NoMatches) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut ids = adapter::collection_ids(response);
        ids.truncate(limit);

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            match self.lookup_album(id).await {
                Ok(album) => {
                    let collection = adapter::to_collection(album);
                    if !collection.is_empty() {
                        results.push(collection);
                    }
                }
                Err(e) => warn!(collection_id = id, error = %e, "Album lookup failed"),
            }
        }
        Ok(results)
    }
}
