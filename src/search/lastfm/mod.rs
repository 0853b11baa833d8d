//! Last.fm lookup
//!
//! Requires an API key. Sub-queries, most specific first:
//! - track.getInfo on artist and title, then the album it belongs to
//! - album.search on "artist - release"
//! - artist.getTopAlbums
//!
//! Every hit is expanded with album.getInfo to get its track list.

mod adapter;
mod client;
pub mod dto;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{QueryScope, SearchError, SearchHints, SearchProvider, Tokens, insert_token, token};
use crate::metadata::{MetadataCollection, MetadataSource};

pub use client::LastfmClient;

pub struct LastfmProvider {
    client: LastfmClient,
}

impl LastfmProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(LastfmClient::new(api_key))
    }

    pub fn with_client(client: LastfmClient) -> Self {
        Self { client }
    }

    /// (artist, album) pairs to expand for a sub-query.
    async fn albums(&self, scope: QueryScope, tokens: &Tokens, limit: usize) -> Result<Vec<(String, String)>, SearchError> {
        let artist = token(tokens, "artist");
        let albums = match scope {
            QueryScope::Track => {
                let info = self.client.track_info(artist, token(tokens, "title")).await?;
                adapter::track_album(info).into_iter().collect()
            }
            QueryScope::Release => {
                let query = format!("{} - {}", artist, token(tokens, "release"));
                adapter::album_matches(self.client.album_search(&query, limit).await?)
            }
            QueryScope::Artist => adapter::top_albums(self.client.top_albums(artist, limit).await?),
        };
        Ok(albums)
    }
}

#[async_trait]
impl SearchProvider for LastfmProvider {
    fn source(&self) -> MetadataSource {
        MetadataSource::Lastfm
    }

    fn tokens(&self, hints: &SearchHints) -> Tokens {
        let mut tokens = Tokens::new();
        let trimmed = |v: &Option<String>| v.as_deref().map(|v| v.trim().to_string());
        insert_token(&mut tokens, "artist", trimmed(&hints.artist));
        insert_token(&mut tokens, "release", trimmed(&hints.release));
        insert_token(&mut tokens, "title", trimmed(&hints.title));
        tokens
    }

    async fn search(
        &self,
        scope: QueryScope,
        tokens: &Tokens,
        limit: usize,
    ) -> Result<Vec<MetadataCollection>, SearchError> {
        let mut albums = match self.albums(scope, tokens, limit).await {
            Ok(albums) => albums,
            Err(SearchError::NoMatches) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        albums.truncate(limit);
        debug!(%scope, albums = albums.len(), "Last.fm search");

        let mut results = Vec::with_capacity(albums.len());
        for (artist, album) in albums {
            match self.client.album_info(&artist, &album).await {
                Ok(info) => results.extend(adapter::to_collection(info).filter(|c| !c.is_empty())),
                Err(e) => warn!(%artist, %album, error = %e, "Album lookup failed"),
            }
        }
        Ok(results)
    }
}
