//! MusicBrainz lookup
//!
//! Sub-queries, most specific first:
//! - recording search on title and artist, limited to albums and EPs
//! - release search on release title and artist
//! - release search on artist only
//!
//! Each hit is a release id that is then looked up in full.
//!
//! API docs: https://musicbrainz.org/doc/MusicBrainz_API

mod adapter;
mod client;
pub mod dto;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{QueryScope, SearchError, SearchHints, SearchProvider, Tokens, insert_token, sanitize, token};
use crate::metadata::{MetadataCollection, MetadataSource};

pub use client::MusicBrainzClient;

pub struct MusicBrainzProvider {
    client: MusicBrainzClient,
}

impl MusicBrainzProvider {
    pub fn new() -> Self {
        Self::with_client(MusicBrainzClient::new())
    }

    pub fn with_client(client: MusicBrainzClient) -> Self {
        Self { client }
    }

    /// Lucene query for a sub-query.
    pub fn query(scope: QueryScope, tokens: &Tokens) -> String {
        let artist = token(tokens, "artist");
        match scope {
            QueryScope::Track => format!(
                "recording:\"{}\" AND artist:\"{}\" AND (primarytype:album OR primarytype:ep)",
                token(tokens, "title"),
                artist
            ),
            QueryScope::Release => {
                format!("release:\"{}\" AND artist:\"{}\"", token(tokens, "release"), artist)
            }
            QueryScope::Artist => format!("artist:\"{artist}\" AND primarytype:album"),
        }
    }

    async fn release_ids(&self, scope: QueryScope, query: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        match scope {
            QueryScope::Track => self
                .client
                .search_recordings(query, limit)
                .await
                .map(adapter::release_ids_from_recordings),
            QueryScope::Release | QueryScope::Artist => self
                .client
                .search_releases(query, limit)
                .await
                .map(adapter::release_ids),
        }
    }
}

impl Default for MusicBrainzProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for MusicBrainzProvider {
    fn source(&self) -> MetadataSource {
        MetadataSource::MusicBrainz
    }

    /// One search plus one lookup per hit, each spaced by the client.
    fn pacing(&self, limit: usize) -> Duration {
        let requests = u32::try_from(limit).unwrap_or(u32::MAX).saturating_add(1);
        self.client.interval().saturating_mul(requests)
    }

    fn tokens(&self, hints: &SearchHints) -> Tokens {
        let mut tokens = Tokens::new();
        let clean = |v: &Option<String>| v.as_deref().map(|v| sanitize(v, true));
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
        let query = Self::query(scope, tokens);
        debug!(%scope, query = %query, limit, "MusicBrainz search");

        let mut ids = match self.release_ids(scope, &query, limit).await {
            Ok(ids) => ids,
            Err(SearchError::NoMatches) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        ids.truncate(limit);

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            match self.client.lookup_release(&id).await {
                Ok(release) => results.push(adapter::to_collection(release)),
                Err(e) => warn!(release_id = %id, error = %e, "Release lookup failed"),
            }
        }
        Ok(results)
    }
}
