//! Metadata lookup against external services.
//!
//! Each service is a [`SearchProvider`] exposing up to three sub-queries of
//! decreasing specificity ([`QueryScope`]). The [`SearchCoordinator`] runs
//! them in priority order under a shared result budget.
//!
//! Providers follow a client / dto / adapter split: the client speaks HTTP,
//! the DTOs mirror the wire format exactly and the adapter is the only
//! place that turns them into [`MetadataCollection`]s.

pub mod coordinator;
pub mod itunes;
pub mod lastfm;
pub mod musicbrainz;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::config::Config;
use crate::metadata::{Field, FieldAccess, MetadataCollection, MetadataSource};

pub use coordinator::SearchCoordinator;

/// User agent sent to every service. MusicBrainz rejects requests without one.
pub(crate) const USER_AGENT: &str = concat!(
    "ReleaseMinder/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/release-minder)"
);

/// Errors that can occur during a lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("No matches found")]
    NoMatches,

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Missing credentials for {0}")]
    MissingCredentials(&'static str),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Named query values, e.g. `artist` → `The White Stripes`.
pub type Tokens = BTreeMap<String, String>;

/// One sub-query of a provider, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryScope {
    /// Track title and artist
    Track,
    /// Release title and artist
    Release,
    /// Artist only
    Artist,
}

impl QueryScope {
    /// Default fallback order.
    pub const ORDER: [QueryScope; 3] = [QueryScope::Track, QueryScope::Release, QueryScope::Artist];

    /// Token names this scope cannot run without.
    pub fn required(self) -> &'static [&'static str] {
        match self {
            Self::Track => &["title", "artist"],
            Self::Release => &["release", "artist"],
            Self::Artist => &["artist"],
        }
    }

    pub fn is_satisfied(self, tokens: &Tokens) -> bool {
        self.required()
            .iter()
            .all(|key| tokens.get(*key).is_some_and(|v| !v.trim().is_empty()))
    }
}

impl fmt::Display for QueryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track => write!(f, "track"),
            Self::Release => write!(f, "release"),
            Self::Artist => write!(f, "artist"),
        }
    }
}

/// What we already know about a release, used to build query tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHints {
    pub artist: Option<String>,
    pub release: Option<String>,
    pub title: Option<String>,
    pub asin: Option<String>,
    /// Tracks on disk, used to mark candidates that line up
    pub track_count: usize,
}

impl SearchHints {
    /// Hints from a release's metadata (the lead track's values).
    pub fn from_metadata(metadata: &impl FieldAccess) -> Self {
        Self {
            artist: metadata
                .field(Field::Artist)
                .or_else(|| metadata.field(Field::AlbumArtist)),
            release: metadata.field(Field::Release),
            title: metadata.field(Field::Title),
            asin: metadata.field(Field::Asin),
            track_count: metadata.track_count(),
        }
    }
}

/// A metadata lookup service.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Identifier stamped on every result.
    fn source(&self) -> MetadataSource;

    /// Build query tokens from hints. An empty map skips the provider.
    fn tokens(&self, hints: &SearchHints) -> Tokens;

    /// Sub-queries in the order they should run.
    fn scopes(&self) -> &[QueryScope] {
        &QueryScope::ORDER
    }

    /// Time a sub-query for `limit` candidates may spend waiting on the
    /// service's rate limit, granted on top of the coordinator timeout.
    fn pacing(&self, _limit: usize) -> Duration {
        Duration::ZERO
    }

    /// Run one sub-query returning at most `limit` candidates.
    async fn search(
        &self,
        scope: QueryScope,
        tokens: &Tokens,
        limit: usize,
    ) -> Result<Vec<MetadataCollection>, SearchError>;
}

/// Instantiate the configured providers in priority order.
///
/// Unknown names and providers lacking credentials are skipped with a
/// warning.
pub fn providers_from_config(config: &Config) -> Vec<Arc<dyn SearchProvider>> {
    let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();
    for name in &config.search.providers {
        match name.to_lowercase().as_str() {
            "musicbrainz" => providers.push(Arc::new(musicbrainz::MusicBrainzProvider::new())),
            "lastfm" => match &config.credentials.lastfm_api_key {
                Some(key) if !key.trim().is_empty() => {
                    providers.push(Arc::new(lastfm::LastfmProvider::new(key.clone())))
                }
                _ => warn!("Skipping Last.fm, no API key configured"),
            },
            "itunes" => providers.push(Arc::new(itunes::ITunesProvider::new())),
            other => warn!(provider = other, "Unknown search provider"),
        }
    }
    providers
}

/// Characters that upset Lucene-style query parsers.
static QUERY_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[()_\-"]"#).expect("valid punctuation pattern"));

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("valid year pattern"));

/// Replace characters that upset query parsers with spaces, optionally
/// dropping four-digit words (years), and collapse whitespace.
pub fn sanitize(text: &str, strip_years: bool) -> String {
    QUERY_PUNCTUATION
        .replace_all(text, " ")
        .split_whitespace()
        .filter(|word| !(strip_years && YEAR.is_match(word)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Insert a token unless the value is missing or blank.
pub(crate) fn insert_token(tokens: &mut Tokens, key: &str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        tokens.insert(key.to_string(), value);
    }
}

/// Token value or empty string.
pub(crate) fn token<'a>(tokens: &'a Tokens, key: &str) -> &'a str {
    tokens.get(key).map(String::as_str).unwrap_or("")
}

/// `a=1&b=2` with every value URL-encoded.
pub(crate) fn query_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// GET `url` and decode the JSON body, mapping HTTP failures.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, SearchError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
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
