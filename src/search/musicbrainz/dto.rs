//! MusicBrainz API Data Transfer Objects
//!
//! These types match EXACTLY what the MusicBrainz API returns.
//! DO NOT add fields that aren't in the API response.
//! DO NOT use these types outside the musicbrainz module - convert via the adapter.
//!
//! API Reference: https://musicbrainz.org/doc/MusicBrainz_API
//!
//! Searches (`/recording`, `/release`) only yield release IDs; the full
//! track list comes from a release lookup with
//! `inc=recordings+artist-credits+genres`.

use serde::{Deserialize, Serialize};

/// `/recording?query=` search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordingSearch {
    #[serde(default)]
    pub recordings: Vec<RecordingHit>,
}

/// One recording search hit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordingHit {
    pub id: String,
    pub title: String,
    /// Releases this recording appears on
    #[serde(default)]
    pub releases: Vec<ReleaseRef>,
}

/// `/release?query=` search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReleaseSearch {
    #[serde(default)]
    pub releases: Vec<ReleaseRef>,
}

/// Minimal release reference inside search results
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReleaseRef {
    pub id: String,
    pub title: String,
}

/// Release lookup response
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Release {
    /// MusicBrainz release ID
    pub id: String,
    pub title: String,
    /// Release date (YYYY, YYYY-MM, or YYYY-MM-DD)
    pub date: Option<String>,
    /// Amazon catalog number
    pub asin: Option<String>,
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    pub release_group: Option<ReleaseGroup>,
    /// Media (discs) in this release
    #[serde(default)]
    pub media: Vec<Medium>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

/// Artist credit (can be multiple for collaborations)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistCredit {
    pub artist: Artist,
    /// How this artist is credited (may differ from official name)
    pub name: Option<String>,
    /// Join phrase (e.g., " & ", " feat. ")
    pub joinphrase: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    /// MusicBrainz artist ID
    pub id: String,
    /// Official artist name
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseGroup {
    pub id: String,
    /// Primary type (Album, Single, EP, etc.)
    pub primary_type: Option<String>,
}

/// Medium (disc) within a release
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Medium {
    /// Disc number
    pub position: Option<u32>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Track on a medium
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Track {
    /// Track position on medium
    pub position: Option<u32>,
    /// Track title (may differ from recording title)
    pub title: Option<String>,
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    pub recording: Option<Recording>,
}

/// Recording embedded in a release track
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recording {
    pub id: String,
    pub title: Option<String>,
}

/// Genre with vote count
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Genre {
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

/// Error response from MusicBrainz API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: String,
    pub help: Option<String>,
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// If these fail, the API has changed and we need to update our DTOs.
// ============================================================================
