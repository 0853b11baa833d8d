//! Last.fm API Data Transfer Objects
//!
//! These types match what the Last.fm 2.0 JSON API returns.
//! DO NOT use these types outside the lastfm module - convert via the adapter.
//!
//! API Reference: https://www.last.fm/api
//!
//! Last.fm serializes single-element lists as bare objects and empty lists
//! as empty strings, hence [`OneOrMany`] and the raw `tags` value.

use serde::{Deserialize, Serialize};

/// A list that may arrive as a single object
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// Error body; Last.fm may send it with a 200 status
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: u32,
    pub message: String,
}

// ---------------------------------------------------------------------------
// track.getInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackInfoResponse {
    pub track: Option<TrackInfo>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackInfo {
    pub name: String,
    pub album: Option<TrackAlbum>,
}

/// Album a track belongs to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackAlbum {
    pub artist: String,
    pub title: String,
}

// ---------------------------------------------------------------------------
// album.search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumSearchResponse {
    pub results: Option<AlbumSearchResults>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumSearchResults {
    pub albummatches: AlbumMatches,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumMatches {
    #[serde(default)]
    pub album: OneOrMany<AlbumMatch>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumMatch {
    pub name: String,
    pub artist: String,
}

// ---------------------------------------------------------------------------
// artist.getTopAlbums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopAlbumsResponse {
    pub topalbums: Option<TopAlbums>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopAlbums {
    #[serde(default)]
    pub album: OneOrMany<TopAlbum>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopAlbum {
    pub name: String,
    pub artist: NamedArtist,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamedArtist {
    pub name: String,
}

// ---------------------------------------------------------------------------
// album.getInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumInfoResponse {
    pub album: Option<AlbumInfo>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumInfo {
    pub name: String,
    pub artist: String,
    pub mbid: Option<String>,
    #[serde(default)]
    pub image: Vec<Image>,
    pub tracks: Option<AlbumTracks>,
    /// `{"tag": [...]}` or `""`
    #[serde(default)]
    pub tags: serde_json::Value,
    pub wiki: Option<Wiki>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Image {
    #[serde(rename = "#text")]
    pub url: String,
    pub size: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumTracks {
    #[serde(default)]
    pub track: OneOrMany<AlbumTrack>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumTrack {
    pub name: String,
    pub artist: Option<NamedArtist>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Wiki {
    /// e.g. "01 Apr 2003, 00:00"
    pub published: Option<String>,
}

#[cfg(test)]
pub(crate) mod contract_tests {
    use super::*;

    pub const ALBUM_INFO: &str = r##"{
        "album": {
            "name": "Elephant",
            "artist": "The White Stripes",
            "mbid": "rel-elephant",
            "url": "https://www.last.fm/music/The+White+Stripes/Elephant",
            "image": [
                {"#text": "https://img/s.png", "size": "small"},
                {"#text": "https://img/xl.png", "size": "extralarge"},
                {"#text": "", "size": "mega"}
            ],
            "tracks": {"track": [
                {"name": "Seven Nation Army", "duration": 231, "@attr": {"rank": 1}, "artist": {"name": "The White Stripes"}},
                {"name": "Black Math", "duration": 184, "@attr": {"rank": 2}, "artist": {"name": "The White Stripes"}}
            ]},
            "tags": {"tag": [{"name": "garage rock"}, {"name": "rock"}]},
            "wiki": {"published": "01 Apr 2003, 00:00"}
        }
    }"##;

    #[test]
    fn test_parse_album_info() {
        let response: AlbumInfoResponse = serde_json::from_str(ALBUM_INFO).expect("Should parse");
        let album = response.album.unwrap();
        assert_eq!(album.name, "Elephant");
        assert_eq!(album.image.len(), 3);
        assert_eq!(album.tracks.unwrap().track.into_vec().len(), 2);
    }

    #[test]
    fn test_parse_single_track_and_empty_tags() {
        let json = r#"{"album": {
            "name": "Single",
            "artist": "Someone",
            "tracks": {"track": {"name": "Only", "artist": {"name": "Someone"}}},
            "tags": ""
        }}"#;
        let response: AlbumInfoResponse = serde_json::from_str(json).expect("Should parse");
        let album = response.album.unwrap();
        assert_eq!(album.tracks.unwrap().track.into_vec().len(), 1);
        assert!(album.tags.is_string());
    }

    #[test]
    fn test_parse_error_body() {
        let error: ApiError =
            serde_json::from_str(r#"{"error": 6, "message": "Album not found"}"#).unwrap();
        assert_eq!(error.error, 6);
    }

    #[test]
    fn test_parse_album_search() {
        let json = r#"{"results": {
            "opensearch:totalResults": "2",
            "albummatches": {"album": [
                {"name": "Elephant", "artist": "The White Stripes", "mbid": ""},
                {"name": "Elephant (Deluxe)", "artist": "The White Stripes"}
            ]}
        }}"#;
        let response: AlbumSearchResponse = serde_json::from_str(json).expect("Should parse");
        let matches = response.results.unwrap().albummatches.album.into_vec();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_parse_top_albums_and_track_info() {
        let top: TopAlbumsResponse = serde_json::from_str(
            r#"{"topalbums": {"album": [{"name": "Elephant", "artist": {"name": "The White Stripes", "mbid": "x"}}]}}"#,
        )
        .unwrap();
        assert_eq!(top.topalbums.unwrap().album.into_vec()[0].artist.name, "The White Stripes");

        let info: TrackInfoResponse = serde_json::from_str(
            r#"{"track": {"name": "Seven Nation Army", "album": {"artist": "The White Stripes", "title": "Elephant"}}}"#,
        )
        .unwrap();
        assert_eq!(info.track.unwrap().album.unwrap().title, "Elephant");
    }
}
