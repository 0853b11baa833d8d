//! iTunes Search API Data Transfer Objects
//!
//! Search and lookup share one response shape: a flat list of items whose
//! `wrapperType` says whether each is a collection (album) or a track.
//!
//! API Reference: https://performance-partners.apple.com/search-api

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub result_count: u32,
    #[serde(default)]
    pub results: Vec<Item>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// "collection", "track" or "artist"
    pub wrapper_type: Option<String>,
    pub collection_id: Option<u64>,
    pub track_id: Option<u64>,
    pub artist_id: Option<u64>,
    pub artist_name: Option<String>,
    pub collection_name: Option<String>,
    pub track_name: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub track_count: Option<u32>,
    pub primary_genre_name: Option<String>,
    /// ISO 8601, e.g. "2003-04-01T08:00:00Z"
    pub release_date: Option<String>,
    pub artwork_url100: Option<String>,
}

impl Item {
    pub fn is_collection(&self) -> bool {
        self.wrapper_type.as_deref() == Some("collection")
    }

    pub fn is_track(&self) -> bool {
        self.wrapper_type.as_deref() == Some("track")
    }
}

#[cfg(test)]
pub(crate) mod contract_tests {
    use super::*;

    /// `lookup?id=...&entity=song` for a two-track album
    pub const ALBUM_LOOKUP: &str = r#"{
        "resultCount": 3,
        "results": [
            {
                "wrapperType": "collection",
                "collectionType": "Album",
                "artistId": 5,
                "collectionId": 100,
                "artistName": "The White Stripes",
                "collectionName": "Elephant",
                "artworkUrl100": "https://is1.mzstatic.com/image/100x100bb.jpg",
                "trackCount": 2,
                "primaryGenreName": "Alternative",
                "releaseDate": "2003-04-01T08:00:00Z"
            },
            {
                "wrapperType": "track",
                "kind": "song",
                "artistId": 5,
                "collectionId": 100,
                "trackId": 2002,
                "artistName": "The White Stripes",
                "collectionName": "Elephant",
                "trackName": "Black Math",
                "discNumber": 1,
                "trackNumber": 2,
                "primaryGenreName": "Alternative"
            },
            {
                "wrapperType": "track",
                "kind": "song",
                "artistId": 5,
                "collectionId": 100,
                "trackId": 2001,
                "artistName": "The White Stripes",
                "collectionName": "Elephant",
                "trackName": "Seven Nation Army",
                "discNumber": 1,
                "trackNumber": 1,
                "primaryGenreName": "Alternative"
            }
        ]
    }"#;

    #[test]
    fn test_parse_lookup() {
        let response: SearchResponse = serde_json::from_str(ALBUM_LOOKUP).expect("Should parse");
        assert_eq!(response.result_count, 3);
        assert!(response.results[0].is_collection());
        assert!(response.results[1].is_track());
        assert_eq!(response.results[2].track_number, Some(1));
        assert_eq!(
            response.results[0].artwork_url100.as_deref(),
            Some("https://is1.mzstatic.com/image/100x100bb.jpg")
        );
    }

    #[test]
    fn test_parse_empty() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"resultCount": 0, "results": []}"#).unwrap();
        assert!(response.results.is_empty());
    }
}
