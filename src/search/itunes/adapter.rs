//! Adapter layer: Convert iTunes items to metadata collections

use super::dto;
use crate::metadata::{MetadataCollection, MetadataSource, TrackMetadata};

/// Distinct album ids in result order
pub fn collection_ids(response: dto::SearchResponse) -> Vec<u64> {
    let mut ids = Vec::new();
    for id in response.results.iter().filter_map(|i| i.collection_id) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Convert an album lookup (collection item plus its tracks) into one
/// record per track, ordered by disc and track number.
pub fn to_collection(response: dto::SearchResponse) -> MetadataCollection {
    let collection = response
        .results
        .iter()
        .find(|i| i.is_collection())
        .cloned()
        .unwrap_or_default();

    let template = TrackMetadata {
        album_artist: collection.artist_name.clone(),
        release: collection.collection_name.clone(),
        year: collection.release_date.as_deref().and_then(parse_year),
        genre: collection.primary_genre_name.clone(),
        art_url: collection.artwork_url100.as_deref().map(larger_artwork),
        source: MetadataSource::ITunes,
        ..Default::default()
    };

    let mut tracks: Vec<dto::Item> = response.results.into_iter().filter(|i| i.is_track()).collect();
    tracks.sort_by_key(|t| (t.disc_number.unwrap_or(1), t.track_number.unwrap_or(0)));

    let records = tracks
        .into_iter()
        .enumerate()
        .map(|(i, track)| TrackMetadata {
            artist: track.artist_name.or_else(|| template.album_artist.clone()),
            title: track.track_name,
            track: Some(i as u32 + 1),
            track_id: track.track_id.map(|id| id.to_string()),
            genre: track.primary_genre_name.or_else(|| template.genre.clone()),
            ..template.clone()
        })
        .collect();

    MetadataCollection::from_tracks(records)
}

/// Ask for a 600px image instead of the 100px thumbnail
fn larger_artwork(url: &str) -> String {
    url.replace("100x100", "600x600")
}

fn parse_year(date: &str) -> Option<u32> {
    date.get(..4).and_then(|y| y.parse().ok())
}
