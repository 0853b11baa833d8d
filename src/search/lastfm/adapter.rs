//! Adapter layer: Convert Last.fm DTOs to metadata collections

use chrono::NaiveDateTime;

use super::dto;
use crate::metadata::{MetadataCollection, MetadataSource, TrackMetadata};

/// (artist, album) pairs from an album search
pub fn album_matches(response: dto::AlbumSearchResponse) -> Vec<(String, String)> {
    response
        .results
        .map(|r| r.albummatches.album.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(|a| (a.artist, a.name))
        .collect()
}

/// (artist, album) pairs from an artist's top albums
pub fn top_albums(response: dto::TopAlbumsResponse) -> Vec<(String, String)> {
    response
        .topalbums
        .map(|t| t.album.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(|a| (a.artist.name, a.name))
        .collect()
}

/// The (artist, album) a track was released on
pub fn track_album(response: dto::TrackInfoResponse) -> Option<(String, String)> {
    response
        .track
        .and_then(|t| t.album)
        .map(|a| (a.artist, a.title))
}

/// Convert album info into one record per track, numbered by position.
pub fn to_collection(response: dto::AlbumInfoResponse) -> Option<MetadataCollection> {
    let album = response.album?;

    let template = TrackMetadata {
        artist: Some(album.artist.clone()),
        album_artist: Some(album.artist.clone()),
        release: Some(album.name.clone()),
        year: album
            .wiki
            .as_ref()
            .and_then(|w| w.published.as_deref())
            .and_then(parse_published_year),
        genre: first_tag(&album.tags),
        art_url: best_image(&album.image),
        release_id: album.mbid.clone().filter(|m| !m.is_empty()),
        source: MetadataSource::Lastfm,
        ..Default::default()
    };

    let tracks = album.tracks.map(|t| t.track.into_vec()).unwrap_or_default();
    let records = tracks
        .into_iter()
        .enumerate()
        .map(|(i, track)| TrackMetadata {
            artist: track.artist.map(|a| a.name).or_else(|| template.artist.clone()),
            title: Some(track.name),
            track: Some(i as u32 + 1),
            ..template.clone()
        })
        .collect();

    Some(MetadataCollection::from_tracks(records))
}

/// Largest non-empty image, preferring mega over extralarge over large
fn best_image(images: &[dto::Image]) -> Option<String> {
    ["mega", "extralarge", "large", "medium", "small"]
        .iter()
        .find_map(|size| {
            images
                .iter()
                .find(|i| i.size == *size && !i.url.is_empty())
                .map(|i| i.url.clone())
        })
}

/// Name of the first tag in `{"tag": [...]}` or `{"tag": {...}}`
fn first_tag(tags: &serde_json::Value) -> Option<String> {
    let tag = tags.get("tag")?;
    let first = match tag {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    first.get("name")?.as_str().map(str::to_string)
}

fn parse_published_year(published: &str) -> Option<u32> {
    NaiveDateTime::parse_from_str(published.trim(), "%d %b %Y, %H:%M")
        .ok()
        .map(|d| d.format("%Y").to_string())
        .and_then(|y| y.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Field, FieldAccess};
    use crate::search::lastfm::dto::contract_tests::ALBUM_INFO;

    #[test]
    fn test_album_info_to_collection() {
        let response: dto::AlbumInfoResponse = serde_json::from_str(ALBUM_INFO).unwrap();
        let collection = to_collection(response).unwrap();

        assert_eq!(collection.track_count(), 2);
        assert_eq!(collection.field(Field::Artist).as_deref(), Some("The White Stripes"));
        assert_eq!(collection.field(Field::Release).as_deref(), Some("Elephant"));
        assert_eq!(collection.field(Field::Genre).as_deref(), Some("garage rock"));
        assert_eq!(collection.field(Field::ArtUrl).as_deref(), Some("https://img/xl.png"));
        assert_eq!(collection.field(Field::Year).as_deref(), Some("2003"));
        assert_eq!(collection.get(1).unwrap().title.as_deref(), Some("Black Math"));
        assert_eq!(collection.get(1).unwrap().track, Some(2));
    }

    #[test]
    fn test_missing_album_is_none() {
        let response: dto::AlbumInfoResponse =
            serde_json::from_str(r#"{"error": 6, "message": "Album not found"}"#).unwrap();
        assert!(to_collection(response).is_none());
    }

    #[test]
    fn test_published_year() {
        assert_eq!(parse_published_year("01 Apr 2003, 00:00"), Some(2003));
        assert_eq!(parse_published_year("sometime"), None);
    }

    #[test]
    fn test_first_tag_shapes() {
        let one = serde_json::json!({"tag": {"name": "rock"}});
        assert_eq!(first_tag(&one).as_deref(), Some("rock"));
        assert_eq!(first_tag(&serde_json::json!("")), None);
    }
}
