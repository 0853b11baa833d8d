//! Adapter layer: Convert MusicBrainz DTOs to metadata collections
//!
//! This is the ONLY place where DTO types are converted to our types.
//! If MusicBrainz changes their response format, only this file and
//! dto.rs need to change.

use super::dto;
use crate::metadata::{MetadataCollection, MetadataSource, TrackMetadata};

/// Release ids from a recording search, in hit order, without repeats.
pub fn release_ids_from_recordings(search: dto::RecordingSearch) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for release in search.recordings.into_iter().flat_map(|r| r.releases) {
        if !ids.contains(&release.id) {
            ids.push(release.id);
        }
    }
    ids
}

pub fn release_ids(search: dto::ReleaseSearch) -> Vec<String> {
    search.releases.into_iter().map(|r| r.id).collect()
}

/// Convert a release lookup into one record per track.
///
/// Tracks are numbered 1.. across all media. A track without its own
/// artist credit is credited to the release artist.
pub fn to_collection(release: dto::Release) -> MetadataCollection {
    let album_artist = build_artist_string(&release.artist_credit);
    let album_artist_id = release.artist_credit.first().map(|c| c.artist.id.clone());
    let year = parse_year(release.date.as_deref());
    let release_type = release
        .release_group
        .as_ref()
        .and_then(|rg| rg.primary_type.clone());
    let genre = top_genre(&release.genres);

    let template = TrackMetadata {
        album_artist: album_artist.clone(),
        release: Some(release.title.clone()),
        year,
        genre,
        asin: release.asin.clone().filter(|a| !a.is_empty()),
        release_id: Some(release.id.clone()),
        release_type,
        source: MetadataSource::MusicBrainz,
        ..Default::default()
    };

    let mut records = Vec::new();
    for track in release.media.iter().flat_map(|m| &m.tracks) {
        let credited = (!track.artist_credit.is_empty()).then_some(&track.artist_credit);
        let title = track
            .title
            .clone()
            .or_else(|| track.recording.as_ref().and_then(|r| r.title.clone()));

        records.push(TrackMetadata {
            artist: credited
                .and_then(|c| build_artist_string(c))
                .or_else(|| album_artist.clone()),
            artist_id: credited
                .and_then(|c| c.first())
                .map(|c| c.artist.id.clone())
                .or_else(|| album_artist_id.clone()),
            title,
            track: Some(records.len() as u32 + 1),
            track_id: track.recording.as_ref().map(|r| r.id.clone()),
            ..template.clone()
        });
    }

    MetadataCollection::from_tracks(records)
}

/// Build a combined artist string from artist credits
fn build_artist_string(credits: &[dto::ArtistCredit]) -> Option<String> {
    if credits.is_empty() {
        return None;
    }

    let mut result = String::new();
    for credit in credits {
        // Use credited name if available, otherwise official name
        let name = credit.name.as_ref().unwrap_or(&credit.artist.name);
        result.push_str(name);

        if let Some(ref join) = credit.joinphrase {
            result.push_str(join);
        }
    }

    Some(result)
}

/// Year from YYYY, YYYY-MM or YYYY-MM-DD
fn parse_year(date: Option<&str>) -> Option<u32> {
    date.and_then(|d| d.split('-').next())
        .filter(|y| y.len() == 4)
        .and_then(|y| y.parse().ok())
}

/// Most-voted genre
fn top_genre(genres: &[dto::Genre]) -> Option<String> {
    genres
        .iter()
        .max_by_key(|g| g.count)
        .map(|g| g.name.clone())
}
