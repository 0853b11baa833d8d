//! Test utilities and fixtures for release-minder tests.
//!
//! Helpers to lay out release directories on disk and to build metadata
//! records and selections without repeating every field.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{release_dir, selection};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let album = release_dir(dir.path(), "album", &["01.mp3", "02.mp3"]);
//! let chosen = selection("Artist", "Album", 2);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::metadata::{MetadataCollection, MetadataSource, TrackMetadata};

/// Smallest byte sequence `image::guess_format` recognizes as PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// Create `dir/name` (and `dir`) with content unique to the name.
///
/// Returns the file path.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("Failed to create directory");
    let path = dir.join(name);
    fs::write(&path, format!("audio bytes of {name}")).expect("Failed to write file");
    path
}

/// Create `root/name` holding the given files. Returns the directory.
pub fn release_dir(root: &Path, name: &str, files: &[&str]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("Failed to create directory");
    for file in files {
        touch(&dir, file);
    }
    dir
}

/// A record with only the track number set.
pub fn track(number: Option<u32>) -> TrackMetadata {
    TrackMetadata {
        track: number,
        ..Default::default()
    }
}

/// A synthetic candidate of `tracks` records for one release.
pub fn selection(artist: &str, release: &str, tracks: u32) -> MetadataCollection {
    let records = (1..=tracks)
        .map(|n| TrackMetadata {
            artist: Some(artist.to_string()),
            album_artist: Some(artist.to_string()),
            release: Some(release.to_string()),
            title: Some(format!("Song {n}")),
            track: Some(n),
            year: Some(2003),
            genre: Some("Rock".to_string()),
            source: MetadataSource::MusicBrainz,
            ..Default::default()
        })
        .collect();
    MetadataCollection::from_tracks(records)
}
