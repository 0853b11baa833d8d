//! Track metadata records and release-level aggregates.
//!
//! A [`TrackMetadata`] holds the tag fields of one audio file. A
//! [`MetadataCollection`] aggregates an ordered list of records: scalar
//! reads come from the designated lead record, writes fan out to every
//! record. Search providers return collections, and a selected collection
//! is what gets published onto a release.
//!
//! # Features
//! - Text access to every field through [`Field`] (track numbers zero-padded)
//! - Aggregate delegation with an explicit lead index
//! - Provider stamping via [`MetadataSource`]
//! - Text normalization of all free-text fields through a [`Formatter`]

pub mod codec;
pub mod filename;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::format::Formatter;

/// Errors from parsing or persisting metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Invalid {field} value: {value:?}")]
    InvalidNumber { field: Field, value: String },

    #[error("Failed to read tags from {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write tags to {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Which lookup service produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    MusicBrainz,
    Lastfm,
    ITunes,
    #[default]
    Unspecified,
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetadataSource::MusicBrainz => "MusicBrainz",
            MetadataSource::Lastfm => "Last.fm",
            MetadataSource::ITunes => "iTunes",
            MetadataSource::Unspecified => "unspecified",
        };
        f.write_str(name)
    }
}

/// Addressable text fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Artist,
    AlbumArtist,
    Release,
    Title,
    Track,
    Year,
    Genre,
    ArtUrl,
    Comment,
    Asin,
    ReleaseId,
    ArtistId,
    TrackId,
    ReleaseType,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::Artist,
        Field::AlbumArtist,
        Field::Release,
        Field::Title,
        Field::Track,
        Field::Year,
        Field::Genre,
        Field::ArtUrl,
        Field::Comment,
        Field::Asin,
        Field::ReleaseId,
        Field::ArtistId,
        Field::TrackId,
        Field::ReleaseType,
    ];

    /// Fields that hold free text and are normalized by [`Formatter`].
    pub const TEXT: [Field; 6] = [
        Field::Artist,
        Field::AlbumArtist,
        Field::Release,
        Field::Title,
        Field::Genre,
        Field::ReleaseType,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Artist => "artist",
            Field::AlbumArtist => "album artist",
            Field::Release => "release",
            Field::Title => "title",
            Field::Track => "track number",
            Field::Year => "release year",
            Field::Genre => "genre",
            Field::ArtUrl => "art url",
            Field::Comment => "comment",
            Field::Asin => "asin",
            Field::ReleaseId => "release id",
            Field::ArtistId => "artist id",
            Field::TrackId => "track id",
            Field::ReleaseType => "release type",
        };
        f.write_str(name)
    }
}

/// Read/write access to metadata by [`Field`].
///
/// Implemented by single records and by aggregates, so callers can treat a
/// track and a whole release the same way.
pub trait FieldAccess {
    /// Current text value of a field, `None` when unset.
    fn field(&self, field: Field) -> Option<String>;

    /// Set a field from text. `None` or blank clears it.
    fn set_field(&mut self, field: Field, value: Option<&str>) -> Result<(), MetadataError>;

    /// Number of tracks this metadata describes.
    fn track_count(&self) -> usize;
}

/// Tag data of a single track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub release: Option<String>,
    pub title: Option<String>,
    pub track: Option<u32>,
    pub year: Option<u32>,
    pub genre: Option<String>,
    pub art_url: Option<String>,
    pub comment: Option<String>,
    /// Amazon catalog number.
    pub asin: Option<String>,
    pub release_id: Option<String>,
    pub artist_id: Option<String>,
    pub track_id: Option<String>,
    pub release_type: Option<String>,
    #[serde(default)]
    pub source: MetadataSource,
}

impl TrackMetadata {
    fn text_slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::Artist => Some(&mut self.artist),
            Field::AlbumArtist => Some(&mut self.album_artist),
            Field::Release => Some(&mut self.release),
            Field::Title => Some(&mut self.title),
            Field::Genre => Some(&mut self.genre),
            Field::ArtUrl => Some(&mut self.art_url),
            Field::Comment => Some(&mut self.comment),
            Field::Asin => Some(&mut self.asin),
            Field::ReleaseId => Some(&mut self.release_id),
            Field::ArtistId => Some(&mut self.artist_id),
            Field::TrackId => Some(&mut self.track_id),
            Field::ReleaseType => Some(&mut self.release_type),
            Field::Track | Field::Year => None,
        }
    }

    /// Track number as two-digit text ("03").
    pub fn track_text(&self) -> Option<String> {
        self.track.map(|n| format!("{n:02}"))
    }

    /// Normalize all free-text fields with the metadata casing.
    pub fn format(&mut self, formatter: &Formatter) {
        for field in Field::TEXT {
            if let Some(slot) = self.text_slot(field)
                && let Some(value) = slot.as_mut()
            {
                *value = formatter.format(None, value);
            }
        }
    }
}

impl FieldAccess for TrackMetadata {
    fn field(&self, field: Field) -> Option<String> {
        match field {
            Field::Artist => self.artist.clone(),
            Field::AlbumArtist => self.album_artist.clone(),
            Field::Release => self.release.clone(),
            Field::Title => self.title.clone(),
            Field::Track => self.track_text(),
            Field::Year => self.year.map(|y| y.to_string()),
            Field::Genre => self.genre.clone(),
            Field::ArtUrl => self.art_url.clone(),
            Field::Comment => self.comment.clone(),
            Field::Asin => self.asin.clone(),
            Field::ReleaseId => self.release_id.clone(),
            Field::ArtistId => self.artist_id.clone(),
            Field::TrackId => self.track_id.clone(),
            Field::ReleaseType => self.release_type.clone(),
        }
    }

    fn set_field(&mut self, field: Field, value: Option<&str>) -> Result<(), MetadataError> {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        match field {
            Field::Track => self.track = value.map(|v| parse_number(field, v)).transpose()?,
            Field::Year => self.year = value.map(|v| parse_number(field, v)).transpose()?,
            other => {
                if let Some(slot) = self.text_slot(other) {
                    *slot = value.map(str::to_string);
                }
            }
        }
        Ok(())
    }

    fn track_count(&self) -> usize {
        1
    }
}

/// Parse a track number or year. Accepts "3", "03" and "3/12" forms.
pub fn parse_number(field: Field, value: &str) -> Result<u32, MetadataError> {
    let head = value.split('/').next().unwrap_or(value).trim();
    head.parse::<u32>()
        .map_err(|_| MetadataError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

/// Ordered aggregate of track records with an explicit lead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCollection {
    items: Vec<TrackMetadata>,
    lead: usize,
}

impl MetadataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(items: Vec<TrackMetadata>) -> Self {
        Self { items, lead: 0 }
    }

    /// Append a record. The first record added becomes the lead.
    pub fn add(&mut self, record: TrackMetadata) {
        self.items.push(record);
    }

    /// Record at a position, if any.
    pub fn get(&self, index: usize) -> Option<&TrackMetadata> {
        self.items.get(index)
    }

    /// The lead record that scalar reads delegate to.
    pub fn first(&self) -> Option<&TrackMetadata> {
        self.items.get(self.lead)
    }

    pub fn lead_index(&self) -> usize {
        self.lead
    }

    /// Designate another record as lead. Out-of-range indices are ignored.
    pub fn set_lead(&mut self, index: usize) {
        if index < self.items.len() {
            self.lead = index;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackMetadata> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn source(&self) -> MetadataSource {
        self.first().map(|m| m.source).unwrap_or_default()
    }

    /// Stamp every record with the producing service.
    pub fn set_source(&mut self, source: MetadataSource) {
        for item in &mut self.items {
            item.source = source;
        }
    }

    /// Normalize the free-text fields of every record.
    pub fn format(&mut self, formatter: &Formatter) {
        for item in &mut self.items {
            item.format(formatter);
        }
    }
}

impl FieldAccess for MetadataCollection {
    fn field(&self, field: Field) -> Option<String> {
        self.first().and_then(|m| m.field(field))
    }

    fn set_field(&mut self, field: Field, value: Option<&str>) -> Result<(), MetadataError> {
        for item in &mut self.items {
            item.set_field(field, value)?;
        }
        Ok(())
    }

    fn track_count(&self) -> usize {
        self.items.len()
    }
}

impl fmt::Display for MetadataCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |field| self.field(field).unwrap_or_default();
        writeln!(f, "[Source]: {}", self.source())?;
        let artist = self
            .field(Field::AlbumArtist)
            .or_else(|| self.field(Field::Artist))
            .unwrap_or_default();
        writeln!(f, "[Artist]: {artist}")?;
        writeln!(f, "[Album]: {}", show(Field::Release))?;
        writeln!(f, "[Type]: {}", show(Field::ReleaseType))?;
        writeln!(f, "[ReleaseYear]: {}", show(Field::Year))?;
        writeln!(f, "[Genre]: {}", show(Field::Genre))?;
        writeln!(f, "[HasImage]: {}", !show(Field::ArtUrl).is_empty())?;
        writeln!(f, "[TrackCount]: {}", self.track_count())?;
        writeln!(f, "[ASIN]: {}", show(Field::Asin))?;
        write!(f, "[Tracks]:")?;
        for item in &self.items {
            write!(
                f,
                "\n[{}]{}",
                item.track_text().unwrap_or_default(),
                item.title.as_deref().unwrap_or_default()
            )?;
        }
        Ok(())
    }
}
