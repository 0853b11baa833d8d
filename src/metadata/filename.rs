//! Heuristics that recover track numbers and artists from file names.
//!
//! Untagged rips are usually named `01-Artist-Title.mp3` or
//! `01 Title.mp3`. The [`FilenamePolicy`] decides, per field, whether a
//! value found in the name overrides the tag, only fills a gap, or is
//! ignored.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TrackMetadata;

/// How a value parsed from the file name combines with the tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameHint {
    /// File name wins whenever it yields a value.
    Override,
    /// File name is used only when the tag has no value.
    Fallback,
    /// File name is not consulted.
    Ignore,
}

impl FilenameHint {
    fn merge<T>(self, tag: Option<T>, parsed: impl FnOnce() -> Option<T>) -> Option<T> {
        match self {
            FilenameHint::Override => parsed().or(tag),
            FilenameHint::Fallback => tag.or_else(parsed),
            FilenameHint::Ignore => tag,
        }
    }
}

/// Per-field precedence between file name and tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilenamePolicy {
    pub track: FilenameHint,
    pub artist: FilenameHint,
}

impl Default for FilenamePolicy {
    fn default() -> Self {
        Self {
            track: FilenameHint::Override,
            artist: FilenameHint::Fallback,
        }
    }
}

impl FilenamePolicy {
    /// Fold file-name hints for `stem` into `metadata`. The title falls back
    /// to the stem itself.
    pub fn apply(&self, stem: &str, metadata: &mut TrackMetadata) {
        metadata.track = self.track.merge(metadata.track, || parse_track(stem));
        metadata.artist = self.artist.merge(metadata.artist.take(), || parse_artist(stem));
        if metadata.title.is_none() {
            metadata.title = Some(stem.to_string());
        }
        debug!(
            stem,
            track = ?metadata.track,
            artist = ?metadata.artist,
            "Parsed file name"
        );
    }
}

/// One- or two-digit number that stands alone and is followed by a
/// separator. The trailing separator stands in for a lookahead.
static TRACK_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\W)(?P<track>[0-9]{1,2})\W").expect("valid track pattern"));

/// Leading track number with its separator, e.g. `03. ` or `01-`.
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[0-9]+[.\s]*(?:-\s*)?").expect("valid number pattern"));

/// First hyphen-terminated segment.
static ARTIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?P<artist>[^-]*[^-\s])\s*-").expect("valid artist pattern"));

/// First one- or two-digit run that stands alone and is followed by a
/// separator, e.g. `01` in `01-song` or `7` in `cd 7 - intro`.
pub fn parse_track(stem: &str) -> Option<u32> {
    TRACK_NUMBER
        .captures(stem)
        .and_then(|caps| caps["track"].parse().ok())
}

/// Artist segment of a hyphen-separated name such as `01-Artist-Title`.
pub fn parse_artist(stem: &str) -> Option<String> {
    let rest = LEADING_NUMBER.replace(stem, "");
    ARTIST
        .captures(&rest)
        .map(|caps| caps["artist"].to_string())
}
