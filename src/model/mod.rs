//! Core data model shared by the tree, formatter and renamer.
//!
//! Defines the node classification ([`NodeKind`]), the arena handle
//! ([`NodeId`]) and the audio [`Encoding`] preference.
//!
//! # Classification
//!
//! A node's kind is a pure function of its extension:
//! - empty extension - a release (directory)
//! - recognized audio extension - a track
//! - anything else - a flat file (art, checksum, text)

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Extensions (lowercase, dot-inclusive) treated as playable audio.
pub const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".wma", ".ogg", ".flac", ".wav"];

/// Handle to a node stored in a [`crate::tree::Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node in the release tree represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A directory holding tracks, flat files and nested releases.
    Release,
    /// A playable audio file.
    Track,
    /// A non-audio file inside a release directory.
    Flat,
}

impl NodeKind {
    /// Classify a file by its lowercase, dot-inclusive extension. Files
    /// without one (`README`, `.DS_Store`) are flat files.
    pub fn from_extension(extension: &str) -> Self {
        if is_audio_extension(extension) {
            NodeKind::Track
        } else {
            NodeKind::Flat
        }
    }

    pub fn is_leaf(self) -> bool {
        !matches!(self, NodeKind::Release)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Release => "release",
            NodeKind::Track => "track",
            NodeKind::Flat => "flat file",
        };
        f.write_str(name)
    }
}

/// Check if an extension belongs to the audio set. Case-insensitive.
pub fn is_audio_extension(extension: &str) -> bool {
    AUDIO_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Lowercase, dot-inclusive extension of a path, or empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Target audio encoding for the optional transcode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Mp3,
    Flac,
    Wav,
    M4a,
}

impl Encoding {
    /// Dot-inclusive file extension for this encoding.
    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Mp3 => ".mp3",
            Encoding::Flac => ".flac",
            Encoding::Wav => ".wav",
            Encoding::M4a => ".m4a",
        }
    }

    /// Whether a file with this extension already matches the encoding.
    pub fn matches(self, extension: &str) -> bool {
        self.extension().eq_ignore_ascii_case(extension)
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "mp3" => Ok(Encoding::Mp3),
            "flac" => Ok(Encoding::Flac),
            "wav" => Ok(Encoding::Wav),
            "m4a" => Ok(Encoding::M4a),
            other => Err(format!("unknown encoding: {other}")),
        }
    }
}
