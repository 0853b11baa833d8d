//! Child ordering within a release.
//!
//! Non-audio children (flat files and nested releases) always sort ahead of
//! tracks; tracks are ordered by the configured [`CompareKey`], with the
//! file name breaking ties.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::NodeKind;

/// Which track field orders tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareKey {
    #[default]
    TrackNumber,
    Title,
}

/// The slice of a node the comparer looks at.
#[derive(Debug, Clone, Copy)]
pub struct SortEntry<'a> {
    pub kind: NodeKind,
    pub track: Option<u32>,
    pub title: Option<&'a str>,
    pub file_name: &'a str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileComparer {
    pub key: CompareKey,
}

impl FileComparer {
    pub fn new(key: CompareKey) -> Self {
        Self { key }
    }

    pub fn compare(&self, a: &SortEntry<'_>, b: &SortEntry<'_>) -> Ordering {
        let a_audio = a.kind == NodeKind::Track;
        let b_audio = b.kind == NodeKind::Track;
        match (a_audio, b_audio) {
            (false, true) => return Ordering::Less,
            (true, false) => return Ordering::Greater,
            (false, false) => return Ordering::Equal,
            (true, true) => {}
        }

        let by_key = match self.key {
            CompareKey::TrackNumber => a.track.unwrap_or(0).cmp(&b.track.unwrap_or(0)),
            CompareKey::Title => {
                let a_title = a.title.unwrap_or_default().to_lowercase();
                let b_title = b.title.unwrap_or_default().to_lowercase();
                a_title.cmp(&b_title)
            }
        };
        by_key.then_with(|| a.file_name.cmp(b.file_name))
    }
}
