//! Building a [`Tree`] from a directory on disk.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use super::{FileComparer, Node, Tree, TreeError};
use crate::metadata::codec::TagCodec;
use crate::metadata::filename::FilenamePolicy;
use crate::metadata::{Field, TrackMetadata};
use crate::model::{Encoding, NodeKind, extension_of};

/// Walks a directory and assembles the release tree.
///
/// Within each directory sub-directories come first, then files, each in
/// name order; that is also the order members are folded into a release.
pub struct TreeBuilder {
    codec: Arc<dyn TagCodec>,
    policy: FilenamePolicy,
    comparer: FileComparer,
    encoding: Option<Encoding>,
}

impl TreeBuilder {
    pub fn new(codec: Arc<dyn TagCodec>) -> Self {
        Self {
            codec,
            policy: FilenamePolicy::default(),
            comparer: FileComparer::default(),
            encoding: None,
        }
    }

    pub fn filename_policy(mut self, policy: FilenamePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn comparer(mut self, comparer: FileComparer) -> Self {
        self.comparer = comparer;
        self
    }

    /// Target encoding recorded on every track.
    pub fn encoding(mut self, encoding: Option<Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn build(&self, root: &Path) -> Result<Tree, TreeError> {
        let mut tree = Tree::new(root, self.comparer)?;
        let mut index: HashMap<PathBuf, _> = HashMap::from([(root.to_path_buf(), tree.root())]);
        let mut releases = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by(directories_first)
            .into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            // parent was skipped, so is everything below it
            let Some(parent) = path.parent().and_then(|p| index.get(p)).copied() else {
                continue;
            };

            if entry.file_type().is_dir() {
                if let Some(id) = tree.insert(parent, Node::release(path))? {
                    index.insert(path.to_path_buf(), id);
                    releases.push(id);
                }
            } else if entry.file_type().is_file() {
                let metadata = match NodeKind::from_extension(&extension_of(path)) {
                    NodeKind::Track => self.read_track(path),
                    _ => TrackMetadata::default(),
                };
                tree.insert(parent, Node::file(path, metadata).with_encoding(self.encoding))?;
            }
        }

        // innermost releases first, so nested folders name themselves
        for release in releases.into_iter().rev() {
            if tree.field(release, Field::Release).is_none() {
                let name = tree.node(release)?.name().to_string();
                tree.set_field(release, Field::Release, Some(&name))?;
            }
        }

        info!(
            root = %root.display(),
            releases = tree.releases(tree.root()).count(),
            "Built release tree"
        );
        Ok(tree)
    }

    fn read_track(&self, path: &Path) -> TrackMetadata {
        let mut metadata = self.codec.read_tag(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Failed to read tags, starting empty");
            TrackMetadata::default()
        });
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            self.policy.apply(stem, &mut metadata);
        }
        metadata
    }
}

fn directories_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    b_dir
        .cmp(&a_dir)
        .then_with(|| a.file_name().cmp(b.file_name()))
}
