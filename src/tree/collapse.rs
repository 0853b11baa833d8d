//! Flattening nested release directories.
//!
//! After collapsing, every track sits exactly two levels below the tree
//! root (`root/<release>/<track>`), emptied intermediate directories are
//! gone and non-audio clutter below the top level is discarded. Children
//! directly under the root are never moved, so nothing is pushed into the
//! root itself. Collapsing an already collapsed tree changes nothing.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{Tree, TreeError};
use crate::model::{NodeId, NodeKind};

/// Depth of the top-level release folders.
const RELEASE_LEVEL: usize = 1;
/// Depth tracks are collapsed to.
const TRACK_LEVEL: usize = 2;

impl Tree {
    /// Collapse a subtree. See the module docs for the resulting shape.
    pub fn collapse(&mut self, id: NodeId) -> Result<(), TreeError> {
        let (kind, depth, children) = {
            let node = self.node(id)?;
            (node.kind(), node.depth(), node.children.clone())
        };
        match kind {
            NodeKind::Release => {
                // children are deleted while iterating, walk a snapshot
                for child in children {
                    if self.contains(child) {
                        self.collapse(child)?;
                    }
                }
                if depth > RELEASE_LEVEL {
                    self.discard_untracked(id)?;
                    self.delete(id)?;
                }
            }
            NodeKind::Track => {
                if depth > TRACK_LEVEL {
                    self.move_up(id, depth - TRACK_LEVEL)?;
                }
            }
            NodeKind::Flat => {
                if depth > RELEASE_LEVEL {
                    debug!(path = %self.node(id)?.path().display(), "Discarding non-audio file");
                    self.delete(id)?;
                }
            }
        }
        Ok(())
    }

    /// Remove files in a release directory that the tree does not know
    /// about, such as symlinks, so the emptied directory can go.
    fn discard_untracked(&self, id: NodeId) -> Result<(), TreeError> {
        let node = self.node(id)?;
        let dir = node.path();
        let tracked: HashSet<PathBuf> = node
            .children
            .iter()
            .filter_map(|c| self.node(*c).ok())
            .map(|n| n.path().to_path_buf())
            .collect();

        let entries = fs::read_dir(dir).map_err(|e| TreeError::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| TreeError::io(dir, e))?;
            let path = entry.path();
            if tracked.contains(&path) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                continue;
            }
            debug!(path = %path.display(), "Discarding untracked entry");
            fs::remove_file(&path).map_err(|e| TreeError::io(&path, e))?;
        }
        Ok(())
    }

    /// Move a node `levels` directories up.
    ///
    /// When the destination name is already taken the node is treated as a
    /// duplicate and deleted instead. After a real move the node is
    /// registered with its new parent.
    pub fn move_up(&mut self, id: NodeId, levels: usize) -> Result<(), TreeError> {
        if levels == 0 {
            return Ok(());
        }
        if id == self.root {
            return Err(TreeError::RootNode("move"));
        }

        let mut target = self.node(id)?.parent().ok_or(TreeError::RootNode("move"))?;
        for _ in 0..levels {
            target = self.node(target)?.parent().ok_or(TreeError::RootNode("move"))?;
        }

        let (source, file_name) = {
            let node = self.node(id)?;
            (node.path().to_path_buf(), node.file_name())
        };
        let destination = self.node(target)?.path().join(&file_name);

        if destination.exists() {
            warn!(
                path = %source.display(),
                existing = %destination.display(),
                "Duplicate found while moving, deleting"
            );
            return self.delete(id);
        }

        info!(from = %source.display(), to = %destination.display(), "Moving");
        move_entry(&source, &destination).map_err(|e| TreeError::io(&source, e))?;

        self.node_mut(id)?.path = destination;
        self.rebase(id);
        self.add(target, id)
    }
}

/// Rename `from` to `to`, copying across devices when a plain rename fails.
pub(crate) fn move_entry(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // cross-device fallback only applies to files
    if from.is_file() {
        fs::copy(from, to)?;
        fs::remove_file(from)
    } else {
        fs::rename(from, to)
    }
}
