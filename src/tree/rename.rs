//! Display-name formatting and on-disk renaming.
//!
//! [`Tree::format`] only changes display names and remembers the formatter;
//! [`Tree::rename`] expands the renamer template for each node, re-applies
//! that formatter and renames the backing entry, innermost first.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Tree, TreeError};
use crate::format::renamer::Renamer;
use crate::format::{FormatContext, Formatter};
use crate::model::{NodeId, NodeKind};

/// Appended to a name for the intermediate step of a two-step rename.
const SENTINEL: char = '_';

impl Tree {
    /// Format display names of `id` and everything below it.
    ///
    /// Children are formatted first. Metadata is not touched.
    pub fn format(&mut self, id: NodeId, formatter: Arc<Formatter>) -> Result<(), TreeError> {
        let (kind, children) = {
            let node = self.node(id)?;
            (node.kind(), node.children.clone())
        };
        for child in children {
            self.format(child, Arc::clone(&formatter))?;
        }
        let node = self.node_mut(id)?;
        node.name = formatter.format(Some(FormatContext::from(kind)), &node.name);
        node.formatter = Some(formatter);
        Ok(())
    }

    /// Rename `id` and everything below it using `renamer`.
    ///
    /// The tree root keeps its name; only its children are renamed. A name
    /// that expands to nothing or collides with another entry is kept as is.
    pub fn rename(&mut self, id: NodeId, renamer: &Renamer) -> Result<(), TreeError> {
        let (kind, children, parent) = {
            let node = self.node(id)?;
            (node.kind(), node.children.clone(), node.parent())
        };
        for child in children {
            if self.contains(child) {
                self.rename(child, renamer)?;
            }
        }
        let Some(parent) = parent else {
            return Ok(());
        };

        let mut name = renamer.render(kind, |field| self.field(id, field));
        if let Some(formatter) = self.node(id)?.formatter() {
            name = formatter.format(Some(FormatContext::from(kind)), &name);
        }
        let name = name.trim().to_string();
        if name.is_empty() {
            warn!(node = %id, "Template expanded to an empty name, keeping current name");
            return Ok(());
        }

        let (source, extension) = {
            let node = self.node(id)?;
            (node.path().to_path_buf(), node.extension().to_string())
        };
        let destination = self.node(parent)?.path().join(format!("{name}{extension}"));

        if destination == source {
            debug!(path = %source.display(), "Name unchanged");
        } else if destination.exists() && !same_entry_ignoring_case(&source, &destination) {
            warn!(
                path = %source.display(),
                existing = %destination.display(),
                "Rename target already exists, keeping current name"
            );
            return Ok(());
        } else {
            info!(from = %source.display(), to = %destination.display(), "Renaming");
            rename_via_sentinel(&source, &destination, kind)?;
        }

        let node = self.node_mut(id)?;
        node.name = name;
        node.path = destination;
        self.rebase(id);
        Ok(())
    }
}

fn same_entry_ignoring_case(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

/// Rename through an intermediate name so case-only changes take effect on
/// case-insensitive file systems.
fn rename_via_sentinel(source: &Path, destination: &Path, kind: NodeKind) -> Result<(), TreeError> {
    let mut step = destination.as_os_str().to_owned();
    step.push(SENTINEL.to_string());
    let step = PathBuf::from(step);

    fs::rename(source, &step).map_err(|e| TreeError::io(source, e))?;
    if let Err(e) = fs::rename(&step, destination) {
        // put the entry back where it was
        let _ = fs::rename(&step, source);
        return Err(TreeError::io(destination, e));
    }
    debug!(path = %destination.display(), ?kind, "Renamed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Casing;
    use crate::metadata::TrackMetadata;
    use crate::tree::{FileComparer, Node};
    use crate::test_utils::touch;
    use tempfile::tempdir;

    fn tagged(track: u32, title: &str) -> TrackMetadata {
        TrackMetadata {
            artist: Some("The White Stripes".into()),
            album_artist: Some("The White Stripes".into()),
            release: Some("Elephant".into()),
            title: Some(title.into()),
            track: Some(track),
            year: Some(2003),
            ..Default::default()
        }
    }

    fn release_tree(root: &Path) -> (Tree, NodeId) {
        let album = root.join("untitled");
        let mut tree = Tree::new(root, FileComparer::default()).unwrap();
        std::fs::create_dir_all(&album).unwrap();
        let release = tree.insert(tree.root(), Node::release(&album)).unwrap().unwrap();
        tree.insert(release, Node::file(touch(&album, "a.mp3"), tagged(1, "Seven Nation Army")))
            .unwrap();
        tree.insert(release, Node::file(touch(&album, "b.mp3"), tagged(2, "Black Math")))
            .unwrap();
        tree.insert(release, Node::file(touch(&album, "cover.jpg"), TrackMetadata::default()))
            .unwrap();
        (tree, release)
    }

    fn lower_underscore() -> Arc<Formatter> {
        let mut formatter = Formatter::default();
        formatter.track_casing = Casing::Lower;
        formatter.flat_casing = Casing::Lower;
        formatter.add(" ", "_").unwrap();
        Arc::new(formatter)
    }

    #[test]
    fn test_format_changes_names_not_metadata() {
        let dir = tempdir().unwrap();
        let (mut tree, release) = release_tree(dir.path());
        tree.format(release, lower_underscore()).unwrap();

        let t = tree.tracks(release).next().unwrap();
        assert_eq!(tree.node(t).unwrap().name(), "a");
        assert_eq!(tree.metadata(t).unwrap().title.as_deref(), Some("Seven Nation Army"));
        assert!(tree.node(release).unwrap().formatter().is_some());
        // nothing renamed on disk yet
        assert!(dir.path().join("untitled/a.mp3").exists());
    }

    #[test]
    fn test_rename_applies_templates_and_formatter() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let (mut tree, release) = release_tree(root);
        tree.format(release, lower_underscore()).unwrap();
        tree.rename(release, &Renamer::default()).unwrap();

        let album = root.join("The_White_Stripes-Elephant-2003");
        assert!(album.is_dir());
        assert!(album.join("01-the_white_stripes-seven_nation_army.mp3").is_file());
        assert!(album.join("02-the_white_stripes-black_math.mp3").is_file());
        assert!(album.join("00-the_white_stripes-elephant.jpg").is_file());
        assert!(!root.join("untitled").exists());

        // node paths follow the directory rename
        for t in tree.tracks(release).collect::<Vec<_>>() {
            assert!(tree.node(t).unwrap().path().starts_with(&album));
            assert!(tree.node(t).unwrap().path().exists());
        }
    }

    #[test]
    fn test_rename_without_formatter_uses_raw_template() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let (mut tree, release) = release_tree(root);
        let renamer = Renamer {
            track: "%Track% %Title%".into(),
            ..Renamer::default()
        };
        tree.rename(release, &renamer).unwrap();
        assert!(root
            .join("The White Stripes-Elephant-2003/01 Seven Nation Army.mp3")
            .is_file());
    }

    #[test]
    fn test_collision_keeps_old_name() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let (mut tree, release) = release_tree(root);
        let renamer = Renamer {
            track: "same".into(),
            ..Renamer::default()
        };
        tree.rename(release, &renamer).unwrap();

        let album = root.join("The White Stripes-Elephant-2003");
        assert!(album.join("same.mp3").is_file());
        let kept = tree
            .tracks(release)
            .filter(|t| tree.node(*t).unwrap().name() != "same")
            .count();
        assert_eq!(kept, 1);
    }

    #[test]
    fn test_root_is_not_renamed() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let (mut tree, _) = release_tree(root);
        tree.rename(tree.root(), &Renamer::default()).unwrap();
        assert!(root.is_dir());
        assert_eq!(tree.node(tree.root()).unwrap().path(), root);
    }
}
