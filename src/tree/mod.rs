//! The release tree: directories, tracks and flat files as one hierarchy.
//!
//! Nodes live in an arena owned by [`Tree`] and refer to each other by
//! [`NodeId`]. Every non-root node has exactly one parent and appears in
//! that parent's child list exactly once. Children are kept sorted by the
//! tree's [`FileComparer`].
//!
//! # Metadata delegation
//!
//! - a track reads and writes its own [`TrackMetadata`]
//! - a release reads from its lead member and fans writes out to every member
//! - a flat file reads from its parent release and cannot be written
//!
//! Members are the tracks and nested releases folded into a release, in
//! insertion order. The lead is stored explicitly and is the first member
//! added.
//!
//! # Features
//! - Add / Remove / Delete with the backing file system kept in step
//! - Collapse and Move (see [`collapse`])
//! - Format and Rename (see [`rename`])
//! - Lazy track and release enumeration

pub mod build;
pub mod collapse;
pub mod compare;
pub mod rename;

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::format::Formatter;
use crate::metadata::{Field, FieldAccess, MetadataCollection, MetadataError, TrackMetadata};
use crate::model::{Encoding, NodeId, NodeKind, extension_of};

pub use build::TreeBuilder;
pub use compare::{CompareKey, FileComparer, SortEntry};

/// Errors from tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("Index {index} out of range for release with {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Operation '{op}' is not supported for {kind} nodes")]
    Unsupported { op: &'static str, kind: NodeKind },

    #[error("Operation '{0}' is not allowed on the tree root")]
    RootNode(&'static str),

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl TreeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// One release, track or flat file.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    path: PathBuf,
    name: String,
    extension: String,
    depth: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    members: Vec<NodeId>,
    lead: Option<NodeId>,
    metadata: TrackMetadata,
    formatter: Option<Arc<Formatter>>,
    encoding: Option<Encoding>,
}

impl Node {
    /// A release backed by the directory at `path`.
    pub fn release(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::with_parts(NodeKind::Release, path, name, String::new(), TrackMetadata::default())
    }

    /// A track or flat file backed by the file at `path`.
    pub fn file(path: impl Into<PathBuf>, metadata: TrackMetadata) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(&path);
        Self::with_parts(NodeKind::from_extension(&extension), path, name, extension, metadata)
    }

    fn with_parts(
        kind: NodeKind,
        path: PathBuf,
        name: String,
        extension: String,
        metadata: TrackMetadata,
    ) -> Self {
        Self {
            kind,
            path,
            name,
            extension,
            depth: 0,
            parent: None,
            children: Vec::new(),
            members: Vec::new(),
            lead: None,
            metadata,
            formatter: None,
            encoding: None,
        }
    }

    pub fn with_encoding(mut self, encoding: Option<Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name without extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Name plus extension as it should appear on disk.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.name, self.extension)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn formatter(&self) -> Option<&Arc<Formatter>> {
        self.formatter.as_ref()
    }

    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    pub fn exists(&self) -> bool {
        match self.kind() {
            NodeKind::Release => self.path.is_dir(),
            _ => self.path.is_file(),
        }
    }
}

/// Arena of nodes rooted at one directory.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    comparer: FileComparer,
}

impl Tree {
    /// An empty tree rooted at an existing directory.
    pub fn new(root: impl Into<PathBuf>, comparer: FileComparer) -> Result<Self, TreeError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(TreeError::NotADirectory(root));
        }
        Ok(Self {
            nodes: vec![Some(Node::release(root))],
            root: NodeId(0),
            comparer,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn comparer(&self) -> FileComparer {
        self.comparer
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).ok().map(Node::kind)
    }

    /// Allocate `node` and add it under `parent`.
    ///
    /// Returns `None` without allocating when the backing entry does not
    /// exist on disk.
    pub fn insert(&mut self, parent: NodeId, node: Node) -> Result<Option<NodeId>, TreeError> {
        if !node.exists() {
            debug!(path = %node.path.display(), "Skipping missing entry");
            return Ok(None);
        }
        self.require_release(parent, "add")?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(node));
        self.add(parent, id)?;
        Ok(Some(id))
    }

    fn require_release(&self, id: NodeId, op: &'static str) -> Result<&Node, TreeError> {
        let node = self.node(id)?;
        match node.kind() {
            NodeKind::Release => Ok(node),
            kind => Err(TreeError::Unsupported { op, kind }),
        }
    }

    /// Attach `child` to `parent`, folding it into the aggregate and
    /// re-sorting. No-op when the child's backing entry is missing.
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let parent_depth = self.require_release(parent, "add")?.depth;
        let (exists, old_parent, kind) = {
            let node = self.node(child)?;
            (node.exists(), node.parent, node.kind())
        };
        if !exists {
            return Ok(());
        }
        if let Some(old) = old_parent
            && old != parent
        {
            self.remove(old, child)?;
        }

        let release = self.node_mut(parent)?;
        if kind != NodeKind::Flat && !release.members.contains(&child) {
            release.members.push(child);
            release.lead.get_or_insert(child);
        }
        let inserted = !release.children.contains(&child);
        if inserted {
            release.children.push(child);
        }

        self.node_mut(child)?.parent = Some(parent);
        self.set_depth(child, parent_depth + 1);
        if inserted {
            self.sort_children(parent);
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The backing entry is left alone.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.require_release(parent, "remove")?;
        let release = self.node_mut(parent)?;
        release.children.retain(|c| *c != child);
        release.members.retain(|c| *c != child);
        if release.lead == Some(child) {
            release.lead = release.members.first().copied();
        }
        if let Ok(node) = self.node_mut(child)
            && node.parent == Some(parent)
        {
            node.parent = None;
        }
        Ok(())
    }

    /// Remove a node and its backing entry. Releases delete their children
    /// first, then the (now empty) directory.
    pub fn delete(&mut self, id: NodeId) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::RootNode("delete"));
        }
        let (kind, children, parent, path) = {
            let node = self.node(id)?;
            (node.kind(), node.children.clone(), node.parent, node.path.clone())
        };
        for child in children {
            self.delete(child)?;
        }

        let removed = match kind {
            NodeKind::Release => fs::remove_dir(&path),
            _ => fs::remove_file(&path),
        };
        match removed {
            Ok(()) => info!(path = %path.display(), "Deleted"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(TreeError::io(path, e)),
        }

        if let Some(parent) = parent {
            self.remove(parent, id)?;
        }
        self.nodes[id.0] = None;
        Ok(())
    }

    /// Child at `index`. A leaf returns itself for any index.
    pub fn get(&self, id: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let node = self.node(id)?;
        if node.kind().is_leaf() {
            return Ok(id);
        }
        node.children
            .get(index)
            .copied()
            .ok_or(TreeError::IndexOutOfRange {
                index,
                len: node.children.len(),
            })
    }

    /// Ordered children of a release.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(&self.require_release(id, "children")?.children)
    }

    /// Number of direct track children; 1 for a track, 0 for a flat file.
    pub fn count(&self, id: NodeId) -> Result<usize, TreeError> {
        let node = self.node(id)?;
        Ok(match node.kind() {
            NodeKind::Release => self.tracks(id).count(),
            NodeKind::Track => 1,
            NodeKind::Flat => 0,
        })
    }

    /// Tracks directly below `id`, in position order. A track yields itself.
    pub fn tracks(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.enumerate(id, NodeKind::Track)
    }

    /// Releases directly below `id`, in position order.
    pub fn releases(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let children = match self.node(id) {
            Ok(node) if node.kind() == NodeKind::Release => node.children.as_slice(),
            _ => &[],
        };
        children
            .iter()
            .copied()
            .filter(move |c| self.kind(*c) == Some(NodeKind::Release))
    }

    fn enumerate(&self, id: NodeId, wanted: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        let node = self.node(id).ok();
        let own = node.filter(|n| n.kind() == wanted).map(|_| id);
        let children = match node {
            Some(n) if n.kind() == NodeKind::Release => n.children.as_slice(),
            _ => &[],
        };
        own.into_iter().chain(
            children
                .iter()
                .copied()
                .filter(move |c| self.kind(*c) == Some(wanted)),
        )
    }

    /// Read a field through the node's delegation rule.
    pub fn field(&self, id: NodeId, field: Field) -> Option<String> {
        let node = self.node(id).ok()?;
        match node.kind() {
            NodeKind::Track => node.metadata.field(field),
            NodeKind::Release => node.lead.and_then(|lead| self.field(lead, field)),
            NodeKind::Flat => node.parent.and_then(|p| self.field(p, field)),
        }
    }

    /// Write a field through the node's delegation rule.
    pub fn set_field(&mut self, id: NodeId, field: Field, value: Option<&str>) -> Result<(), TreeError> {
        let node = self.node(id)?;
        match node.kind() {
            NodeKind::Track => self.node_mut(id)?.metadata.set_field(field, value)?,
            NodeKind::Release => {
                for member in node.members.clone() {
                    self.set_field(member, field, value)?;
                }
            }
            kind => return Err(TreeError::Unsupported { op: "set_field", kind }),
        }
        Ok(())
    }

    /// Tag record of a track.
    pub fn metadata(&self, id: NodeId) -> Result<&TrackMetadata, TreeError> {
        let node = self.node(id)?;
        match node.kind() {
            NodeKind::Track => Ok(&node.metadata),
            kind => Err(TreeError::Unsupported { op: "metadata", kind }),
        }
    }

    /// Replace the tag record of a track.
    pub fn set_metadata(&mut self, id: NodeId, metadata: TrackMetadata) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        match node.kind() {
            NodeKind::Track => {
                node.metadata = metadata;
                Ok(())
            }
            kind => Err(TreeError::Unsupported { op: "set_metadata", kind }),
        }
    }

    /// Number of records aggregated by a node: 1 for a track, the member
    /// count for a release.
    pub fn track_count(&self, id: NodeId) -> usize {
        match self.node(id) {
            Ok(node) if node.kind() == NodeKind::Release => node.members.len(),
            Ok(node) if node.kind() == NodeKind::Track => 1,
            _ => 0,
        }
    }

    /// Snapshot of the direct tracks' records, in position order.
    pub fn aggregate(&self, id: NodeId) -> MetadataCollection {
        MetadataCollection::from_tracks(
            self.tracks(id)
                .filter_map(|t| self.metadata(t).ok().cloned())
                .collect(),
        )
    }

    /// Change the backing path of a leaf, e.g. after transcoding.
    pub fn relocate(&mut self, id: NodeId, path: PathBuf) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if !node.kind().is_leaf() {
            return Err(TreeError::Unsupported {
                op: "relocate",
                kind: node.kind(),
            });
        }
        node.name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        node.extension = extension_of(&path);
        node.kind = NodeKind::from_extension(&node.extension);
        node.path = path;
        if let Some(parent) = node.parent {
            self.sort_children(parent);
        }
        Ok(())
    }

    fn set_depth(&mut self, id: NodeId, depth: usize) {
        let Ok(node) = self.node_mut(id) else {
            return;
        };
        node.depth = depth;
        let children = node.children.clone();
        for child in children {
            self.set_depth(child, depth + 1);
        }
    }

    /// Recompute descendant paths from `id`'s path.
    pub(crate) fn rebase(&mut self, id: NodeId) {
        let Ok(node) = self.node(id) else {
            return;
        };
        let base = node.path.clone();
        for child in node.children.clone() {
            if let Ok(child_node) = self.node_mut(child) {
                child_node.path = base.join(child_node.file_name());
            }
            self.rebase(child);
        }
    }

    fn sort_children(&mut self, parent: NodeId) {
        let Ok(node) = self.node(parent) else {
            return;
        };
        let mut children = node.children.clone();
        children.sort_by(|a, b| match (self.sort_entry(*a), self.sort_entry(*b)) {
            (Some(x), Some(y)) => self.comparer.compare(&x, &y),
            _ => std::cmp::Ordering::Equal,
        });
        if let Ok(node) = self.node_mut(parent) {
            node.children = children;
        }
    }

    fn sort_entry(&self, id: NodeId) -> Option<SortEntry<'_>> {
        let node = self.node(id).ok()?;
        Some(SortEntry {
            kind: node.kind(),
            track: node.metadata.track,
            title: node.metadata.title.as_deref(),
            file_name: node
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&node.name),
        })
    }

    /// Indented listing of the tree, one node per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_into(self.root, &mut out);
        out
    }

    fn outline_into(&self, id: NodeId, out: &mut String) {
        let Ok(node) = self.node(id) else {
            return;
        };
        let indent = "  ".repeat(node.depth);
        let _ = match node.kind() {
            NodeKind::Release => writeln!(out, "{indent}{}/", node.name),
            NodeKind::Track => writeln!(
                out,
                "{indent}[{}] {}",
                node.metadata.track_text().unwrap_or_else(|| "--".into()),
                node.file_name()
            ),
            NodeKind::Flat => writeln!(out, "{indent}{}", node.file_name()),
        };
        for child in &node.children {
            self.outline_into(*child, out);
        }
    }
}
