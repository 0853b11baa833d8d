//! Writing a selected metadata set back onto a release.
//!
//! Publishing happens in three steps:
//! 1. resolve and download the release art, saving it next to the tracks
//! 2. for each track in position order: hash the current bytes, apply the
//!    selected record at that position with the hash as comment, write the
//!    tag and embed the art
//! 3. flush the collected hashes to the checksum sidecar
//!
//! A failing track is recorded in the [`PublishReport`] and the remaining
//! tracks are still processed.

pub mod checksum;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::art::{Art, ArtResolver};
use crate::error::{Error, ResultExt};
use crate::metadata::codec::TagCodec;
use crate::metadata::{MetadataCollection, TrackMetadata};
use crate::model::{NodeId, NodeKind};
use crate::tree::{Node, Tree, TreeError};

use checksum::Checksum;

/// Outcome of publishing one release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    /// Every track was written (or there were none)
    Complete,
    /// Some tracks failed
    Partial,
    /// Every track failed
    Failed,
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A track that could not be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Summary of a publish run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    pub status: PublishStatus,
    pub tracks_written: usize,
    pub failures: Vec<TrackFailure>,
    /// Saved art image, if any
    pub art: Option<PathBuf>,
    /// Checksum sidecar, if any track was hashed
    pub checksum_path: Option<PathBuf>,
    /// RFC 3339 timestamp
    pub published_at: String,
}

impl PublishReport {
    fn status_for(tracks: usize, failed: usize) -> PublishStatus {
        match failed {
            0 => PublishStatus::Complete,
            n if n == tracks => PublishStatus::Failed,
            _ => PublishStatus::Partial,
        }
    }
}

/// Applies a selection to a release through the tag codec.
pub struct Publisher {
    codec: Arc<dyn TagCodec>,
    art: Arc<ArtResolver>,
}

impl Publisher {
    pub fn new(codec: Arc<dyn TagCodec>, art: Arc<ArtResolver>) -> Self {
        Self { codec, art }
    }

    /// Publish `selection` onto the tracks of `release`.
    ///
    /// Only release-level problems (not a release, unknown node, sidecar
    /// write failure) are returned as errors; per-track failures end up in
    /// the report.
    pub async fn publish(
        &self,
        tree: &mut Tree,
        release: NodeId,
        selection: &MetadataCollection,
    ) -> Result<PublishReport, Error> {
        let dir = {
            let node = tree.node(release)?;
            if node.kind() != NodeKind::Release {
                return Err(TreeError::Unsupported {
                    op: "publish",
                    kind: node.kind(),
                }
                .into());
            }
            node.path().to_path_buf()
        };

        let mut art = self.art.resolve(selection).await;
        let art_path = self.art.materialize(&mut art, &dir).await;
        if let Some(path) = &art_path {
            attach_flat(tree, release, path)?;
        }

        let tracks: Vec<NodeId> = tree.tracks(release).collect();
        let mut checksum = Checksum::new();
        let mut failures = Vec::new();

        for (position, track) in tracks.iter().copied().enumerate() {
            let path = tree.node(track)?.path().to_path_buf();
            if let Err(e) = self.publish_track(tree, track, &path, position, selection, &art, &mut checksum) {
                warn!(path = %path.display(), error = %e, "Failed to publish track");
                failures.push(TrackFailure {
                    path,
                    message: e.to_string(),
                });
            }
        }

        let checksum_path = if checksum.exists() {
            let path = checksum
                .generate(&dir)
                .with_context(format!("Writing checksum for {}", dir.display()))?;
            attach_flat(tree, release, &path)?;
            Some(path)
        } else {
            None
        };

        let report = PublishReport {
            status: PublishReport::status_for(tracks.len(), failures.len()),
            tracks_written: tracks.len() - failures.len(),
            failures,
            art: art_path,
            checksum_path,
            published_at: Utc::now().to_rfc3339(),
        };
        info!(
            release = %dir.display(),
            status = %report.status,
            written = report.tracks_written,
            failed = report.failures.len(),
            "Published release"
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn publish_track(
        &self,
        tree: &mut Tree,
        track: NodeId,
        path: &Path,
        position: usize,
        selection: &MetadataCollection,
        art: &Art,
        checksum: &mut Checksum,
    ) -> Result<(), Error> {
        let slice = selection
            .get(position)
            .ok_or_else(|| Error::publish(path, format!("no selected record for position {}", position + 1)))?;

        // hash before the tag write changes the bytes
        let hash = checksum.hash(path)?;

        let mut record = TrackMetadata {
            comment: Some(hash),
            source: selection.source(),
            ..slice.clone()
        };
        if art.exists() {
            record.art_url = Some(art.url().to_string());
        }

        self.codec.write_tag(path, &record)?;
        tree.set_metadata(track, record)?;

        if let Some(image) = art.data() {
            self.codec.embed_picture(path, image)?;
        }
        Ok(())
    }
}

/// Register a file written into a release as a flat child, once.
fn attach_flat(tree: &mut Tree, release: NodeId, path: &Path) -> Result<(), TreeError> {
    let present = tree
        .children(release)?
        .iter()
        .any(|c| tree.node(*c).map(|n| n.path() == path).unwrap_or(false));
    if !present {
        tree.insert(release, Node::file(path, TrackMetadata::default()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::mocks::StaticFetcher;
    use crate::config::ArtConfig;
    use crate::metadata::codec::mocks::MemoryCodec;
    use crate::metadata::{Field, FieldAccess};
    use crate::test_utils::{PNG_BYTES, release_dir, selection};
    use crate::tree::TreeBuilder;
    use std::fs;
    use tempfile::tempdir;

    const ART_URL: &str = "http://art.example/elephant";

    fn publisher(codec: Arc<MemoryCodec>, fetcher: StaticFetcher) -> Publisher {
        let art = ArtResolver::new(&ArtConfig::default(), Arc::new(fetcher));
        Publisher::new(codec, Arc::new(art))
    }

    fn with_art(mut chosen: MetadataCollection) -> MetadataCollection {
        chosen.set_field(Field::ArtUrl, Some(ART_URL)).unwrap();
        chosen
    }

    #[tokio::test]
    async fn test_publish_end_to_end() {
        let dir = tempdir().unwrap();
        let album = release_dir(dir.path(), "album", &["a.mp3", "b.mp3", "cover.jpg"]);
        let codec = Arc::new(MemoryCodec::new());
        let mut tree = TreeBuilder::new(codec.clone()).build(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();
        let original_a = checksum::compute_file_hash(&album.join("a.mp3")).unwrap();

        let chosen = with_art(selection("The White Stripes", "Elephant", 2));
        let report = publisher(codec.clone(), StaticFetcher::new().with_image(ART_URL, PNG_BYTES))
            .publish(&mut tree, release, &chosen)
            .await
            .unwrap();

        assert_eq!(report.status, PublishStatus::Complete);
        assert_eq!(report.tracks_written, 2);
        assert_eq!(report.art.as_deref(), Some(album.join("image.png").as_path()));

        for (n, file) in ["a.mp3", "b.mp3"].iter().enumerate() {
            let tag = codec.tag(&album.join(file)).unwrap();
            assert_eq!(tag.artist.as_deref(), Some("The White Stripes"));
            assert_eq!(tag.release.as_deref(), Some("Elephant"));
            assert_eq!(tag.track, Some(n as u32 + 1));
            assert_eq!(tag.art_url.as_deref(), Some(ART_URL));
        }
        // the comment carries the hash of the bytes before tagging
        assert_eq!(codec.tag(&album.join("a.mp3")).unwrap().comment, Some(original_a));

        let sidecar = fs::read_to_string(album.join(checksum::SIDECAR_NAME)).unwrap();
        assert_eq!(sidecar.lines().count(), 2);
        assert!(sidecar.lines().next().unwrap().ends_with(" !a.mp3"));

        assert_eq!(codec.picture_count(), 2);
        assert_eq!(codec.picture(&album.join("b.mp3")).unwrap(), PNG_BYTES);

        // the tree mirrors what was written
        let children = tree.children(release).unwrap().len();
        assert_eq!(children, 5);
        assert_eq!(tree.field(release, Field::Artist).as_deref(), Some("The White Stripes"));
    }

    #[tokio::test]
    async fn test_unreachable_art_is_skipped() {
        let dir = tempdir().unwrap();
        let album = release_dir(dir.path(), "album", &["a.mp3"]);
        let codec = Arc::new(MemoryCodec::new());
        let mut tree = TreeBuilder::new(codec.clone()).build(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();

        let chosen = with_art(selection("Artist", "Album", 1));
        let report = publisher(codec.clone(), StaticFetcher::new())
            .publish(&mut tree, release, &chosen)
            .await
            .unwrap();

        assert_eq!(report.status, PublishStatus::Complete);
        assert!(report.art.is_none());
        assert!(!album.join("image.png").exists());
        assert_eq!(codec.picture_count(), 0);
    }

    #[tokio::test]
    async fn test_one_failing_track_does_not_stop_the_rest() {
        let dir = tempdir().unwrap();
        let album = release_dir(dir.path(), "album", &["a.mp3", "b.mp3"]);
        let codec = Arc::new(MemoryCodec::new());
        let mut tree = TreeBuilder::new(codec.clone()).build(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();
        codec.fail_on(album.join("a.mp3"));

        let report = publisher(codec.clone(), StaticFetcher::new())
            .publish(&mut tree, release, &selection("Artist", "Album", 2))
            .await
            .unwrap();

        assert_eq!(report.status, PublishStatus::Partial);
        assert_eq!(report.tracks_written, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, album.join("a.mp3"));
        assert!(codec.tag(&album.join("b.mp3")).is_some());
    }

    #[tokio::test]
    async fn test_missing_slices_fail_every_track() {
        let dir = tempdir().unwrap();
        release_dir(dir.path(), "album", &["a.mp3", "b.mp3"]);
        let codec = Arc::new(MemoryCodec::new());
        let mut tree = TreeBuilder::new(codec.clone()).build(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();

        let report = publisher(codec.clone(), StaticFetcher::new())
            .publish(&mut tree, release, &MetadataCollection::new())
            .await
            .unwrap();

        assert_eq!(report.status, PublishStatus::Failed);
        assert_eq!(report.tracks_written, 0);
        assert!(report.checksum_path.is_none());
    }

    #[tokio::test]
    async fn test_empty_release_is_complete() {
        let dir = tempdir().unwrap();
        let album = release_dir(dir.path(), "album", &["notes.txt"]);
        let codec = Arc::new(MemoryCodec::new());
        let mut tree = TreeBuilder::new(codec.clone()).build(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();

        let report = publisher(codec, StaticFetcher::new())
            .publish(&mut tree, release, &selection("Artist", "Album", 1))
            .await
            .unwrap();

        assert_eq!(report.status, PublishStatus::Complete);
        assert!(!album.join(checksum::SIDECAR_NAME).exists());
    }

    #[tokio::test]
    async fn test_publish_on_track_is_unsupported() {
        let dir = tempdir().unwrap();
        release_dir(dir.path(), "album", &["a.mp3"]);
        let codec = Arc::new(MemoryCodec::new());
        let mut tree = TreeBuilder::new(codec.clone()).build(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();
        let track = tree.tracks(release).next().unwrap();

        let result = publisher(codec, StaticFetcher::new())
            .publish(&mut tree, track, &selection("Artist", "Album", 1))
            .await;
        assert!(matches!(
            result,
            Err(Error::Tree(TreeError::Unsupported { op: "publish", .. }))
        ));
    }

    #[test]
    fn test_status_rules() {
        assert_eq!(PublishReport::status_for(0, 0), PublishStatus::Complete);
        assert_eq!(PublishReport::status_for(3, 0), PublishStatus::Complete);
        assert_eq!(PublishReport::status_for(3, 1), PublishStatus::Partial);
        assert_eq!(PublishReport::status_for(3, 3), PublishStatus::Failed);
    }
}
