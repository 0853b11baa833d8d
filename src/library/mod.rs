//! Caller-facing operations on a release directory.
//!
//! [`Library`] wires the configured services together: tag codec, search
//! providers, art fetcher and transcoder. Each method works on a [`Tree`]
//! built by [`Library::build_tree`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::art::{ArtFetcher, ArtResolver, HttpArtFetcher};
use crate::config::Config;
use crate::error::{Error, Result, ResultExt};
use crate::format::{Casing, Formatter};
use crate::metadata::MetadataCollection;
use crate::metadata::codec::{LoftyCodec, TagCodec};
use crate::model::NodeId;
use crate::publish::{PublishReport, PublishStatus, Publisher};
use crate::search::{SearchCoordinator, SearchHints, SearchProvider, providers_from_config};
use crate::transcode::{FfmpegTranscoder, Transcoder, transcode_release};
use crate::tree::{FileComparer, Tree, TreeBuilder};

pub struct Library {
    config: Config,
    codec: Arc<dyn TagCodec>,
    coordinator: SearchCoordinator,
    publisher: Publisher,
    transcoder: Arc<dyn Transcoder>,
    name_formatter: Arc<Formatter>,
}

impl Library {
    /// Production services for `config`.
    pub fn new(config: Config) -> Self {
        let providers = providers_from_config(&config);
        let transcoder = FfmpegTranscoder::with_program(&config.library.ffmpeg_path);
        Self::with_services(
            config,
            Arc::new(LoftyCodec),
            providers,
            Arc::new(HttpArtFetcher::new()),
            Arc::new(transcoder),
        )
    }

    pub fn with_services(
        config: Config,
        codec: Arc<dyn TagCodec>,
        providers: Vec<Arc<dyn SearchProvider>>,
        fetcher: Arc<dyn ArtFetcher>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let coordinator = SearchCoordinator::new(
            providers,
            config.search.max_results,
            Duration::from_secs(config.search.timeout_secs),
        );
        let art = ArtResolver::new(&config.art, fetcher);
        let publisher = Publisher::new(Arc::clone(&codec), Arc::new(art));
        let name_formatter = Arc::new(name_formatter(&config.formatter));
        Self {
            config,
            codec,
            coordinator,
            publisher,
            transcoder,
            name_formatter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Walk `root` into a tree.
    pub fn build_tree(&self, root: &Path) -> Result<Tree> {
        TreeBuilder::new(Arc::clone(&self.codec))
            .filename_policy(self.config.library.filename)
            .comparer(FileComparer::new(self.config.library.compare_key))
            .encoding(self.config.library.target_encoding)
            .build(root)
            .with_context(format!("reading {}", root.display()))
    }

    /// Lookup hints from what the node already carries.
    pub fn hints(&self, tree: &Tree, node: NodeId) -> SearchHints {
        SearchHints::from_metadata(&tree.aggregate(node))
    }

    /// Candidate metadata sets for a release, at most `max_results`.
    pub async fn resolve(&self, tree: &Tree, node: NodeId) -> Vec<MetadataCollection> {
        let hints = self.hints(tree, node);
        debug!(?hints, "Resolving release");
        self.coordinator.resolve(&hints).await
    }

    /// Write `selection` onto the release's tracks.
    pub async fn publish(
        &self,
        tree: &mut Tree,
        node: NodeId,
        selection: &MetadataCollection,
    ) -> Result<PublishReport> {
        self.publisher.publish(tree, node, selection).await
    }

    /// Format display names below `node` for renaming.
    pub fn format(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        Ok(tree.format(node, Arc::clone(&self.name_formatter))?)
    }

    /// Rename `node` and everything below it with the configured templates.
    pub fn rename(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        Ok(tree.rename(node, &self.config.renamer)?)
    }

    /// Flatten nested releases below `node`.
    pub fn collapse(&self, tree: &mut Tree, node: NodeId) -> Result<()> {
        Ok(tree.collapse(node)?)
    }

    /// Full tagging pass for one release.
    ///
    /// Formats the selection text, optionally converts tracks, publishes,
    /// then formats and renames. Nothing is renamed when no track could be
    /// written.
    pub async fn apply(
        &self,
        tree: &mut Tree,
        node: NodeId,
        selection: &MetadataCollection,
    ) -> Result<PublishReport> {
        let mut selection = selection.clone();
        selection.format(&self.config.formatter);

        if self.config.library.transcode {
            let target = tree.node(node)?.encoding().or(self.config.library.target_encoding);
            match target {
                Some(_) if !self.transcoder.is_available() => {
                    warn!("Transcoder not available, keeping original encodings");
                }
                Some(target) => {
                    transcode_release(tree, node, self.transcoder.as_ref(), target)?;
                }
                None => {}
            }
        }

        let report = self.publish(tree, node, &selection).await?;
        if report.status == PublishStatus::Failed {
            let path = tree.node(node)?.path().to_path_buf();
            return Err(Error::publish(
                path,
                format!("none of {} tracks could be written", report.failures.len()),
            ));
        }

        self.format(tree, node)?;
        self.rename(tree, node)?;
        info!(
            path = %tree.node(node)?.path().display(),
            status = %report.status,
            "Release tagged"
        );
        Ok(report)
    }
}

/// The configured formatter with lower-case file names and spaces
/// replaced by underscores.
fn name_formatter(base: &Formatter) -> Formatter {
    let mut formatter = base.clone();
    formatter.track_casing = Casing::Lower;
    formatter.flat_casing = Casing::Lower;
    if formatter.add(" ", "_").is_err() {
        debug!("Formatter already replaces spaces");
    }
    formatter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::mocks::StaticFetcher;
    use crate::metadata::codec::mocks::MemoryCodec;
    use crate::metadata::{Field, MetadataSource};
    use crate::model::{Encoding, NodeKind};
    use crate::search::QueryScope;
    use crate::search::mocks::{Script, ScriptedProvider};
    use crate::test_utils::{release_dir, selection};
    use crate::transcode::{TranscodeError, target_path};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// Renames files to the target extension without converting.
    struct RenamingTranscoder;

    impl Transcoder for RenamingTranscoder {
        fn transcode(&self, path: &Path, target: Encoding) -> std::result::Result<PathBuf, TranscodeError> {
            let to = target_path(path, target);
            fs::rename(path, &to).map_err(|source| TranscodeError::Cleanup {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(to)
        }
    }

    /// A transcoder whose program is missing.
    struct MissingTranscoder;

    impl Transcoder for MissingTranscoder {
        fn transcode(&self, path: &Path, _target: Encoding) -> std::result::Result<PathBuf, TranscodeError> {
            Err(TranscodeError::Failed {
                path: path.to_path_buf(),
                message: "not installed".into(),
            })
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    fn library(config: Config, codec: Arc<MemoryCodec>, providers: Vec<Arc<dyn SearchProvider>>) -> Library {
        Library::with_services(
            config,
            codec,
            providers,
            Arc::new(StaticFetcher::new()),
            Arc::new(RenamingTranscoder),
        )
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_name_formatter() {
        let formatter = name_formatter(&Formatter::default());
        assert_eq!(
            formatter.format(Some(crate::format::FormatContext::Track), "01-The White Stripes-Song 1"),
            "01-the_white_stripes-song_1"
        );
    }

    #[tokio::test]
    async fn test_resolve_uses_release_hints() {
        let dir = tempdir().unwrap();
        release_dir(dir.path(), "Elephant", &["01-The White Stripes-Seven Nation Army.mp3"]);
        let provider = Arc::new(
            ScriptedProvider::new(MetadataSource::MusicBrainz).script(QueryScope::Track, Script::Results(3)),
        );
        let providers: Vec<Arc<dyn SearchProvider>> = vec![provider.clone()];
        let lib = library(Config::default(), Arc::new(MemoryCodec::new()), providers);
        let tree = lib.build_tree(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();

        let hints = lib.hints(&tree, release);
        assert_eq!(hints.artist.as_deref(), Some("The White Stripes"));
        assert_eq!(hints.release.as_deref(), Some("Elephant"));
        assert_eq!(hints.track_count, 1);

        let candidates = lib.resolve(&tree, release).await;
        assert_eq!(candidates.len(), 3);
        assert_eq!(provider.calls()[0], (QueryScope::Track, 5));
    }

    #[tokio::test]
    async fn test_apply_tags_and_renames() {
        let dir = tempdir().unwrap();
        release_dir(dir.path(), "untitled", &["a.mp3", "b.mp3"]);
        let codec = Arc::new(MemoryCodec::new());
        let lib = library(Config::default(), codec.clone(), Vec::new());
        let mut tree = lib.build_tree(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();

        let report = lib
            .apply(&mut tree, release, &selection("The White Stripes", "Elephant", 2))
            .await
            .unwrap();

        assert_eq!(report.status, PublishStatus::Complete);
        let album = tree.node(release).unwrap().path().to_path_buf();
        assert_eq!(album, dir.path().join("The_White_Stripes-Elephant-2003"));
        assert_eq!(
            file_names(&album),
            vec![
                "00-the_white_stripes-elephant.sha256",
                "01-the_white_stripes-song_1.mp3",
                "02-the_white_stripes-song_2.mp3",
            ]
        );
        let tag = codec.tag(&album.join("01-the_white_stripes-song_1.mp3")).unwrap();
        assert_eq!(tag.release.as_deref(), Some("Elephant"));
        assert_eq!(tree.field(release, Field::Title).as_deref(), Some("Song 1"));
    }

    #[tokio::test]
    async fn test_failed_publish_keeps_names() {
        let dir = tempdir().unwrap();
        let album = release_dir(dir.path(), "untitled", &["a.mp3"]);
        let codec = Arc::new(MemoryCodec::new());
        codec.fail_on(album.join("a.mp3"));
        let lib = library(Config::default(), codec.clone(), Vec::new());
        let mut tree = lib.build_tree(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();

        let result = lib.apply(&mut tree, release, &selection("Artist", "Album", 1)).await;

        assert!(matches!(result, Err(Error::Publish { .. })));
        assert!(album.join("a.mp3").exists());
    }

    #[tokio::test]
    async fn test_apply_transcodes_when_enabled() {
        let dir = tempdir().unwrap();
        release_dir(dir.path(), "untitled", &["a.flac"]);
        let mut config = Config::default();
        config.library.transcode = true;
        config.library.target_encoding = Some(Encoding::Mp3);
        let lib = library(config, Arc::new(MemoryCodec::new()), Vec::new());
        let mut tree = lib.build_tree(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();

        lib.apply(&mut tree, release, &selection("Artist", "Album", 1))
            .await
            .unwrap();

        let track = tree.tracks(release).next().unwrap();
        assert_eq!(tree.node(track).unwrap().extension(), ".mp3");
        assert!(tree.node(track).unwrap().path().exists());
    }

    #[tokio::test]
    async fn test_apply_skips_transcode_without_transcoder() {
        let dir = tempdir().unwrap();
        release_dir(dir.path(), "untitled", &["a.flac"]);
        let mut config = Config::default();
        config.library.transcode = true;
        config.library.target_encoding = Some(Encoding::Mp3);
        let lib = Library::with_services(
            config,
            Arc::new(MemoryCodec::new()),
            Vec::new(),
            Arc::new(StaticFetcher::new()),
            Arc::new(MissingTranscoder),
        );
        let mut tree = lib.build_tree(dir.path()).unwrap();
        let release = tree.releases(tree.root()).next().unwrap();

        lib.apply(&mut tree, release, &selection("Artist", "Album", 1))
            .await
            .unwrap();

        let track = tree.tracks(release).next().unwrap();
        assert_eq!(tree.node(track).unwrap().extension(), ".flac");
        assert!(tree.node(track).unwrap().path().exists());
    }

    #[test]
    fn test_collapse_through_library() {
        let dir = tempdir().unwrap();
        let outer = dir.path().join("outer");
        release_dir(&outer, "inner", &["01.mp3"]);
        let lib = library(Config::default(), Arc::new(MemoryCodec::new()), Vec::new());
        let mut tree = lib.build_tree(dir.path()).unwrap();
        let outer_id = tree.releases(tree.root()).next().unwrap();

        lib.collapse(&mut tree, outer_id).unwrap();

        assert!(outer.join("01.mp3").exists());
        assert!(!outer.join("inner").exists());
        let kinds: Vec<_> = tree
            .children(outer_id)
            .unwrap()
            .iter()
            .map(|c| tree.kind(*c))
            .collect();
        assert_eq!(kinds, vec![Some(NodeKind::Track)]);
    }

    #[test]
    fn test_build_tree_rejects_files() {
        let dir = tempdir().unwrap();
        let file = crate::test_utils::touch(dir.path(), "a.mp3");
        let lib = library(Config::default(), Arc::new(MemoryCodec::new()), Vec::new());
        assert!(lib.build_tree(&file).is_err());
    }
}
