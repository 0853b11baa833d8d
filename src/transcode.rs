//! Audio conversion between encodings.
//!
//! Conversion shells out to `ffmpeg`. The converted file is written next to
//! the source with the target extension and the source is deleted once the
//! conversion succeeded.
//!
//! Install ffmpeg:
//! - Windows: `winget install Gyan.FFmpeg`
//! - macOS: `brew install ffmpeg`
//! - Linux: `apt install ffmpeg` or equivalent

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::model::{Encoding, NodeId, NodeKind};
use crate::tree::{Tree, TreeError};

/// Errors from converting a track.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Conversion of {path} failed: {message}")]
    Failed { path: PathBuf, message: String },

    #[error("Failed to remove source {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Converts one audio file to another encoding.
pub trait Transcoder: Send + Sync {
    /// Convert `path` to `target`, returning the new file's path.
    ///
    /// A file already in the target encoding is returned unchanged.
    fn transcode(&self, path: &Path, target: Encoding) -> Result<PathBuf, TranscodeError>;

    /// Whether conversions can run at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Path of the converted file: same directory and stem, target extension.
pub fn target_path(path: &Path, target: Encoding) -> PathBuf {
    path.with_extension(target.extension().trim_start_matches('.'))
}

/// [`Transcoder`] backed by the `ffmpeg` command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    /// Use `ffmpeg` from `PATH`
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, path: &Path, target: Encoding) -> Result<PathBuf, TranscodeError> {
        let output_path = target_path(path, target);
        if output_path == path {
            return Ok(output_path);
        }

        debug!(from = %path.display(), to = %output_path.display(), "Transcoding");
        let output = Command::new(&self.program)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(path)
            .arg(&output_path)
            .output()
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let _ = fs::remove_file(&output_path);
            return Err(TranscodeError::Failed {
                path: path.to_path_buf(),
                message: stderr.trim().to_string(),
            });
        }

        fs::remove_file(path).map_err(|source| TranscodeError::Cleanup {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(output_path)
    }

    /// Whether the configured program runs at all.
    fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Convert every direct track of `release` not already in `target`.
///
/// Converted tracks are relocated in the tree. A failing track is logged
/// and left as is. Returns the number of tracks converted.
pub fn transcode_release(
    tree: &mut Tree,
    release: NodeId,
    transcoder: &dyn Transcoder,
    target: Encoding,
) -> Result<usize, TreeError> {
    let kind = tree.node(release)?.kind();
    if kind != NodeKind::Release {
        return Err(TreeError::Unsupported { op: "transcode", kind });
    }

    let pending: Vec<(NodeId, PathBuf)> = tree
        .tracks(release)
        .filter_map(|id| {
            let node = tree.node(id).ok()?;
            (!target.matches(node.extension())).then(|| (id, node.path().to_path_buf()))
        })
        .collect();

    let mut converted = 0;
    for (id, path) in pending {
        match transcoder.transcode(&path, target) {
            Ok(new_path) => {
                tree.relocate(id, new_path)?;
                converted += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Transcode failed, keeping original"),
        }
    }
    if converted > 0 {
        info!(release = %release, converted, "Transcoded tracks");
    }
    Ok(converted)
}
