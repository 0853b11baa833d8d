//! Release integrity checksum.
//!
//! One [`Checksum`] is shared by all tracks of a release: each hashed file
//! appends a `hash !file_name` line, and [`Checksum::generate`] flushes the
//! buffer to a sidecar next to the tracks.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Sidecar file name written into the release directory.
pub const SIDECAR_NAME: &str = "checksum.sha256";

/// Compute the SHA256 of a whole file.
///
/// # Returns
///
/// SHA256 hash as a lowercase hex string (64 characters)
pub fn compute_file_hash(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Accumulating `hash !name` buffer for one release.
#[derive(Debug, Clone, Default)]
pub struct Checksum {
    buffer: String,
}

impl Checksum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `path` and append its line. Returns the hex digest.
    pub fn hash(&mut self, path: &Path) -> io::Result<String> {
        let digest = compute_file_hash(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.buffer.push_str(&format!("{digest} !{name}\n"));
        Ok(digest)
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether anything has been hashed yet.
    pub fn exists(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Write the buffer to `dir/checksum.sha256`. Returns the sidecar path.
    pub fn generate(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(SIDECAR_NAME);
        fs::write(&path, &self.buffer)?;
        Ok(path)
    }
}
