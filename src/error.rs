//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors (e.g., [`TreeError`], [`SearchError`]) for detailed handling
//! - All errors implement `std::error::Error` for compatibility
//!
//! # Example
//!
//! ```ignore
//! use release_minder::error::{Error, Result};
//!
//! fn collapse(root: &Path) -> Result<()> {
//!     let mut tree = builder.build(root)?; // Tree errors auto-convert
//!     tree.collapse(tree.root())?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use crate::art::ArtError;
use crate::config::ConfigError;
use crate::format::FormatError;
use crate::metadata::MetadataError;
use crate::search::SearchError;
use crate::transcode::TranscodeError;
use crate::tree::TreeError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Release tree error
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// Metadata reading/writing error
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Metadata lookup error
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Cover art error
    #[error("Art error: {0}")]
    Art(#[from] ArtError),

    /// Formatter configuration error
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Audio conversion error
    #[error("Transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Every track of a release failed to publish
    #[error("Publish failed for {path}: {message}")]
    Publish { path: PathBuf, message: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a publish error.
    pub fn publish(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Publish {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, TreeError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Tree(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::publish("/music/album", "none of 2 tracks could be written");
        let msg = err.to_string();
        assert!(msg.contains("/music/album"));
        assert!(msg.contains("none of 2 tracks"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::publish("/music/album", "no track written").context("while tagging release");
        let msg = err.to_string();
        assert!(msg.contains("while tagging release"));
    }

    #[test]
    fn test_tree_error_converts() {
        let err: Error = TreeError::IndexOutOfRange { index: 4, len: 2 }.into();
        let msg = err.to_string();
        assert!(msg.contains("4"));
        assert!(msg.contains("2"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::publish("/music/album", "test"));
        let with_ctx = result.with_context("additional context");
        assert!(with_ctx.unwrap_err().to_string().contains("additional context"));
    }

    #[test]
    fn test_io_result_ext() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let msg = result.with_context("reading release").unwrap_err().to_string();
        assert!(msg.contains("reading release"));
    }
}
