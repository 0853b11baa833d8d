//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\release-minder\config.toml
//! - macOS: ~/Library/Application Support/release-minder/config.toml
//! - Linux: ~/.config/release-minder/config.toml
//!
//! The config file is human-readable and editable. Every section falls back
//! to its defaults, so a file only needs the settings it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::art::ArtSite;
use crate::format::Formatter;
use crate::format::renamer::Renamer;
use crate::metadata::filename::FilenamePolicy;
use crate::model::Encoding;
use crate::search::coordinator::MAX_RESULTS;
use crate::tree::CompareKey;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials (keep separate for potential future encryption)
    pub credentials: Credentials,

    /// Metadata lookup settings
    pub search: SearchConfig,

    /// Release art settings
    pub art: ArtConfig,

    /// Name and metadata normalization
    pub formatter: Formatter,

    /// Naming templates
    pub renamer: Renamer,

    /// Tree construction and file handling
    pub library: LibraryConfig,
}

/// API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Last.fm API key; the Last.fm provider is skipped without one
    pub lastfm_api_key: Option<String>,
}

/// Metadata lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum candidates per lookup (1-5)
    pub max_results: usize,

    /// Providers in priority order: "musicbrainz", "lastfm", "itunes"
    pub providers: Vec<String>,

    /// Per sub-query timeout
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULTS,
            providers: vec!["musicbrainz".into(), "lastfm".into(), "itunes".into()],
            timeout_secs: 10,
        }
    }
}

/// Release art settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtConfig {
    /// URL templates, tried in order
    pub sites: Vec<ArtSite>,

    /// Reachability probe timeout per candidate
    pub probe_timeout_ms: u64,

    /// Image download timeout
    pub download_timeout_secs: u64,

    /// File stem of the saved image
    pub image_name: String,
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self {
            sites: ArtSite::defaults(),
            probe_timeout_ms: 1000,
            download_timeout_secs: 20,
            image_name: "image".to_string(),
        }
    }
}

/// Tree construction and file handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Track ordering within a release
    pub compare_key: CompareKey,

    /// File name heuristics for untagged tracks
    pub filename: FilenamePolicy,

    /// Preferred encoding for tracks
    pub target_encoding: Option<Encoding>,

    /// Convert tracks to `target_encoding` before publishing
    pub transcode: bool,

    /// Converter executable
    pub ffmpeg_path: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            compare_key: CompareKey::default(),
            filename: FilenamePolicy::default(),
            target_encoding: None,
            transcode: false,
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("release-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

impl Config {
    /// Load configuration from the standard location
    ///
    /// Returns default config if file doesn't exist or can't be parsed.
    /// Logs warnings but doesn't fail - we always return a usable config.
    pub fn load() -> Config {
        let Some(path) = config_path() else {
            tracing::warn!("Could not determine config directory, using defaults");
            return Config::default();
        };
        Self::load_from(&path)
    }

    /// Load configuration from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Config {
        if !path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", path);
            return Config::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to parse config file {:?}: {}", path, e);
                    tracing::warn!("Using default configuration");
                    Config::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to read config file {:?}: {}", path, e);
                Config::default()
            }
        }
    }

    /// Save configuration to the standard location
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
        }

        let contents = self.to_toml()?;

        // Write atomically (write to temp, then rename)
        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
        std::fs::rename(&temp_path, path)
            .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Pretty TOML rendering, as written by [`Config::save`].
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Casing;
    use crate::metadata::filename::FilenameHint;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[credentials]"));
        assert!(toml.contains("[search]"));
        assert!(toml.contains("[art]"));
        assert!(toml.contains("[formatter]"));
        assert!(toml.contains("[renamer]"));
        assert!(toml.contains("[library]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.credentials.lastfm_api_key = Some("test-key-123".to_string());
        config.search.max_results = 2;
        config.library.target_encoding = Some(Encoding::Flac);
        config.formatter.track_casing = Casing::Lower;

        let toml = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(
            parsed.credentials.lastfm_api_key,
            Some("test-key-123".to_string())
        );
        assert_eq!(parsed.search.max_results, 2);
        assert_eq!(parsed.library.target_encoding, Some(Encoding::Flac));
        assert_eq!(parsed.formatter, config.formatter);
        assert_eq!(parsed.art.sites, ArtSite::defaults());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        // Config with only some fields
        let toml = r#"
[credentials]
lastfm_api_key = "my-key"

[library.filename]
artist = "ignore"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        // Specified fields are set
        assert_eq!(config.credentials.lastfm_api_key, Some("my-key".to_string()));
        assert_eq!(config.library.filename.artist, FilenameHint::Ignore);

        // Other fields use defaults
        assert_eq!(config.library.filename.track, FilenameHint::Override);
        assert_eq!(config.search.providers, vec!["musicbrainz", "lastfm", "itunes"]);
        assert_eq!(config.art.probe_timeout_ms, 1000);
        assert_eq!(config.renamer, Renamer::default());
        assert!(!config.library.transcode);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.art.image_name = "cover".to_string();

        config.save_to(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.art.image_name, "cover");
    }

    #[test]
    fn test_unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "search = [not toml").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.search.max_results, MAX_RESULTS);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/release-minder/config.toml"));
        assert_eq!(config.search.timeout_secs, 10);
    }
}
