//! Cover art lookup and download.
//!
//! A release's art is found by expanding an ordered list of site templates
//! with the release's identifiers, probing each candidate URL and keeping
//! the first one that answers. Bytes are only fetched once a selection is
//! published.

mod client;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ArtConfig;
use crate::metadata::{Field, FieldAccess};

pub use client::HttpArtFetcher;

/// Cover art errors
#[derive(Debug, thiserror::Error)]
pub enum ArtError {
    /// The art has no URL to download from
    #[error("No art URL set")]
    NoUrl,

    #[error("Network error: {0}")]
    Network(String),

    /// The server answered 404
    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Download timed out after {0:?}")]
    Timeout(Duration),

    /// The downloaded bytes are not an image we recognize
    #[error("Unrecognized image data from {0}")]
    UnknownFormat(String),

    #[error("Failed to write image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One cover image reference.
///
/// The art exists as soon as it has a URL; the bytes are filled in by
/// [`ArtResolver::download`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Art {
    url: String,
    data: Option<Vec<u8>>,
}

impl Art {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            data: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn exists(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = Some(data);
    }

    /// Image format sniffed from the downloaded bytes.
    pub fn format(&self) -> Option<ImageFormat> {
        self.data
            .as_deref()
            .and_then(|data| image::guess_format(data).ok())
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        self.format().map(|f| f.to_mime_type())
    }
}

/// A named URL template for one art site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtSite {
    pub name: String,
    pub template: String,
}

impl ArtSite {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Built-in sites, in the order they are tried.
    pub fn defaults() -> Vec<ArtSite> {
        vec![
            ArtSite::new(
                "coverartarchive",
                "https://coverartarchive.org/release/%MBRELEASEID%/front-500",
            ),
            ArtSite::new(
                "amazon.com",
                "http://ec1.images-amazon.com/images/P/%ASIN%.01.LZZZZZZZ.jpg",
            ),
            ArtSite::new(
                "amazon.co.uk",
                "http://ec1.images-amazon.com/images/P/%ASIN%.02.LZZZZZZZ.jpg",
            ),
            ArtSite::new(
                "amazon.co.jp",
                "http://ec1.images-amazon.com/images/P/%ASIN%.09.LZZZZZZZ.jpg",
            ),
            ArtSite::new(
                "cdbaby",
                "http://cdbaby.name/%ALBUMCHAR0%/%ALBUMCHAR1%/%ALBUM%_large.jpg",
            ),
        ]
    }
}

/// Placeholder values for expanding site templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtQuery {
    pub asin: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub release_id: Option<String>,
    pub artist_id: Option<String>,
}

const PLACEHOLDERS: [&str; 7] = [
    "%ASIN%",
    "%ARTIST%",
    "%ALBUM%",
    "%MBRELEASEID%",
    "%MBARTISTID%",
    "%ALBUMCHAR0%",
    "%ALBUMCHAR1%",
];

impl ArtQuery {
    /// Read the query from a release's metadata (the lead track's values).
    pub fn from_metadata(metadata: &impl FieldAccess) -> Self {
        Self {
            asin: metadata.field(Field::Asin),
            artist: metadata
                .field(Field::AlbumArtist)
                .or_else(|| metadata.field(Field::Artist)),
            album: metadata.field(Field::Release),
            release_id: metadata.field(Field::ReleaseId),
            artist_id: metadata.field(Field::ArtistId),
        }
    }

    fn value(&self, placeholder: &str) -> Option<String> {
        let album = self.album.as_deref().map(str::to_lowercase);
        let album_char = |n: usize| album.as_deref().and_then(|a| a.chars().nth(n)).map(String::from);
        let value = match placeholder {
            "%ASIN%" => self.asin.clone(),
            "%ARTIST%" => self.artist.as_deref().map(str::to_lowercase),
            "%ALBUM%" => album.clone(),
            "%MBRELEASEID%" => self.release_id.clone(),
            "%MBARTISTID%" => self.artist_id.clone(),
            "%ALBUMCHAR0%" => album_char(0),
            "%ALBUMCHAR1%" => album_char(1),
            _ => None,
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Expand a site template, or `None` if any placeholder it uses is empty.
    pub fn expand(&self, template: &str) -> Option<String> {
        let mut url = template.to_string();
        for placeholder in PLACEHOLDERS {
            if url.contains(placeholder) {
                let value = self.value(placeholder)?;
                url = url.replace(placeholder, &urlencoding::encode(&value));
            }
        }
        Some(url)
    }
}

/// Reachability checks and downloads for art URLs.
#[async_trait]
pub trait ArtFetcher: Send + Sync {
    /// Whether `url` answers with a success status within `timeout`.
    async fn probe(&self, url: &str, timeout: Duration) -> bool;

    /// Download the bytes behind `url`.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, ArtError>;
}

/// Finds, downloads and saves release art using configured site templates.
pub struct ArtResolver {
    sites: Vec<ArtSite>,
    fetcher: Arc<dyn ArtFetcher>,
    probe_timeout: Duration,
    download_timeout: Duration,
    image_name: String,
}

impl ArtResolver {
    pub fn new(config: &ArtConfig, fetcher: Arc<dyn ArtFetcher>) -> Self {
        Self {
            sites: config.sites.clone(),
            fetcher,
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
            image_name: config.image_name.clone(),
        }
    }

    /// Candidate URLs in site order, skipping templates that cannot be filled.
    pub fn candidates(&self, query: &ArtQuery) -> Vec<(String, String)> {
        self.sites
            .iter()
            .filter_map(|site| match query.expand(&site.template) {
                Some(url) => Some((site.name.clone(), url)),
                None => {
                    debug!(site = %site.name, "Skipping art site, missing placeholder value");
                    None
                }
            })
            .collect()
    }

    /// First reachable candidate in site order.
    ///
    /// Probes run concurrently; a probe that errors or outlives the probe
    /// timeout counts as unreachable.
    pub async fn search(&self, query: &ArtQuery) -> Option<String> {
        let candidates = self.candidates(query);
        let probes = candidates.iter().map(|(_, url)| async move {
            tokio::time::timeout(self.probe_timeout, self.fetcher.probe(url, self.probe_timeout))
                .await
                .unwrap_or(false)
        });
        let reachable = join_all(probes).await;

        let found = candidates
            .into_iter()
            .zip(reachable)
            .find_map(|((site, url), ok)| ok.then_some((site, url)));
        match found {
            Some((site, url)) => {
                info!(site = %site, url = %url, "Found cover art");
                Some(url)
            }
            None => {
                debug!("No art site answered");
                None
            }
        }
    }

    /// Art for a release: its stored art URL if set, otherwise a site search.
    pub async fn resolve(&self, metadata: &impl FieldAccess) -> Art {
        if let Some(url) = metadata.field(Field::ArtUrl).filter(|u| !u.trim().is_empty()) {
            return Art::new(url);
        }
        let query = ArtQuery::from_metadata(metadata);
        Art::new(self.search(&query).await.unwrap_or_default())
    }

    /// Fetch the bytes for `art`.
    pub async fn download(&self, art: &mut Art) -> Result<(), ArtError> {
        if !art.exists() {
            return Err(ArtError::NoUrl);
        }
        let data = tokio::time::timeout(
            self.download_timeout,
            self.fetcher.fetch(art.url(), self.download_timeout),
        )
        .await
        .map_err(|_| ArtError::Timeout(self.download_timeout))??;

        if image::guess_format(&data).is_err() {
            return Err(ArtError::UnknownFormat(art.url().to_string()));
        }
        debug!(url = %art.url(), bytes = data.len(), "Downloaded cover art");
        art.set_data(data);
        Ok(())
    }

    /// Write downloaded art into `dir` as `<image_name>.<ext>`.
    pub fn save(&self, art: &Art, dir: &Path) -> Result<PathBuf, ArtError> {
        let data = art.data().ok_or(ArtError::NoUrl)?;
        let extension = art
            .format()
            .and_then(|f| f.extensions_str().first().copied())
            .ok_or_else(|| ArtError::UnknownFormat(art.url().to_string()))?;

        let path = dir.join(format!("{}.{}", self.image_name, extension));
        fs::write(&path, data).map_err(|source| ArtError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Download and save in one step, logging instead of failing.
    pub async fn materialize(&self, art: &mut Art, dir: &Path) -> Option<PathBuf> {
        if !art.exists() {
            return None;
        }
        let saved = match self.download(art).await {
            Ok(()) => self.save(art, dir),
            Err(e) => Err(e),
        };
        match saved {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url = %art.url(), error = %e, "Could not save cover art");
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::StaticFetcher;
    use super::*;
    use crate::metadata::TrackMetadata;
    use crate::test_utils::PNG_BYTES;
    use tempfile::tempdir;

    fn resolver(fetcher: StaticFetcher) -> ArtResolver {
        let config = ArtConfig {
            probe_timeout_ms: 50,
            ..ArtConfig::default()
        };
        ArtResolver::new(&config, Arc::new(fetcher))
    }

    fn query() -> ArtQuery {
        ArtQuery {
            asin: Some("B00008OWZV".into()),
            artist: Some("The White Stripes".into()),
            album: Some("Elephant".into()),
            release_id: None,
            artist_id: None,
        }
    }

    #[test]
    fn test_exists_depends_only_on_url() {
        assert!(!Art::default().exists());
        assert!(!Art::new("  ").exists());
        let art = Art::new("http://x/y.jpg");
        assert!(art.exists());
        assert!(art.data().is_none());
    }

    #[test]
    fn test_expand_skips_empty_placeholders() {
        let q = query();
        assert_eq!(
            q.expand("http://ec1.images-amazon.com/images/P/%ASIN%.01.LZZZZZZZ.jpg")
                .as_deref(),
            Some("http://ec1.images-amazon.com/images/P/B00008OWZV.01.LZZZZZZZ.jpg")
        );
        assert_eq!(
            q.expand("http://cdbaby.name/%ALBUMCHAR0%/%ALBUMCHAR1%/%ALBUM%_large.jpg")
                .as_deref(),
            Some("http://cdbaby.name/e/l/elephant_large.jpg")
        );
        assert_eq!(q.expand("https://caa/%MBRELEASEID%/front"), None);
    }

    #[test]
    fn test_expand_encodes_values() {
        let q = ArtQuery {
            album: Some("A Day/Night".into()),
            ..Default::default()
        };
        assert_eq!(
            q.expand("http://x/%ALBUM%.jpg").as_deref(),
            Some("http://x/a%20day%2Fnight.jpg")
        );
    }

    #[test]
    fn test_candidates_follow_site_order() {
        let r = resolver(StaticFetcher::new());
        let names: Vec<String> = r.candidates(&query()).into_iter().map(|(n, _)| n).collect();
        // coverartarchive needs a release id
        assert_eq!(names, vec!["amazon.com", "amazon.co.uk", "amazon.co.jp", "cdbaby"]);
    }

    #[tokio::test]
    async fn test_search_prefers_configured_order() {
        let uk = "http://ec1.images-amazon.com/images/P/B00008OWZV.02.LZZZZZZZ.jpg";
        let cdbaby = "http://cdbaby.name/e/l/elephant_large.jpg";
        let r = resolver(
            StaticFetcher::new()
                .with_image(cdbaby, PNG_BYTES)
                .with_image(uk, PNG_BYTES),
        );
        assert_eq!(r.search(&query()).await.as_deref(), Some(uk));
    }

    #[tokio::test]
    async fn test_hanging_probe_counts_as_unreachable() {
        let us = "http://ec1.images-amazon.com/images/P/B00008OWZV.01.LZZZZZZZ.jpg";
        let cdbaby = "http://cdbaby.name/e/l/elephant_large.jpg";
        let r = resolver(
            StaticFetcher::new()
                .with_image(us, PNG_BYTES)
                .with_hanging(us)
                .with_image(cdbaby, PNG_BYTES),
        );
        assert_eq!(r.search(&query()).await.as_deref(), Some(cdbaby));
    }

    #[tokio::test]
    async fn test_resolve_uses_stored_url_first() {
        let r = resolver(StaticFetcher::new());
        let meta = TrackMetadata {
            art_url: Some("http://stored/art.png".into()),
            ..Default::default()
        };
        assert_eq!(r.resolve(&meta).await.url(), "http://stored/art.png");

        let nothing = r.resolve(&TrackMetadata::default()).await;
        assert!(!nothing.exists());
    }

    #[tokio::test]
    async fn test_download_and_save() {
        let dir = tempdir().unwrap();
        let url = "http://stored/art";
        let r = resolver(StaticFetcher::new().with_image(url, PNG_BYTES));

        let mut art = Art::new(url);
        let path = r.materialize(&mut art, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("image.png"));
        assert_eq!(fs::read(&path).unwrap(), PNG_BYTES);
        assert_eq!(art.mime_type(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_download_rejects_non_image_and_missing_url() {
        let r = resolver(StaticFetcher::new().with_image("http://x/page", b"<html>"));
        let mut page = Art::new("http://x/page");
        assert!(matches!(r.download(&mut page).await, Err(ArtError::UnknownFormat(_))));

        let mut empty = Art::default();
        assert!(matches!(r.download(&mut empty).await, Err(ArtError::NoUrl)));
    }
}
