//! Tag codec: reading and writing the tag block of an audio file.
//!
//! [`LoftyCodec`] is the production implementation and supports MP3 (ID3v2),
//! FLAC, OGG Vorbis, M4A, WMA and WAV through lofty. The catalog number and
//! release type have no portable tag key and are kept in memory only.

use std::io::Cursor;
use std::path::Path;

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};

use super::{MetadataError, TrackMetadata};

/// Reads and writes the tag fields and cover picture of one audio file.
///
/// Path based: after a file moves the codec is simply called with the new
/// path, so no open handle has to be retargeted.
pub trait TagCodec: Send + Sync {
    /// Read the tag fields of a file. Files without tags yield an empty record.
    fn read_tag(&self, path: &Path) -> Result<TrackMetadata, MetadataError>;

    /// Replace the tag fields of a file and save it.
    fn write_tag(&self, path: &Path, metadata: &TrackMetadata) -> Result<(), MetadataError>;

    /// Embed an image as the front cover, replacing any existing front cover.
    fn embed_picture(&self, path: &Path, image: &[u8]) -> Result<(), MetadataError>;
}

/// lofty-backed [`TagCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyCodec;

impl LoftyCodec {
    fn read_error(path: &Path, err: impl std::fmt::Display) -> MetadataError {
        MetadataError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    fn write_error(path: &Path, err: impl std::fmt::Display) -> MetadataError {
        MetadataError::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Open a file and hand its primary tag (created if missing) to `edit`, then save.
    fn edit_primary_tag(
        path: &Path,
        edit: impl FnOnce(&mut Tag) -> Result<(), MetadataError>,
    ) -> Result<(), MetadataError> {
        let mut tagged_file = Probe::open(path)
            .map_err(|e| Self::write_error(path, e))?
            .read()
            .map_err(|e| Self::write_error(path, e))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag_mut(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or_else(|| Self::write_error(path, format!("{tag_type:?} tags not supported")))?;

        edit(tag)?;

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| Self::write_error(path, e))
    }
}

impl TagCodec for LoftyCodec {
    fn read_tag(&self, path: &Path) -> Result<TrackMetadata, MetadataError> {
        let tagged_file = Probe::open(path)
            .map_err(|e| Self::read_error(path, e))?
            .read()
            .map_err(|e| Self::read_error(path, e))?;

        // Get the primary tag, or fall back to the first available tag
        let Some(tag) = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
        else {
            return Ok(TrackMetadata::default());
        };

        let text = |key: &ItemKey| tag.get_string(key).map(str::to_string);

        Ok(TrackMetadata {
            artist: tag.artist().map(|s| s.to_string()),
            album_artist: text(&ItemKey::AlbumArtist),
            release: tag.album().map(|s| s.to_string()),
            title: tag.title().map(|s| s.to_string()),
            track: tag.track(),
            year: tag.year(),
            genre: tag.genre().map(|s| s.to_string()),
            comment: tag.comment().map(|s| s.to_string()),
            release_id: text(&ItemKey::MusicBrainzReleaseId),
            artist_id: text(&ItemKey::MusicBrainzArtistId),
            track_id: text(&ItemKey::MusicBrainzRecordingId),
            ..Default::default()
        })
    }

    fn write_tag(&self, path: &Path, metadata: &TrackMetadata) -> Result<(), MetadataError> {
        Self::edit_primary_tag(path, |tag| {
            set_or_remove(tag, metadata.artist.as_deref(), Tag::set_artist, Tag::remove_artist);
            set_or_remove(tag, metadata.release.as_deref(), Tag::set_album, Tag::remove_album);
            set_or_remove(tag, metadata.title.as_deref(), Tag::set_title, Tag::remove_title);
            set_or_remove(tag, metadata.genre.as_deref(), Tag::set_genre, Tag::remove_genre);
            set_or_remove(tag, metadata.comment.as_deref(), Tag::set_comment, Tag::remove_comment);

            match metadata.track {
                Some(n) => tag.set_track(n),
                None => tag.remove_track(),
            }
            match metadata.year {
                Some(y) => tag.set_year(y),
                None => tag.remove_year(),
            }

            let keyed = [
                (ItemKey::AlbumArtist, &metadata.album_artist),
                (ItemKey::MusicBrainzReleaseId, &metadata.release_id),
                (ItemKey::MusicBrainzArtistId, &metadata.artist_id),
                (ItemKey::MusicBrainzRecordingId, &metadata.track_id),
            ];
            for (key, value) in keyed {
                match value {
                    Some(v) => {
                        tag.insert_text(key, v.clone());
                    }
                    None => tag.remove_key(&key),
                }
            }
            Ok(())
        })
    }

    fn embed_picture(&self, path: &Path, image: &[u8]) -> Result<(), MetadataError> {
        let mut picture = Picture::from_reader(&mut Cursor::new(image))
            .map_err(|e| Self::write_error(path, format!("unreadable image: {e}")))?;
        picture.set_pic_type(PictureType::CoverFront);

        Self::edit_primary_tag(path, |tag| {
            tag.remove_picture_type(PictureType::CoverFront);
            tag.push_picture(picture);
            Ok(())
        })
    }
}

fn set_or_remove(
    tag: &mut Tag,
    value: Option<&str>,
    set: fn(&mut Tag, String),
    remove: fn(&mut Tag),
) {
    match value {
        Some(v) => set(tag, v.to_string()),
        None => remove(tag),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_non_audio_file_returns_error() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "This is just some text, not music.").expect("Failed to write to temp file");

        let result = LoftyCodec.read_tag(file.path());
        assert!(matches!(result, Err(MetadataError::Read { .. })));
    }

    #[test]
    fn test_read_non_existent_file_returns_error() {
        let result = LoftyCodec.read_tag(Path::new("non_existent_file.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_write_non_audio_file_returns_error() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "Not an audio file").expect("Failed to write");

        let result = LoftyCodec.write_tag(file.path(), &TrackMetadata::default());
        assert!(matches!(result, Err(MetadataError::Write { .. })));
    }

    #[test]
    fn test_embed_rejects_non_image_bytes() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "Not an audio file").expect("Failed to write");

        let result = LoftyCodec.embed_picture(file.path(), b"definitely not an image");
        assert!(result.is_err());
    }

    #[test]
    fn test_memory_codec_round_trip() {
        let codec = mocks::MemoryCodec::new();
        let path = Path::new("/music/a.mp3");
        let meta = TrackMetadata {
            title: Some("A".into()),
            ..Default::default()
        };
        codec.write_tag(path, &meta).unwrap();
        assert_eq!(codec.read_tag(path).unwrap(), meta);

        codec.fail_on(path);
        assert!(codec.write_tag(path, &meta).is_err());
    }
}
