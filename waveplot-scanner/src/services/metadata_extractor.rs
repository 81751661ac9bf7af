//! Tag metadata extraction service
//!
//! Reads MusicBrainz identifiers and track position using lofty.

use crate::models::Metadata;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;
use thiserror::Error;

/// Metadata extraction errors
#[derive(Debug, Error)]
pub enum MetadataError {
    /// File could not be probed or parsed
    #[error("Failed to read file: {0}")]
    ReadError(String),

    /// File has no tags at all
    #[error("No metadata found")]
    NoMetadata,
}

/// Metadata extractor service
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract tag metadata from an audio file
    pub fn extract(&self, file_path: &Path) -> Result<Metadata, MetadataError> {
        let tagged_file = Probe::open(file_path)
            .map_err(|e| MetadataError::ReadError(e.to_string()))?
            .read()
            .map_err(|e| MetadataError::ReadError(e.to_string()))?;

        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .ok_or(MetadataError::NoMetadata)?;

        let metadata = metadata_from_tag(tag);

        tracing::debug!(
            file = %file_path.display(),
            recording = ?metadata.recording_id,
            release = ?metadata.release_id,
            "Extracted metadata"
        );

        Ok(metadata)
    }

    /// Extract metadata, falling back to empty metadata on any failure
    pub fn extract_or_default(&self, file_path: &Path) -> Metadata {
        match self.extract(file_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!(file = %file_path.display(), "No tag metadata: {}", e);
                Metadata::default()
            }
        }
    }
}

fn metadata_from_tag(tag: &Tag) -> Metadata {
    let text = |key: &ItemKey| tag.get_string(key).map(|s| s.to_string());

    Metadata {
        recording_id: text(&ItemKey::MusicBrainzRecordingId),
        release_id: text(&ItemKey::MusicBrainzReleaseId),
        track_number: text(&ItemKey::TrackNumber),
        disc_number: text(&ItemKey::DiscNumber),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofty::tag::TagType;

    #[test]
    fn test_extract_nonexistent_file() {
        let extractor = MetadataExtractor::new();
        let result = extractor.extract(Path::new("/nonexistent/file.mp3"));
        assert!(matches!(result, Err(MetadataError::ReadError(_))));
    }

    #[test]
    fn test_unparseable_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let metadata = MetadataExtractor::new().extract_or_default(&path);
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_metadata_from_tag() {
        let mut tag = Tag::new(TagType::VorbisComments);
        tag.insert_text(ItemKey::MusicBrainzRecordingId, "rec-mbid".to_string());
        tag.insert_text(ItemKey::MusicBrainzReleaseId, "rel-mbid".to_string());
        tag.insert_text(ItemKey::TrackNumber, "7".to_string());

        let metadata = metadata_from_tag(&tag);
        assert_eq!(metadata.recording_id.as_deref(), Some("rec-mbid"));
        assert_eq!(metadata.release_id.as_deref(), Some("rel-mbid"));
        assert_eq!(metadata.track_number.as_deref(), Some("7"));
        assert_eq!(metadata.disc_number, None);
    }
}
