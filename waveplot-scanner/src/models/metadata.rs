//! Tag-derived metadata

use serde::{Deserialize, Serialize};

/// MusicBrainz identifiers and track position read from a file's tags
///
/// Every field is optional; a file without tags yields `Metadata::default()`.
/// Serialized with the field names the WavePlot context endpoint expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "recording_mbid")]
    pub recording_id: Option<String>,

    #[serde(rename = "release_mbid")]
    pub release_id: Option<String>,

    pub track_number: Option<String>,

    pub disc_number: Option<String>,
}

impl Metadata {
    /// True when no identifier was found
    pub fn is_empty(&self) -> bool {
        self.recording_id.is_none()
            && self.release_id.is_none()
            && self.track_number.is_none()
            && self.disc_number.is_none()
    }
}
