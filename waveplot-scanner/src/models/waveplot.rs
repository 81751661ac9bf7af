//! WavePlot record

use serde::{Deserialize, Serialize};
use waveplot_common::{barcode, resample};

/// One analyzed audio file
///
/// Populated in one shot by the waveform analyzer. Afterwards only the upload
/// touches it, filling in the remote fields (`remote_uuid`, `image_hash`,
/// `thumbnail`, `sonic_hash`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WavePlotRecord {
    /// Track length in whole seconds
    pub duration_seconds: u32,

    /// Length after trimming silence, when known (server-provided)
    pub trimmed_length: Option<u32>,

    pub num_channels: u8,

    pub bit_depth: u16,

    pub bit_rate: u32,

    pub sample_rate: u32,

    /// Container/codec name reported by the engine
    pub source_format: String,

    pub dynamic_range_rating: f32,

    /// Intensity per resampled point, 0..=200; length varies per file
    pub intensity_data: Vec<u8>,

    /// Version of the engine that produced `intensity_data`
    pub engine_version: String,

    /// Server identifier; unset until uploaded
    pub remote_uuid: Option<String>,

    /// SHA-1 of the server-rendered image
    pub image_hash: Option<String>,

    /// Server-rendered thumbnail points
    pub thumbnail: Option<Vec<u8>>,

    pub sonic_hash: Option<String>,
}

impl WavePlotRecord {
    /// True once the server has assigned an identifier
    pub fn is_uploaded(&self) -> bool {
        self.remote_uuid.is_some()
    }

    /// 400-point preview of the intensity data
    pub fn preview(&self) -> Vec<u8> {
        resample::preview(&self.intensity_data)
    }

    /// 50-point thumbnail computed locally
    pub fn generate_thumbnail(&self) -> Vec<u8> {
        resample::thumbnail(&self.intensity_data)
    }

    /// 16-bit barcode of the trimmed intensity data
    pub fn barcode(&self) -> u32 {
        barcode::barcode(&self.intensity_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_not_uploaded() {
        let record = WavePlotRecord::default();
        assert!(!record.is_uploaded());
        assert!(record.image_hash.is_none());
    }

    #[test]
    fn test_derived_views() {
        let mut intensity_data = vec![200u8; 800];
        intensity_data.extend(vec![20u8; 800]);
        let record = WavePlotRecord {
            intensity_data,
            ..Default::default()
        };

        assert_eq!(record.preview().len(), resample::PREVIEW_WIDTH);
        assert_eq!(record.generate_thumbnail().len(), resample::THUMBNAIL_WIDTH);
        assert_eq!(record.barcode(), 0b1111_1111_0000_0000);
    }
}
