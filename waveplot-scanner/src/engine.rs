//! Analysis engine abstraction
//!
//! The decode/DSP engine is an external collaborator. The scanner only relies
//! on the lifecycle below; [`crate::ffi::libwaveplot::NativeEngine`] drives the
//! real `libwaveplot`, while tests substitute scripted engines.
//!
//! Protocol per file, driven by [`crate::services::waveform_analyzer`]:
//! open session → load → stream info → init dynamic range →
//! `get_samples` until exhausted (feeding both accumulators on every non-empty
//! block) → finish waveform → finish dynamic range → read results → drop.

use crate::error::EngineError;
use std::path::Path;

/// Stream properties reported by the engine after loading a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    pub duration_seconds: u32,
    pub num_channels: u8,
    pub bit_depth: u16,
    pub bit_rate: u32,
    pub sample_rate: u32,
    pub source_format: String,
}

/// Outcome of one `get_samples` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// No more data; stop pulling
    Exhausted,
    /// Nothing decoded this call; keep pulling
    Empty,
    /// N samples decoded into the sample block
    Decoded(usize),
}

impl DecodeStatus {
    /// Interpret the engine's raw return count
    pub fn from_count(count: i64) -> Self {
        match count {
            c if c < 0 => DecodeStatus::Exhausted,
            0 => DecodeStatus::Empty,
            c => DecodeStatus::Decoded(c as usize),
        }
    }
}

/// A loaded analysis engine, shared read-only by all analysis workers
pub trait WaveformEngine: Send + Sync {
    /// Allocate the per-file native resources
    fn open_session(&self) -> Result<Box<dyn EngineSession + '_>, EngineError>;

    /// Engine version string, recorded with every WavePlot
    fn version(&self) -> String;
}

/// Native resources for analyzing one file
///
/// Dropping the session releases every handle it allocated, whatever state
/// the protocol reached.
pub trait EngineSession {
    fn load(&mut self, path: &Path) -> Result<(), EngineError>;

    fn stream_info(&mut self) -> Result<StreamInfo, EngineError>;

    fn init_dynamic_range(&mut self) -> Result<(), EngineError>;

    fn get_samples(&mut self) -> Result<DecodeStatus, EngineError>;

    fn update_waveform(&mut self) -> Result<(), EngineError>;

    fn update_dynamic_range(&mut self) -> Result<(), EngineError>;

    fn finish_waveform(&mut self) -> Result<(), EngineError>;

    fn finish_dynamic_range(&mut self) -> Result<(), EngineError>;

    /// Final dynamic-range rating (valid after `finish_dynamic_range`)
    fn dynamic_range_rating(&self) -> f32;

    /// Accumulated intensity values in 0.0..=1.0 (valid after `finish_waveform`)
    fn intensities(&self) -> Vec<f32>;
}
