//! Data models for waveplot-scanner
//!
//! - `WavePlotRecord`: one analyzed file, later annotated by the upload
//! - `Metadata`: tag-derived identifiers used only for the link call

pub mod metadata;
pub mod waveplot;

pub use metadata::Metadata;
pub use waveplot::WavePlotRecord;
