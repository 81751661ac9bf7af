//! Service modules for the scan/upload workflow
//!
//! - **file_scanner**: directory walk and extension filter
//! - **waveform_analyzer**: per-file engine lifecycle
//! - **metadata_extractor**: MusicBrainz tags via lofty
//! - **waveplot_client**: WavePlot server API

pub mod file_scanner;
pub mod metadata_extractor;
pub mod waveform_analyzer;
pub mod waveplot_client;

pub use file_scanner::{FileScanner, ScanError, WalkSummary};
pub use metadata_extractor::{MetadataError, MetadataExtractor};
pub use waveform_analyzer::WaveformAnalyzer;
pub use waveplot_client::{ClientError, UploadOutcome, WavePlotClient};
