//! # WavePlot Common Library
//!
//! Shared code for WavePlot tools including:
//! - Configuration file loading
//! - Waveform image wire encoding (zlib + base64)
//! - Box-filter resampling for storage, previews and thumbnails
//! - Barcode hashing of trimmed waveforms

pub mod barcode;
pub mod config;
pub mod error;
pub mod resample;
pub mod waveform;

pub use error::{Error, Result};
