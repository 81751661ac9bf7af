//! waveplot-scanner library interface
//!
//! Exposes the engine adapter, services and pipeline for the binary and for
//! integration testing.

pub mod config;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::engine::{DecodeStatus, EngineSession, StreamInfo, WaveformEngine};
pub use crate::error::{AnalysisError, EngineError, EngineStage};
pub use crate::models::{Metadata, WavePlotRecord};
