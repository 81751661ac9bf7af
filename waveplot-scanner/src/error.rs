//! Error types for waveplot-scanner
//!
//! Per-file failures (`EngineError`, `AnalysisError`) are contained by the
//! analysis worker that hit them; they never stop the pipeline.

use std::fmt;
use thiserror::Error;

/// Protocol stage at which the native engine failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    /// Loading the shared library or resolving its symbols
    LoadLibrary,
    /// Allocating a native handle
    Allocate,
    /// Opening the audio file
    Load,
    /// Reading stream information
    StreamInfo,
    /// Pulling and accumulating sample blocks
    Decode,
    /// Sealing the accumulators and reading results
    Finalize,
}

impl fmt::Display for EngineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineStage::LoadLibrary => "load-library",
            EngineStage::Allocate => "allocate",
            EngineStage::Load => "load",
            EngineStage::StreamInfo => "stream-info",
            EngineStage::Decode => "decode",
            EngineStage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Native engine failure, tagged with the stage it occurred in
#[derive(Debug, Error)]
#[error("Engine failed during {stage}: {message}")]
pub struct EngineError {
    pub stage: EngineStage,
    pub message: String,
}

impl EngineError {
    pub fn new(stage: EngineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Failure analyzing one file
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Native engine failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Cancellation was requested between decode blocks
    #[error("Analysis cancelled")]
    Cancelled,
}
