//! Scan/upload workflow
//!
//! One walk feeds N analysis threads through the `paths` queue; analysis
//! threads feed a single upload task through the `results` queue.
//!
//! ```text
//! walk ──paths──▶ [analysis-0 .. analysis-N] ──results──▶ upload ──▶ server
//! ```

pub mod pipeline;

pub use pipeline::{
    AnalyzedFile, Pipeline, PipelineConfig, PipelineError, PipelineEvent, PipelineState,
    PipelineStats,
};
