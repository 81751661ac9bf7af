//! Waveform analysis service
//!
//! Drives one file through the engine lifecycle and packages the result as a
//! [`WavePlotRecord`]. The engine session is owned by this call and dropped
//! on every exit path, which releases all native handles.

use crate::engine::{DecodeStatus, EngineSession, WaveformEngine};
use crate::error::AnalysisError;
use crate::ffi::buffers;
use crate::models::WavePlotRecord;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Analyzes audio files with a shared engine
#[derive(Clone)]
pub struct WaveformAnalyzer {
    engine: Arc<dyn WaveformEngine>,
}

impl WaveformAnalyzer {
    pub fn new(engine: Arc<dyn WaveformEngine>) -> Self {
        Self { engine }
    }

    /// Analyze one file
    ///
    /// Returns `Ok(None)` when `path` is not an existing regular file; that is
    /// a skip, not a failure.
    pub fn analyze(&self, path: &Path) -> Result<Option<WavePlotRecord>, AnalysisError> {
        self.analyze_cancellable(path, &CancellationToken::new())
    }

    /// Analyze one file, checking `cancel` between decode blocks
    pub fn analyze_cancellable(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<WavePlotRecord>, AnalysisError> {
        if !path.is_file() {
            debug!(file = %path.display(), "Not a regular file, skipping");
            return Ok(None);
        }

        let mut session = self.engine.open_session()?;

        session.load(path)?;
        let info = session.stream_info()?;
        session.init_dynamic_range()?;

        // Accumulators exist from here on; seal them even if decoding stops early
        let decoded = decode_all(session.as_mut(), cancel);
        let finished = finish(session.as_mut());
        let blocks = decoded?;
        finished?;

        let intensity_data = buffers::intensity_to_bytes(&session.intensities());

        debug!(
            file = %path.display(),
            blocks,
            points = intensity_data.len(),
            duration_s = info.duration_seconds,
            format = %info.source_format,
            "Analysis complete"
        );

        Ok(Some(WavePlotRecord {
            duration_seconds: info.duration_seconds,
            trimmed_length: None,
            num_channels: info.num_channels,
            bit_depth: info.bit_depth,
            bit_rate: info.bit_rate,
            sample_rate: info.sample_rate,
            source_format: info.source_format,
            dynamic_range_rating: session.dynamic_range_rating(),
            intensity_data,
            engine_version: self.engine.version(),
            remote_uuid: None,
            image_hash: None,
            thumbnail: None,
            sonic_hash: None,
        }))
    }
}

/// Pull sample blocks until the engine reports exhaustion
///
/// Returns the number of non-empty blocks fed to the accumulators.
fn decode_all(
    session: &mut (dyn EngineSession + '_),
    cancel: &CancellationToken,
) -> Result<usize, AnalysisError> {
    let mut blocks = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        match session.get_samples()? {
            DecodeStatus::Exhausted => return Ok(blocks),
            DecodeStatus::Empty => continue,
            DecodeStatus::Decoded(_) => {
                session.update_waveform()?;
                session.update_dynamic_range()?;
                blocks += 1;
            }
        }
    }
}

/// Seal both accumulators, attempting the second even if the first fails
fn finish(session: &mut (dyn EngineSession + '_)) -> Result<(), AnalysisError> {
    let waveform = session.finish_waveform();
    let dynamic_range = session.finish_dynamic_range();
    Ok(waveform.and(dynamic_range)?)
}
