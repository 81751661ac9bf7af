//! Scripted analysis engine
//!
//! Records every protocol call so tests can check ordering and that each
//! session is released.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use waveplot_scanner::{
    DecodeStatus, EngineError, EngineSession, EngineStage, StreamInfo, WaveformEngine,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open,
    Load(PathBuf),
    StreamInfo,
    InitDynamicRange,
    GetSamples,
    UpdateWaveform,
    UpdateDynamicRange,
    FinishWaveform,
    FinishDynamicRange,
    Free,
}

/// Called with the 1-based `get_samples` call number
pub type SampleHook = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Clone)]
pub struct Script {
    /// `get_samples` return counts; exhaustion (-1) follows the last one
    pub blocks: Vec<i64>,
    /// Stage that fails for every file
    pub fail_at: Option<EngineStage>,
    /// Loading fails for files with this name
    pub fail_load_for: Option<String>,
    pub info: StreamInfo,
    pub intensities: Vec<f32>,
    pub rating: f32,
    pub hook: Option<SampleHook>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            blocks: vec![4096, 4096, 1024],
            fail_at: None,
            fail_load_for: None,
            info: StreamInfo {
                duration_seconds: 215,
                num_channels: 2,
                bit_depth: 16,
                bit_rate: 320_000,
                sample_rate: 44_100,
                source_format: "mp3".to_string(),
            },
            intensities: vec![0.0, 0.25, 0.5, 1.0, 0.5, 0.25],
            rating: 9.5,
            hook: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    script: Script,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeEngine {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

impl WaveformEngine for FakeEngine {
    fn open_session(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        if self.script.fail_at == Some(EngineStage::Allocate) {
            return Err(EngineError::new(EngineStage::Allocate, "out of handles"));
        }
        self.calls.lock().unwrap().push(Call::Open);
        Ok(Box::new(FakeSession {
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
            samples_calls: 0,
        }))
    }

    fn version(&self) -> String {
        "fake-1.0".to_string()
    }
}

struct FakeSession {
    script: Script,
    calls: Arc<Mutex<Vec<Call>>>,
    samples_calls: usize,
}

impl FakeSession {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, stage: EngineStage) -> Result<(), EngineError> {
        if self.script.fail_at == Some(stage) {
            Err(EngineError::new(stage, "scripted failure"))
        } else {
            Ok(())
        }
    }
}

impl EngineSession for FakeSession {
    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        self.record(Call::Load(path.to_path_buf()));
        if let Some(name) = &self.script.fail_load_for {
            if path.file_name().map(|n| n.to_string_lossy() == *name).unwrap_or(false) {
                return Err(EngineError::new(EngineStage::Load, "unsupported file"));
            }
        }
        self.check(EngineStage::Load)
    }

    fn stream_info(&mut self) -> Result<StreamInfo, EngineError> {
        self.record(Call::StreamInfo);
        self.check(EngineStage::StreamInfo)?;
        Ok(self.script.info.clone())
    }

    fn init_dynamic_range(&mut self) -> Result<(), EngineError> {
        self.record(Call::InitDynamicRange);
        Ok(())
    }

    fn get_samples(&mut self) -> Result<DecodeStatus, EngineError> {
        self.record(Call::GetSamples);
        self.samples_calls += 1;
        if let Some(hook) = &self.script.hook {
            hook(self.samples_calls);
        }
        self.check(EngineStage::Decode)?;

        let count = self
            .script
            .blocks
            .get(self.samples_calls - 1)
            .copied()
            .unwrap_or(-1);
        Ok(DecodeStatus::from_count(count))
    }

    fn update_waveform(&mut self) -> Result<(), EngineError> {
        self.record(Call::UpdateWaveform);
        Ok(())
    }

    fn update_dynamic_range(&mut self) -> Result<(), EngineError> {
        self.record(Call::UpdateDynamicRange);
        Ok(())
    }

    fn finish_waveform(&mut self) -> Result<(), EngineError> {
        self.record(Call::FinishWaveform);
        self.check(EngineStage::Finalize)
    }

    fn finish_dynamic_range(&mut self) -> Result<(), EngineError> {
        self.record(Call::FinishDynamicRange);
        Ok(())
    }

    fn dynamic_range_rating(&self) -> f32 {
        self.script.rating
    }

    fn intensities(&self) -> Vec<f32> {
        self.script.intensities.clone()
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.record(Call::Free);
    }
}
