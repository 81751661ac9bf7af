//! libwaveplot FFI wrapper
//!
//! The library is loaded at runtime with `libloading`, so the scanner builds
//! and tests without libwaveplot installed. All symbols are resolved once in
//! [`WavePlotLibrary::load`]; a missing symbol is a start-up error rather than
//! a failure halfway through a scan.
//!
//! # Safety
//! Raw handles never leave [`NativeSession`]. Each session allocates its own
//! handles, so sessions on different threads share nothing but the function
//! table.

use crate::engine::{DecodeStatus, EngineSession, StreamInfo, WaveformEngine};
use crate::error::{EngineError, EngineStage};
use crate::ffi::buffers;
use libloading::Library;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;
use tracing::{debug, info};

// ============================================================================
// Native structures
// ============================================================================

/// Opaque decoder state (libav internals)
#[repr(C)]
pub struct RawFile {
    _private: [u8; 0],
}

#[repr(C)]
pub struct RawInfo {
    pub duration_secs: u32,
    pub num_channels: u8,
    pub bit_depth: u16,
    pub bit_rate: u32,
    pub sample_rate: u32,
    pub file_format: *const c_char,
}

/// One decoded block, planar per channel
#[repr(C)]
pub struct RawAudioSamples {
    pub samples: *mut *mut f32,
    pub num_channels: usize,
    pub length: usize,
}

#[repr(C)]
pub struct RawDr {
    pub channel_peak: *mut *mut f32,
    pub channel_rms: *mut *mut f32,
    pub num_channels: usize,
    pub length: usize,
    pub rating: f32,
    pub capacity: usize,
    pub processed_samples: usize,
}

#[repr(C)]
pub struct RawWavePlot {
    pub values: *mut f32,
    pub resample: *mut f32,
    pub length: usize,
    pub capacity: usize,
}

// ============================================================================
// Function table
// ============================================================================

type AllocFn<T> = unsafe extern "C" fn() -> *mut T;
type FreeFn<T> = unsafe extern "C" fn(*mut T);

struct WavePlotApi {
    init: unsafe extern "C" fn(),
    version: unsafe extern "C" fn() -> *const c_char,

    alloc_file: AllocFn<RawFile>,
    alloc_info: AllocFn<RawInfo>,
    alloc_audio_samples: AllocFn<RawAudioSamples>,
    alloc_waveplot: AllocFn<RawWavePlot>,
    alloc_dr: AllocFn<RawDr>,

    free_file: FreeFn<RawFile>,
    free_info: FreeFn<RawInfo>,
    free_audio_samples: FreeFn<RawAudioSamples>,
    free_waveplot: FreeFn<RawWavePlot>,
    free_dr: FreeFn<RawDr>,

    load_file: unsafe extern "C" fn(*const c_char, *mut RawFile) -> c_int,
    get_info: unsafe extern "C" fn(*mut RawInfo, *mut RawFile) -> c_int,
    init_dr: unsafe extern "C" fn(*mut RawDr, *mut RawInfo),
    get_samples: unsafe extern "C" fn(*mut RawAudioSamples, *mut RawFile, *mut RawInfo) -> c_int,
    update_waveplot: unsafe extern "C" fn(*mut RawWavePlot, *mut RawAudioSamples, *mut RawInfo),
    update_dr: unsafe extern "C" fn(*mut RawDr, *mut RawAudioSamples, *mut RawInfo),
    finish_waveplot: unsafe extern "C" fn(*mut RawWavePlot),
    finish_dr: unsafe extern "C" fn(*mut RawDr, *mut RawInfo),
}

/// Resolve one symbol and copy the function pointer out of the library
///
/// # Safety
/// `T` must match the C signature of `name`.
unsafe fn symbol<T: Copy>(lib: &Library, name: &'static str) -> Result<T, EngineError> {
    lib.get::<T>(name.as_bytes())
        .map(|s| *s)
        .map_err(|e| EngineError::new(EngineStage::LoadLibrary, format!("{}: {}", name, e)))
}

// ============================================================================
// Library
// ============================================================================

/// Dynamically loaded libwaveplot with its resolved function table
pub struct WavePlotLibrary {
    api: WavePlotApi,
    /// Must outlive every call through `api`
    _lib: Library,
}

impl std::fmt::Debug for WavePlotLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavePlotLibrary")
            .field("loaded", &true)
            .finish()
    }
}

impl WavePlotLibrary {
    /// Load libwaveplot by name or path and initialise it
    pub fn load(name_or_path: &str) -> Result<Self, EngineError> {
        info!(library = %name_or_path, "Loading libwaveplot");

        // SAFETY: loading a shared library runs its initialisers; libwaveplot's
        // only register codecs.
        let lib = unsafe { Library::new(name_or_path) }.map_err(|e| {
            EngineError::new(
                EngineStage::LoadLibrary,
                format!("Failed to load {}: {}", name_or_path, e),
            )
        })?;

        // SAFETY: every signature below matches waveplot.h.
        let api = unsafe {
            WavePlotApi {
                init: symbol(&lib, "init\0")?,
                version: symbol(&lib, "version\0")?,
                alloc_file: symbol(&lib, "alloc_file\0")?,
                alloc_info: symbol(&lib, "alloc_info\0")?,
                alloc_audio_samples: symbol(&lib, "alloc_audio_samples\0")?,
                alloc_waveplot: symbol(&lib, "alloc_waveplot\0")?,
                alloc_dr: symbol(&lib, "alloc_dr\0")?,
                free_file: symbol(&lib, "free_file\0")?,
                free_info: symbol(&lib, "free_info\0")?,
                free_audio_samples: symbol(&lib, "free_audio_samples\0")?,
                free_waveplot: symbol(&lib, "free_waveplot\0")?,
                free_dr: symbol(&lib, "free_dr\0")?,
                load_file: symbol(&lib, "load_file\0")?,
                get_info: symbol(&lib, "get_info\0")?,
                init_dr: symbol(&lib, "init_dr\0")?,
                get_samples: symbol(&lib, "get_samples\0")?,
                update_waveplot: symbol(&lib, "update_waveplot\0")?,
                update_dr: symbol(&lib, "update_dr\0")?,
                finish_waveplot: symbol(&lib, "finish_waveplot\0")?,
                finish_dr: symbol(&lib, "finish_dr\0")?,
            }
        };

        // SAFETY: global codec registration, called once per library load
        unsafe { (api.init)() };

        Ok(Self { api, _lib: lib })
    }
}

// ============================================================================
// Engine
// ============================================================================

/// [`WaveformEngine`] backed by libwaveplot
#[derive(Debug)]
pub struct NativeEngine {
    library: WavePlotLibrary,
}

impl NativeEngine {
    pub fn new(library: WavePlotLibrary) -> Self {
        Self { library }
    }

    /// Load the library and wrap it
    pub fn load(name_or_path: &str) -> Result<Self, EngineError> {
        let engine = Self::new(WavePlotLibrary::load(name_or_path)?);
        info!(version = %engine.version(), "libwaveplot ready");
        Ok(engine)
    }
}

impl WaveformEngine for NativeEngine {
    fn open_session(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        Ok(Box::new(NativeSession::open(&self.library.api)?))
    }

    fn version(&self) -> String {
        // SAFETY: returns a pointer to a static string
        unsafe { buffers::c_str_to_string((self.library.api.version)()) }
    }
}

// ============================================================================
// Session (RAII)
// ============================================================================

/// The five native handles used for one file
///
/// Handles are allocated in [`NativeSession::open`] and freed in `Drop`, so a
/// failure at any stage (including allocation itself) releases everything
/// that was allocated. Not `Send`: a session lives on the worker thread that
/// opened it.
struct NativeSession<'a> {
    api: &'a WavePlotApi,
    file: *mut RawFile,
    info: *mut RawInfo,
    samples: *mut RawAudioSamples,
    waveplot: *mut RawWavePlot,
    dr: *mut RawDr,
    /// `load_file` may keep the path pointer; keep it alive with the handles
    path: Option<CString>,
}

fn allocated<T>(handle: *mut T, name: &str) -> Result<*mut T, EngineError> {
    if handle.is_null() {
        Err(EngineError::new(
            EngineStage::Allocate,
            format!("{} returned null", name),
        ))
    } else {
        Ok(handle)
    }
}

impl<'a> NativeSession<'a> {
    fn open(api: &'a WavePlotApi) -> Result<Self, EngineError> {
        let mut session = Self {
            api,
            file: ptr::null_mut(),
            info: ptr::null_mut(),
            samples: ptr::null_mut(),
            waveplot: ptr::null_mut(),
            dr: ptr::null_mut(),
            path: None,
        };

        // SAFETY: allocators take no arguments; results checked for null.
        // On early return `session` drops and frees what was allocated.
        unsafe {
            session.file = allocated((api.alloc_file)(), "alloc_file")?;
            session.info = allocated((api.alloc_info)(), "alloc_info")?;
            session.waveplot = allocated((api.alloc_waveplot)(), "alloc_waveplot")?;
            session.dr = allocated((api.alloc_dr)(), "alloc_dr")?;
            session.samples = allocated((api.alloc_audio_samples)(), "alloc_audio_samples")?;
        }

        Ok(session)
    }
}

impl EngineSession for NativeSession<'_> {
    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        let c_path = buffers::path_to_c_string(path)?;

        // SAFETY: both pointers valid; c_path is stored in self below
        let result = unsafe { (self.api.load_file)(c_path.as_ptr(), self.file) };
        self.path = Some(c_path);

        if result < 0 {
            return Err(EngineError::new(
                EngineStage::Load,
                format!("load_file returned {}", result),
            ));
        }
        Ok(())
    }

    fn stream_info(&mut self) -> Result<StreamInfo, EngineError> {
        // SAFETY: handles allocated in open(); file loaded by caller
        let result = unsafe { (self.api.get_info)(self.info, self.file) };
        if result < 0 {
            return Err(EngineError::new(
                EngineStage::StreamInfo,
                format!("get_info returned {}", result),
            ));
        }

        // SAFETY: info is a valid, initialised handle
        let info = unsafe { &*self.info };
        Ok(StreamInfo {
            duration_seconds: info.duration_secs,
            num_channels: info.num_channels,
            bit_depth: info.bit_depth,
            bit_rate: info.bit_rate,
            sample_rate: info.sample_rate,
            // SAFETY: file_format is null or a string owned by the file handle
            source_format: unsafe { buffers::c_str_to_string(info.file_format) },
        })
    }

    fn init_dynamic_range(&mut self) -> Result<(), EngineError> {
        // SAFETY: handles valid; info populated by stream_info()
        unsafe { (self.api.init_dr)(self.dr, self.info) };
        Ok(())
    }

    fn get_samples(&mut self) -> Result<DecodeStatus, EngineError> {
        // SAFETY: handles valid for the session lifetime
        let count = unsafe { (self.api.get_samples)(self.samples, self.file, self.info) };
        Ok(DecodeStatus::from_count(i64::from(count)))
    }

    fn update_waveform(&mut self) -> Result<(), EngineError> {
        // SAFETY: sample block filled by the preceding get_samples()
        unsafe { (self.api.update_waveplot)(self.waveplot, self.samples, self.info) };
        Ok(())
    }

    fn update_dynamic_range(&mut self) -> Result<(), EngineError> {
        // SAFETY: as above
        unsafe { (self.api.update_dr)(self.dr, self.samples, self.info) };
        Ok(())
    }

    fn finish_waveform(&mut self) -> Result<(), EngineError> {
        // SAFETY: handle valid
        unsafe { (self.api.finish_waveplot)(self.waveplot) };
        Ok(())
    }

    fn finish_dynamic_range(&mut self) -> Result<(), EngineError> {
        // SAFETY: handles valid
        unsafe { (self.api.finish_dr)(self.dr, self.info) };
        Ok(())
    }

    fn dynamic_range_rating(&self) -> f32 {
        // SAFETY: handle valid
        unsafe { (*self.dr).rating }
    }

    fn intensities(&self) -> Vec<f32> {
        // SAFETY: values/length describe the accumulator's own buffer
        unsafe {
            let waveplot = &*self.waveplot;
            buffers::copy_f32_buffer(waveplot.values, waveplot.length)
        }
    }
}

impl Drop for NativeSession<'_> {
    fn drop(&mut self) {
        // SAFETY: each handle is either null or was returned by the matching
        // allocator and has not been freed yet
        unsafe {
            if !self.dr.is_null() {
                (self.api.free_dr)(self.dr);
            }
            if !self.waveplot.is_null() {
                (self.api.free_waveplot)(self.waveplot);
            }
            if !self.samples.is_null() {
                (self.api.free_audio_samples)(self.samples);
            }
            if !self.info.is_null() {
                (self.api.free_info)(self.info);
            }
            if !self.file.is_null() {
                (self.api.free_file)(self.file);
            }
        }
        debug!("Engine session released");
    }
}
