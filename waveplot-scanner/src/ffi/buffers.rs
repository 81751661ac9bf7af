//! Buffer marshaling between libwaveplot and owned Rust types
//!
//! Everything crossing the boundary is copied into owned values before the
//! native handle that backs it is freed.

use crate::error::{EngineError, EngineStage};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use waveplot_common::waveform::MAX_INTENSITY;

/// Convert a path into a NUL-terminated string for `load_file`
pub fn path_to_c_string(path: &Path) -> Result<CString, EngineError> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path.to_string_lossy().into_owned().into_bytes();

    CString::new(bytes).map_err(|_| {
        EngineError::new(
            EngineStage::Load,
            format!("path contains NUL byte: {}", path.display()),
        )
    })
}

/// Copy a C string owned by the engine (null → empty)
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string valid for the call.
pub unsafe fn c_str_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// Copy a native float buffer (null or zero length → empty)
///
/// # Safety
/// When non-null, `ptr` must be valid for reads of `len` floats.
pub unsafe fn copy_f32_buffer(ptr: *const f32, len: usize) -> Vec<f32> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(ptr, len).to_vec()
}

/// Scale normalized intensities (0.0..=1.0) to the 0..=200 byte scale
///
/// Values are clamped then truncated, so 0.999 becomes 199.
pub fn intensity_to_bytes(values: &[f32]) -> Vec<u8> {
    let scale = f32::from(MAX_INTENSITY);
    values
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * scale) as u8)
        .collect()
}
