//! FFI bindings for the native analysis engine
//!
//! - **libwaveplot**: decoding, waveform accumulation and dynamic-range rating
//! - **buffers**: copying native strings and float buffers into owned values

pub mod buffers;
pub mod libwaveplot;
