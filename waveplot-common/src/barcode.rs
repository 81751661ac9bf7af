//! Waveform barcode
//!
//! A coarse perceptual fingerprint: leading and trailing near-silence is
//! trimmed, the remaining span is resampled to 16 points at amplitude 1, and
//! the resulting 0/1 values are read as a binary number (first point is the
//! most significant bit).

use crate::resample::resample;

/// Intensities at or below this value count as silence when trimming
pub const SILENCE_THRESHOLD: u8 = 10;

/// Number of points in a barcode
pub const BARCODE_POINTS: usize = 16;

/// Inclusive bounds of the non-silent span of `data`
///
/// Returns the first and last index whose value exceeds [`SILENCE_THRESHOLD`].
/// When nothing exceeds the threshold both bounds are 0, i.e. the span is the
/// first sample alone.
// TODO: revisit the all-silent case; a single-sample span hashes arbitrary noise.
pub fn trimmed_bounds(data: &[u8]) -> (usize, usize) {
    let start = data
        .iter()
        .position(|&v| v > SILENCE_THRESHOLD)
        .unwrap_or(0);
    let end = data
        .iter()
        .rposition(|&v| v > SILENCE_THRESHOLD)
        .unwrap_or(0);
    (start, end)
}

/// The non-silent span of `data` (see [`trimmed_bounds`])
pub fn trimmed(data: &[u8]) -> &[u8] {
    if data.is_empty() {
        return data;
    }
    let (start, end) = trimmed_bounds(data);
    &data[start..=end]
}

/// Compute the barcode of an intensity sequence
///
/// Empty input yields 0. Spans shorter than 16 points produce fewer bits;
/// uneven downsampling may produce one bit more or less than 16.
pub fn barcode(data: &[u8]) -> u32 {
    resample(trimmed(data), BARCODE_POINTS, 1)
        .into_iter()
        .fold(0u32, |acc, bit| (acc << 1) | u32::from(bit.min(1)))
}
