//! Box-filter waveform resampling
//!
//! Reduces an intensity sequence of arbitrary length to a target length by
//! averaging input samples into bins of `len / target_length` samples. Bins
//! have fractional widths: the part of a sample that overshoots one bin is
//! carried into the next, so every input sample contributes its full weight
//! exactly once.
//!
//! Inputs shorter than (or equal to) the target are passed through without
//! interpolation. The amplitude is then rescaled relative to the 0..=200
//! intensity scale.

use crate::waveform::MAX_INTENSITY;

/// Preview image width (points)
pub const PREVIEW_WIDTH: usize = 400;

/// Preview image height (pixels); the waveform is mirrored, so amplitude is half
pub const PREVIEW_HEIGHT: u32 = 151;

/// Thumbnail image width (points)
pub const THUMBNAIL_WIDTH: usize = 50;

/// Thumbnail image height (pixels)
pub const THUMBNAIL_HEIGHT: u32 = 21;

/// Resample intensity data to `target_length` points with values scaled to
/// `target_amplitude` (where 200 keeps the original scale).
///
/// The output length is `target_length` give or take one point when the
/// input does not divide evenly; inputs no longer than `target_length` keep
/// their length. Values are rounded to the nearest integer.
pub fn resample(data: &[u8], target_length: usize, target_amplitude: u32) -> Vec<u8> {
    let amplitude_factor = f64::from(target_amplitude) / f64::from(MAX_INTENSITY);

    box_filter(data, target_length)
        .into_iter()
        .map(|v| (v * amplitude_factor + 0.5).clamp(0.0, 255.0) as u8)
        .collect()
}

/// Unscaled box-filter averages
///
/// Exposed separately so callers (and tests) can inspect the bin averages
/// before amplitude rounding.
pub fn box_filter(data: &[u8], target_length: usize) -> Vec<f64> {
    if target_length == 0 {
        return Vec::new();
    }

    let factor = data.len() as f64 / target_length as f64;

    if factor <= 1.0 {
        return data.iter().map(|&v| f64::from(v)).collect();
    }

    let mut output = Vec::with_capacity(target_length + 1);
    let mut weighting = factor;
    let mut value = 0.0;

    for &sample in data {
        let sample = f64::from(sample);

        value += sample * weighting.min(1.0);
        weighting -= 1.0;

        // Bin is full: emit it and carry the overshoot of this sample forward
        if weighting <= 0.0 {
            output.push(value / factor);
            value = -sample * weighting;
            weighting += factor;
        }
    }

    output
}

/// Fixed-width preview (400 points, amplitude 75)
pub fn preview(data: &[u8]) -> Vec<u8> {
    fixed_width(data, PREVIEW_WIDTH, PREVIEW_HEIGHT / 2)
}

/// Fixed-width thumbnail (50 points, amplitude 10)
pub fn thumbnail(data: &[u8]) -> Vec<u8> {
    fixed_width(data, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT / 2)
}

fn fixed_width(data: &[u8], width: usize, amplitude: u32) -> Vec<u8> {
    let mut points = resample(data, width, amplitude);
    points.resize(width, 0);
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_input_keeps_constant() {
        let result = resample(&[10u8; 100], 10, 200);
        assert_eq!(result, vec![10u8; 10]);
    }

    #[test]
    fn test_short_input_passes_through() {
        let data = [0u8, 50, 200, 7];
        assert_eq!(resample(&data, 4, 200), data.to_vec());
        assert_eq!(resample(&data, 100, 200), data.to_vec());
    }

    #[test]
    fn test_zero_target_is_empty() {
        assert!(resample(&[1, 2, 3], 0, 200).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(resample(&[], 16, 200).is_empty());
    }

    #[test]
    fn test_amplitude_rescaling_applies_without_downsampling() {
        // 200 * 75 / 200 = 75; 100 * 0.375 + 0.5 = 38
        assert_eq!(resample(&[200, 100, 0], 10, 75), vec![75, 38, 0]);
    }

    #[test]
    fn test_fractional_bins_carry_weight() {
        // 3 samples into 2 bins: factor 1.5
        // bin 1 = 10 + 0.5 * 20 = 20 -> 20 / 1.5
        // bin 2 = 0.5 * 20 + 30 = 40 -> 40 / 1.5
        let bins = box_filter(&[10, 20, 30], 2);
        assert_eq!(bins.len(), 2);
        assert!((bins[0] - 20.0 / 1.5).abs() < 1e-9);
        assert!((bins[1] - 40.0 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_length_and_weight_conservation() {
        let data: Vec<u8> = (0..997u32).map(|i| ((i * 37) % 201) as u8).collect();
        let total: f64 = data.iter().map(|&v| f64::from(v)).sum();

        for target in [1usize, 2, 7, 16, 50, 333, 400, 996, 997] {
            let bins = box_filter(&data, target);
            assert!(
                bins.len() + 1 >= target && bins.len() <= target + 1,
                "target {} produced {} points",
                target,
                bins.len()
            );

            // At most one partially-filled bin may be left unemitted
            let expected = total * target as f64 / data.len() as f64;
            let actual: f64 = bins.iter().sum();
            assert!(
                (actual - expected).abs() <= 255.0 + 1e-6,
                "target {}: sum {} vs expected {}",
                target,
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_even_division_conserves_exactly() {
        let data: Vec<u8> = (0..120u32).map(|i| (i % 200) as u8).collect();
        let total: f64 = data.iter().map(|&v| f64::from(v)).sum();
        let bins = box_filter(&data, 12);
        assert_eq!(bins.len(), 12);
        let actual: f64 = bins.iter().sum();
        assert!((actual - total / 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_deterministic() {
        let data: Vec<u8> = (0..5000u32).map(|i| ((i * 7919) % 201) as u8).collect();
        assert_eq!(resample(&data, 400, 75), resample(&data, 400, 75));
    }

    #[test]
    fn test_preview_and_thumbnail_are_fixed_width() {
        let long: Vec<u8> = vec![200; 10_000];
        let short: Vec<u8> = vec![200; 5];

        let p = preview(&long);
        assert_eq!(p.len(), PREVIEW_WIDTH);
        assert!(p.iter().all(|&v| v == 75));

        let t = thumbnail(&short);
        assert_eq!(t.len(), THUMBNAIL_WIDTH);
        assert_eq!(&t[..5], &[10, 10, 10, 10, 10]);
        assert!(t[5..].iter().all(|&v| v == 0));
    }
}
