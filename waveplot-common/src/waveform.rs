//! Waveform intensity encoding
//!
//! Intensity data is a byte sequence on a 0..=200 scale. At rest it is kept
//! raw; on the wire the upload image is zlib-compressed then base64-encoded,
//! while the `/full` fetch returns plain base64.

use crate::{Error, Result};
use base64::{engine::general_purpose, Engine as _};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Full-scale intensity value
pub const MAX_INTENSITY: u8 = 200;

/// Encode intensity data as the upload image (zlib, then base64)
pub fn encode_image(data: &[u8]) -> Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;
    Ok(general_purpose::STANDARD.encode(compressed))
}

/// Decode an upload image back to raw intensity data
pub fn decode_image(image: &str) -> Result<Vec<u8>> {
    let compressed = decode_base64(image)?;

    let mut data = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut data)
        .map_err(|e| Error::Encoding(format!("zlib: {}", e)))?;
    Ok(data)
}

/// Decode plain base64 intensity data (as returned by the `/full` endpoint)
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Encoding(format!("base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_round_trip() {
        let data: Vec<u8> = (0..=MAX_INTENSITY).chain((0..=MAX_INTENSITY).rev()).collect();
        let image = encode_image(&data).unwrap();
        assert_eq!(decode_image(&image).unwrap(), data);
    }

    #[test]
    fn test_empty_round_trip() {
        let image = encode_image(&[]).unwrap();
        assert!(!image.is_empty(), "zlib framing is present even for empty input");
        assert!(decode_image(&image).unwrap().is_empty());
    }

    #[test]
    fn test_image_is_compressed() {
        let data = vec![100u8; 10_000];
        let image = encode_image(&data).unwrap();
        assert!(image.len() < 1_000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_image("not base64!"), Err(Error::Encoding(_))));
        // Valid base64 but not a zlib stream
        let plain = general_purpose::STANDARD.encode([1u8, 2, 3, 4]);
        assert!(matches!(decode_image(&plain), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_decode_base64_plain() {
        let encoded = general_purpose::STANDARD.encode([0u8, 10, 200]);
        assert_eq!(decode_base64(&encoded).unwrap(), vec![0, 10, 200]);
    }
}
