//! Radiance HDR (RGBE) decoding.
//!
//! Header parsing and RLE scanline decoding are delegated to
//! [`zune_hdr`]; this module sequences the decode and widens the 3-channel
//! RGB output to RGBA with opaque alpha (the format has no alpha channel).

use crate::{DecodeError, DecodeResult, RgbaF32Image};
use std::path::Path;
use zune_hdr::HdrDecoder;

/// Decodes a Radiance HDR file into tightly packed RGBA f32.
///
/// Alpha is always `1.0`.
///
/// # Errors
///
/// Returns [`DecodeError::SourceUnavailable`] if the file cannot be read,
/// [`DecodeError::HeaderInvalid`] for a malformed header, and
/// [`DecodeError::DecodeFailed`] if scanline decoding fails.
pub fn load<P: AsRef<Path>>(path: P) -> DecodeResult<RgbaF32Image> {
    let contents = std::fs::read(path)?;

    let mut decoder = HdrDecoder::new(&contents[..]);
    decoder
        .decode_headers()
        .map_err(|e| DecodeError::HeaderInvalid(format!("HDR header: {}", e)))?;

    let (width, height) = decoder
        .get_dimensions()
        .ok_or_else(|| DecodeError::HeaderInvalid("HDR header carries no dimensions".into()))?;
    if width == 0 || height == 0 {
        return Err(DecodeError::HeaderInvalid(format!(
            "HDR image has degenerate dimensions {}x{}",
            width, height
        )));
    }

    let rgb = decoder
        .decode()
        .map_err(|e| DecodeError::DecodeFailed(format!("HDR scanlines: {}", e)))?;

    Ok(RgbaF32Image {
        width: width as u32,
        height: height as u32,
        pixels: widen_to_rgba(&rgb),
    })
}

/// Interleaves RGB samples into RGBA with alpha forced to 1.0.
fn widen_to_rgba(rgb: &[f32]) -> Vec<f32> {
    let mut pixels = Vec::with_capacity(rgb.len() / 3 * 4);
    for chunk in rgb.chunks_exact(3) {
        pixels.extend_from_slice(chunk);
        pixels.push(1.0);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    /// A 4x2 flat (non-RLE) RGBE file. Width below 8 forces the flat
    /// scanline encoding, so no RLE needs to be synthesized.
    fn flat_rgbe_fixture() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"#?RADIANCE\n");
        data.extend_from_slice(b"FORMAT=32-bit_rle_rgbe\n");
        data.extend_from_slice(b"\n");
        data.extend_from_slice(b"-Y 2 +X 4\n");
        // Exponent 136 makes the mantissa scale 2^0, so the decoded
        // channel value equals the stored byte (to within the decoder's
        // half-bit convention).
        for i in 0..8u8 {
            data.extend_from_slice(&[i * 16, 128, 64, 136]);
        }
        data
    }

    #[test]
    fn load_flat_rgbe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.hdr");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&flat_rgbe_fixture()).unwrap();
        drop(file);

        let image = load(&path).expect("HDR load failed");
        assert_eq!(image.width, 4);
        assert_eq!(image.height, 2);
        assert_eq!(image.pixels.len(), 4 * 2 * 4);

        // Green channel of every pixel was stored as byte 128.
        assert_relative_eq!(image.pixels[1], 128.0, max_relative = 0.01);
        // Alpha is synthesized as fully opaque.
        for pixel in image.pixels.chunks_exact(4) {
            assert_eq!(pixel[3], 1.0);
        }
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let err = load("/nonexistent/probe.hdr").unwrap_err();
        assert!(matches!(err, DecodeError::SourceUnavailable(_)));
    }

    #[test]
    fn garbage_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.hdr");
        std::fs::write(&path, b"not a radiance file at all").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, DecodeError::HeaderInvalid(_)));
    }

    #[test]
    fn widen_keeps_rgb_order() {
        let rgba = widen_to_rgba(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(rgba, vec![0.1, 0.2, 0.3, 1.0, 0.4, 0.5, 0.6, 1.0]);
    }
}
