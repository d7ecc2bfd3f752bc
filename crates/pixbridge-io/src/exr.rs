//! OpenEXR decoding.
//!
//! Scanline reading, decompression, and the worker threads behind it are
//! the [`exr`] crate's business; this module resolves the worker count
//! once per process, sequences the read, and flattens the first RGBA
//! layer into a tight f32 buffer.

use crate::{DecodeError, DecodeResult, RgbaF32Image};
use exr::prelude::*;
use std::path::Path;
use std::sync::OnceLock;

/// Worker thread count for EXR decompression, resolved once per process.
static EXR_THREADS: OnceLock<usize> = OnceLock::new();

/// Resolves the decompression worker count from hardware concurrency,
/// minimum 1. Idempotent; only the first call does any work.
fn worker_threads() -> usize {
    *EXR_THREADS.get_or_init(|| {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        tracing::debug!("using {} threads for EXR decode", threads);
        threads
    })
}

/// Decodes the first RGBA layer of an EXR file into tightly packed
/// RGBA f32. Alpha comes from the file where present, else 1.0.
///
/// # Errors
///
/// Returns [`DecodeError::SourceUnavailable`] if the file cannot be
/// opened and [`DecodeError::DecodeFailed`] for any codec-level failure.
pub fn load<P: AsRef<Path>>(path: P) -> DecodeResult<RgbaF32Image> {
    let path = path.as_ref();

    // The exr crate folds open errors into its own error type; probing the
    // file first keeps "missing file" distinguishable from "corrupt file".
    std::fs::File::open(path)?;

    let reader = read()
        .no_deep_data()
        .largest_resolution_level()
        .rgba_channels(
            |resolution, _| {
                let width = resolution.width();
                let size = width * resolution.height();
                (width, vec![(0.0f32, 0.0f32, 0.0f32, 1.0f32); size])
            },
            |(width, buffer), position, (r, g, b, a): (f32, f32, f32, f32)| {
                let idx = position.y() * *width + position.x();
                if idx < buffer.len() {
                    buffer[idx] = (r, g, b, a);
                }
            },
        )
        .first_valid_layer()
        .all_attributes();

    let image = if worker_threads() > 1 {
        reader.from_file(path)
    } else {
        reader.non_parallel().from_file(path)
    }
    .map_err(|e| DecodeError::DecodeFailed(format!("EXR decode: {}", e)))?;

    let width = image.layer_data.size.width() as u32;
    let height = image.layer_data.size.height() as u32;
    let (_, ref pixel_data) = image.layer_data.channel_data.pixels;

    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for &(r, g, b, a) in pixel_data {
        pixels.push(r);
        pixels.push(g);
        pixels.push(b);
        pixels.push(a);
    }

    Ok(RgbaF32Image {
        width,
        height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn write_gradient_exr(path: &Path, width: usize, height: usize) {
        let layer = Layer::new(
            (width, height),
            LayerAttributes::named("RGBA"),
            Encoding::SMALL_LOSSLESS,
            SpecificChannels::rgba(|pos: Vec2<usize>| {
                (
                    pos.x() as f32 / width as f32,
                    pos.y() as f32 / height as f32,
                    0.25f32,
                    1.0f32,
                )
            }),
        );
        Image::from_layer(layer)
            .write()
            .to_file(path)
            .expect("EXR write failed");
    }

    #[test]
    fn load_rgba_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradient.exr");
        write_gradient_exr(&path, 16, 8);

        let image = load(&path).expect("EXR load failed");
        assert_eq!(image.width, 16);
        assert_eq!(image.height, 8);
        assert_eq!(image.pixels.len(), 16 * 8 * 4);

        // Pixel (4, 2): r = 4/16, g = 2/8, b = 0.25, a = 1.
        let idx = (2 * 16 + 4) * 4;
        assert_relative_eq!(image.pixels[idx], 0.25, epsilon = 1e-5);
        assert_relative_eq!(image.pixels[idx + 1], 0.25, epsilon = 1e-5);
        assert_relative_eq!(image.pixels[idx + 2], 0.25, epsilon = 1e-5);
        assert_eq!(image.pixels[idx + 3], 1.0);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let err = load("/nonexistent/render.exr").unwrap_err();
        assert!(matches!(err, DecodeError::SourceUnavailable(_)));
    }

    #[test]
    fn corrupt_file_is_decode_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.exr");
        std::fs::write(&path, b"\x76\x2f\x31\x01 definitely not scanlines").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, DecodeError::DecodeFailed(_)));
    }

    #[test]
    fn worker_count_is_stable() {
        let first = worker_threads();
        assert!(first >= 1);
        assert_eq!(worker_threads(), first);
    }
}
