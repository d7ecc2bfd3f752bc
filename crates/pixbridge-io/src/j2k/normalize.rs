//! Component normalization for decoded JPEG2000 images.
//!
//! OpenJPEG hands back one plane per component, each with its own
//! precision, signedness, and subsample factors. This module rescales
//! every sample to 8 bits and interleaves the planes into tight RGBA8.
//!
//! Channel interpretation is by component count alone: 1 = gray,
//! 2 = gray + alpha, 3 = RGB, 4 or more = RGB + alpha in component 3,
//! extras ignored. This deliberately does not consult the container's
//! channel-definition metadata; real assets with unconventional channel
//! counts rely on this exact heuristic.

use crate::{DecodeError, DecodeResult};

/// One decoded component plane, borrowed from the codec's image.
pub(crate) struct Plane<'a> {
    /// Samples, row-major, `width * height` long.
    pub data: &'a [i32],
    /// Plane width (already reduced by subsampling, if any).
    pub width: usize,
    /// Plane height.
    pub height: usize,
    /// Horizontal subsample factor.
    pub dx: usize,
    /// Vertical subsample factor.
    pub dy: usize,
    /// Sample precision in bits.
    pub prec: u32,
    /// Whether samples are signed.
    pub signed: bool,
}

impl Plane<'_> {
    /// True when this plane maps 1:1 onto the output raster.
    fn is_full_res(&self, width: usize, height: usize) -> bool {
        self.dx == 1 && self.dy == 1 && self.width == width && self.height == height
    }
}

/// Precomputed rescale parameters for one plane.
#[derive(Debug, Clone, Copy)]
struct Scale {
    max: i64,
    bias: i64,
}

impl Scale {
    fn new(prec: u32, signed: bool) -> Self {
        // Zero precision would divide by zero and anything past 30 bits
        // would overflow the shift; fall back to 8 bits / clamp to 30,
        // matching the codec's own sanity limits.
        let prec = if prec == 0 { 8 } else { prec.min(30) };
        let max = (1i64 << prec) - 1;
        let bias = if signed { 1i64 << (prec - 1) } else { 0 };
        Scale { max, bias }
    }

    /// Rescales one sample to `[0, 255]`, rounding half up.
    fn apply(self, sample: i32) -> u8 {
        let v = i64::from(sample) + self.bias;
        ((v * 255 + self.max / 2) / self.max).clamp(0, 255) as u8
    }
}

/// Interleaves component planes into tight RGBA8 (`stride = width * 4`).
///
/// Chooses the fast lock-step path when every participating plane is at
/// full resolution, otherwise falls back to per-pixel coordinate
/// remapping that handles chroma subsampling correctly. Alpha defaults
/// to 255 when no alpha plane exists; gray replicates into R, G, and B.
pub(crate) fn interleave_rgba8(
    planes: &[Plane<'_>],
    width: usize,
    height: usize,
) -> DecodeResult<Vec<u8>> {
    let (rgb, alpha) = select_channels(planes)?;

    for plane in rgb.iter().copied().chain(alpha) {
        if plane.width == 0 || plane.height == 0 {
            return Err(DecodeError::DecodeFailed(
                "component plane has degenerate dimensions".into(),
            ));
        }
        if plane.data.len() < plane.width * plane.height {
            return Err(DecodeError::DecodeFailed(
                "component buffer shorter than its declared size".into(),
            ));
        }
    }

    let fast = rgb
        .iter()
        .copied()
        .chain(alpha)
        .all(|p| p.is_full_res(width, height));

    let mut out = vec![0u8; width * height * 4];
    if fast {
        fill_fast(&mut out, rgb, alpha);
    } else {
        fill_slow(&mut out, rgb, alpha, width, height);
    }
    Ok(out)
}

/// Maps component planes to RGB sources plus an optional alpha source.
fn select_channels<'a, 'p>(
    planes: &'a [Plane<'p>],
) -> DecodeResult<([&'a Plane<'p>; 3], Option<&'a Plane<'p>>)> {
    match planes {
        [] => Err(DecodeError::DecodeFailed(
            "decoded image has no components".into(),
        )),
        [gray] => Ok(([gray, gray, gray], None)),
        [gray, alpha] => Ok(([gray, gray, gray], Some(alpha))),
        [r, g, b] => Ok(([r, g, b], None)),
        [r, g, b, alpha, ..] => Ok(([r, g, b], Some(alpha))),
    }
}

/// Lock-step traversal; valid only when every plane is full resolution.
fn fill_fast(out: &mut [u8], rgb: [&Plane<'_>; 3], alpha: Option<&Plane<'_>>) {
    let scales = rgb.map(|p| Scale::new(p.prec, p.signed));
    let alpha_scale = alpha.map(|p| Scale::new(p.prec, p.signed));

    for (i, pixel) in out.chunks_exact_mut(4).enumerate() {
        pixel[0] = scales[0].apply(rgb[0].data[i]);
        pixel[1] = scales[1].apply(rgb[1].data[i]);
        pixel[2] = scales[2].apply(rgb[2].data[i]);
        pixel[3] = match (alpha, alpha_scale) {
            (Some(a), Some(s)) => s.apply(a.data[i]),
            _ => 255,
        };
    }
}

/// Per-pixel remapping; handles subsampled planes at any factor.
fn fill_slow(out: &mut [u8], rgb: [&Plane<'_>; 3], alpha: Option<&Plane<'_>>, width: usize, height: usize) {
    let scales = rgb.map(|p| Scale::new(p.prec, p.signed));
    let alpha_scale = alpha.map(|p| Scale::new(p.prec, p.signed));

    for y in 0..height {
        let row = &mut out[y * width * 4..(y + 1) * width * 4];
        for x in 0..width {
            let pixel = &mut row[x * 4..x * 4 + 4];
            pixel[0] = sample(rgb[0], scales[0], x, y);
            pixel[1] = sample(rgb[1], scales[1], x, y);
            pixel[2] = sample(rgb[2], scales[2], x, y);
            pixel[3] = match (alpha, alpha_scale) {
                (Some(a), Some(s)) => sample(a, s, x, y),
                _ => 255,
            };
        }
    }
}

/// Samples a plane at output coordinates, respecting its subsample
/// factors and clamping to its bounds (the plane can be one sample short
/// at the edge when the image size is not a multiple of the factor).
fn sample(plane: &Plane<'_>, scale: Scale, x: usize, y: usize) -> u8 {
    let cx = (x / plane.dx.max(1)).min(plane.width - 1);
    let cy = (y / plane.dy.max(1)).min(plane.height - 1);
    scale.apply(plane.data[cy * plane.width + cx])
}
