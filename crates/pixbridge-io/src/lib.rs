//! # pixbridge-io
//!
//! Decoding of HDR image formats into flat, interleaved RGBA buffers.
//!
//! This crate is the decode half of the pixbridge native bridge. It turns
//! three encoded formats into a uniform pixel layout a host application can
//! consume directly:
//!
//! - **HDR** - Radiance RGBE, decoded via [`zune_hdr`]
//! - **EXR** - OpenEXR, decoded via the [`exr`] crate
//! - **JP2/J2K** - JPEG2000, decoded via OpenJPEG ([`openjpeg_sys`])
//!
//! HDR and EXR produce [`RgbaF32Image`] (4 x f32 per pixel, no padding).
//! JPEG2000 produces [`Rgba8Image`] (4 x u8 per pixel plus an explicit row
//! stride), after normalizing arbitrary component precision, signedness,
//! and chroma subsampling in [`j2k`].
//!
//! The codec libraries are treated as black boxes: this crate sequences
//! them, validates their output, and owns the pixel normalization. Every
//! decode is whole-buffer and synchronous; there is no streaming path.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let image = pixbridge_io::hdr::load("probe.hdr")?;
//! println!("{}x{}", image.width, image.height);
//!
//! let jp2 = pixbridge_io::j2k::decode(&bytes, 0)?;
//! assert_eq!(jp2.pixels.len(), jp2.height as usize * jp2.stride);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;

pub mod detect;
pub mod exr;
pub mod hdr;
pub mod j2k;

pub use detect::CodestreamFormat;
pub use error::{DecodeError, DecodeResult};

/// A decoded image as tightly packed RGBA, 32-bit float per channel.
///
/// Produced by the HDR and EXR loaders. `pixels` is row-major with no
/// padding: its length is always `width * height * 4`.
#[derive(Debug, Clone)]
pub struct RgbaF32Image {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Interleaved RGBA samples, row-major.
    pub pixels: Vec<f32>,
}

/// A decoded image as interleaved RGBA, 8 bits per channel, with an
/// explicit row stride in bytes.
///
/// Produced by the JPEG2000 decoder. This implementation always emits a
/// tight stride (`width * 4`), but callers must use the stride field
/// rather than assuming it.
#[derive(Debug, Clone)]
pub struct Rgba8Image {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Row stride in bytes, `>= width * 4`.
    pub stride: usize,
    /// Interleaved RGBA bytes, `height * stride` long.
    pub pixels: Vec<u8>,
}
