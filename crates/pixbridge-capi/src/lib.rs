//! # pixbridge-capi
//!
//! C ABI for the pixbridge native decode bridge, designed for P/Invoke
//! style callers that cannot use the codec libraries directly.
//!
//! The surface is symmetric across the three codec families:
//!
//! - `load_hdr_rgba` / `free_hdr_pixels` / `get_last_hdr_error`
//! - `load_exr_rgba` / `free_exr_pixels` / `get_last_exr_error`
//! - `decode_j2k_rgba8_from_memory` / `free_j2k_pixels` / `get_last_j2k_error`
//!
//! Every decode entry point returns `bool`; on failure all output
//! parameters are zeroed and a bounded message is left in the calling
//! thread's error slot. On success the slot is cleared. Returned pixel
//! buffers remain owned by a per-family [`registry`], so the free entry
//! points can validate the address instead of trusting it: double frees
//! and foreign pointers degrade to a logged warning, never a crash.
//! Errors are reported through return values only; nothing here panics
//! or unwinds across the boundary.

mod errslot;
mod registry;

use errslot::{ErrorSlot, EXR_ERROR, HDR_ERROR, J2K_ERROR};
use pixbridge_io::{DecodeResult, RgbaF32Image};
use registry::PixelRegistry;
use std::ffi::{c_char, c_int, CStr};
use std::path::Path;
use std::sync::LazyLock;

static HDR_PIXELS: LazyLock<PixelRegistry<f32>> = LazyLock::new(|| PixelRegistry::new("hdr"));
static EXR_PIXELS: LazyLock<PixelRegistry<f32>> = LazyLock::new(|| PixelRegistry::new("exr"));
static J2K_PIXELS: LazyLock<PixelRegistry<u8>> = LazyLock::new(|| PixelRegistry::new("j2k"));

/// Shared sequencing for the two path-based float loaders: validate
/// arguments, zero outputs, decode, register, publish.
unsafe fn load_float_rgba(
    path: *const c_char,
    out_pixels: *mut *mut f32,
    width: *mut c_int,
    height: *mut c_int,
    slot: &'static ErrorSlot,
    registry: &PixelRegistry<f32>,
    load: impl FnOnce(&Path) -> DecodeResult<RgbaF32Image>,
) -> bool {
    if path.is_null() || out_pixels.is_null() || width.is_null() || height.is_null() {
        slot.set("invalid arguments: null pointer passed to decode entry point");
        return false;
    }

    unsafe {
        *out_pixels = std::ptr::null_mut();
        *width = 0;
        *height = 0;

        let path = match CStr::from_ptr(path).to_str() {
            Ok(p) => Path::new(p),
            Err(_) => {
                slot.set("invalid arguments: path is not valid UTF-8");
                return false;
            }
        };

        match load(path) {
            Ok(image) => {
                *width = image.width as c_int;
                *height = image.height as c_int;
                *out_pixels = registry.register(image.pixels);
                slot.clear();
                true
            }
            Err(e) => {
                slot.set(&e.to_string());
                false
            }
        }
    }
}

/// Decodes a Radiance HDR file into a tightly packed RGBA f32 buffer
/// (alpha forced to 1.0).
///
/// On success `*out_pixels` points to `width * height * 4` floats owned
/// by this library; release it with [`free_hdr_pixels`]. On failure the
/// outputs are zeroed and [`get_last_hdr_error`] describes the problem.
///
/// # Safety
///
/// `path` must be a NUL-terminated string; the out parameters must be
/// valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn load_hdr_rgba(
    path: *const c_char,
    out_pixels: *mut *mut f32,
    width: *mut c_int,
    height: *mut c_int,
) -> bool {
    unsafe {
        load_float_rgba(path, out_pixels, width, height, &HDR_ERROR, &HDR_PIXELS, |p| {
            pixbridge_io::hdr::load(p)
        })
    }
}

/// Releases a buffer returned by [`load_hdr_rgba`].
///
/// Null, unknown, and already-freed pointers are diagnosed and ignored.
///
/// # Safety
///
/// Always safe to call; the pointer is validated against the registry
/// before anything is deallocated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_hdr_pixels(ptr: *mut f32) {
    HDR_PIXELS.release(ptr);
}

/// Returns the calling thread's last HDR error message.
///
/// Never null; empty after a successful call. The pointer is valid until
/// the next HDR operation on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn get_last_hdr_error() -> *const c_char {
    HDR_ERROR.as_ptr()
}

/// Decodes the first RGBA layer of an OpenEXR file into a tightly packed
/// RGBA f32 buffer (native alpha where present).
///
/// Same contract as [`load_hdr_rgba`]; release the buffer with
/// [`free_exr_pixels`].
///
/// # Safety
///
/// `path` must be a NUL-terminated string; the out parameters must be
/// valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn load_exr_rgba(
    path: *const c_char,
    out_pixels: *mut *mut f32,
    width: *mut c_int,
    height: *mut c_int,
) -> bool {
    unsafe {
        load_float_rgba(path, out_pixels, width, height, &EXR_ERROR, &EXR_PIXELS, |p| {
            pixbridge_io::exr::load(p)
        })
    }
}

/// Releases a buffer returned by [`load_exr_rgba`].
///
/// # Safety
///
/// Always safe to call; the pointer is validated against the registry
/// before anything is deallocated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_exr_pixels(ptr: *mut f32) {
    EXR_PIXELS.release(ptr);
}

/// Returns the calling thread's last EXR error message.
#[unsafe(no_mangle)]
pub extern "C" fn get_last_exr_error() -> *const c_char {
    EXR_ERROR.as_ptr()
}

/// Decodes an in-memory JP2 container or raw J2K codestream into RGBA8.
///
/// `reduce` selects a resolution-reduction level (0 = full resolution,
/// 1 = half, ...); negative values are clamped to 0. On success
/// `*out_pixels` holds `height * stride_bytes` bytes owned by this
/// library; release it with [`free_j2k_pixels`]. Callers must address
/// rows through `*stride_bytes`, never by assuming `width * 4`.
///
/// # Safety
///
/// `data` must point to `size` readable bytes; the out parameters must
/// be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn decode_j2k_rgba8_from_memory(
    data: *const u8,
    size: usize,
    reduce: c_int,
    out_pixels: *mut *mut u8,
    width: *mut c_int,
    height: *mut c_int,
    stride_bytes: *mut c_int,
) -> bool {
    if data.is_null()
        || size == 0
        || out_pixels.is_null()
        || width.is_null()
        || height.is_null()
        || stride_bytes.is_null()
    {
        J2K_ERROR.set("invalid arguments: null or empty input");
        return false;
    }

    unsafe {
        *out_pixels = std::ptr::null_mut();
        *width = 0;
        *height = 0;
        *stride_bytes = 0;

        let input = std::slice::from_raw_parts(data, size);
        match pixbridge_io::j2k::decode(input, reduce.max(0) as u32) {
            Ok(image) => {
                *width = image.width as c_int;
                *height = image.height as c_int;
                *stride_bytes = image.stride as c_int;
                *out_pixels = J2K_PIXELS.register(image.pixels);
                J2K_ERROR.clear();
                true
            }
            Err(e) => {
                J2K_ERROR.set(&e.to_string());
                false
            }
        }
    }
}

/// Releases a buffer returned by [`decode_j2k_rgba8_from_memory`].
///
/// # Safety
///
/// Always safe to call; the pointer is validated against the registry
/// before anything is deallocated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_j2k_pixels(ptr: *mut u8) {
    J2K_PIXELS.release(ptr);
}

/// Returns the calling thread's last JPEG2000 error message.
#[unsafe(no_mangle)]
pub extern "C" fn get_last_j2k_error() -> *const c_char {
    J2K_ERROR.as_ptr()
}
