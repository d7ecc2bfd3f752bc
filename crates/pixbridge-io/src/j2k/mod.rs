//! JPEG2000 decoding via OpenJPEG.
//!
//! The codestream decoder itself (header parse, entropy decode, wavelet
//! reconstruction) is OpenJPEG's; this module classifies the container,
//! feeds the decoder from memory through [`stream`], and normalizes the
//! resulting component planes to RGBA8 in [`normalize`].

mod normalize;
mod stream;

use crate::{CodestreamFormat, DecodeError, DecodeResult, Rgba8Image};
use normalize::Plane;
use openjpeg_sys as opj;
use std::cell::RefCell;
use std::ffi::{CStr, c_char, c_void};
use stream::MemStream;

/// Decodes a JP2 or raw J2K byte range into RGBA8.
///
/// `reduce` is the resolution-reduction level: 0 decodes full
/// resolution, 1 half, 2 quarter, and so on.
///
/// # Errors
///
/// [`DecodeError::InvalidArgument`] for an empty input,
/// [`DecodeError::HeaderInvalid`] when neither magic signature matches,
/// and [`DecodeError::DecodeFailed`] / [`DecodeError::AllocationFailed`]
/// for codec-level failures.
pub fn decode(data: &[u8], reduce: u32) -> DecodeResult<Rgba8Image> {
    if data.is_empty() {
        return Err(DecodeError::InvalidArgument("empty input buffer".into()));
    }

    let format = CodestreamFormat::sniff(data).ok_or_else(|| {
        DecodeError::HeaderInvalid(
            "input is not a JP2 container or J2K codestream (signature mismatch)".into(),
        )
    })?;

    // SAFETY: the input slice outlives every OpenJPEG object created
    // below; all raw pointers are destroyed by the guards before return.
    unsafe { decode_with_openjpeg(data, format, reduce) }
}

/// Last message OpenJPEG's error callback delivered for this decode.
struct ErrorSink(RefCell<String>);

impl ErrorSink {
    fn message_or(&self, fallback: &str) -> String {
        let msg = self.0.borrow();
        if msg.is_empty() {
            fallback.to_string()
        } else {
            msg.clone()
        }
    }
}

unsafe extern "C" fn on_error(msg: *const c_char, client_data: *mut c_void) {
    if msg.is_null() || client_data.is_null() {
        return;
    }
    unsafe {
        let sink = &*(client_data as *const ErrorSink);
        let text = CStr::from_ptr(msg).to_string_lossy();
        *sink.0.borrow_mut() = format!("openjpeg: {}", text.trim_end());
    }
}

unsafe extern "C" fn on_warning(msg: *const c_char, _client_data: *mut c_void) {
    if msg.is_null() {
        return;
    }
    unsafe {
        let text = CStr::from_ptr(msg).to_string_lossy();
        tracing::debug!("openjpeg warning: {}", text.trim_end());
    }
}

unsafe extern "C" fn on_info(_msg: *const c_char, _client_data: *mut c_void) {}

struct CodecGuard(*mut opj::opj_codec_t);

impl Drop for CodecGuard {
    fn drop(&mut self) {
        unsafe { opj::opj_destroy_codec(self.0) }
    }
}

struct StreamGuard(*mut opj::opj_stream_t);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        unsafe { opj::opj_stream_destroy(self.0) }
    }
}

struct ImageGuard(*mut opj::opj_image_t);

impl Drop for ImageGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { opj::opj_image_destroy(self.0) }
        }
    }
}

unsafe fn decode_with_openjpeg(
    data: &[u8],
    format: CodestreamFormat,
    reduce: u32,
) -> DecodeResult<Rgba8Image> {
    let codec_format = match format {
        CodestreamFormat::Jp2 => opj::CODEC_FORMAT::OPJ_CODEC_JP2,
        CodestreamFormat::J2k => opj::CODEC_FORMAT::OPJ_CODEC_J2K,
    };

    unsafe {
        let codec = CodecGuard(opj::opj_create_decompress(codec_format));
        if codec.0.is_null() {
            return Err(DecodeError::AllocationFailed(
                "cannot create OpenJPEG decompressor".into(),
            ));
        }

        let sink = ErrorSink(RefCell::new(String::new()));
        let sink_ptr = &sink as *const ErrorSink as *mut c_void;
        opj::opj_set_error_handler(codec.0, Some(on_error), sink_ptr);
        opj::opj_set_warning_handler(codec.0, Some(on_warning), std::ptr::null_mut());
        opj::opj_set_info_handler(codec.0, Some(on_info), std::ptr::null_mut());

        let mut params: opj::opj_dparameters_t = std::mem::zeroed();
        opj::opj_set_default_decoder_parameters(&mut params);
        params.cp_reduce = reduce;

        if opj::opj_setup_decoder(codec.0, &mut params) == 0 {
            return Err(DecodeError::DecodeFailed(
                sink.message_or("opj_setup_decoder failed"),
            ));
        }

        let mut mem = MemStream::new(data);
        let opj_stream = StreamGuard(stream::create_stream(&mut mem));
        if opj_stream.0.is_null() {
            return Err(DecodeError::AllocationFailed(
                "cannot create OpenJPEG memory stream".into(),
            ));
        }

        let mut raw_image: *mut opj::opj_image_t = std::ptr::null_mut();
        if opj::opj_read_header(opj_stream.0, codec.0, &mut raw_image) == 0 || raw_image.is_null()
        {
            let _ = ImageGuard(raw_image);
            return Err(DecodeError::DecodeFailed(
                sink.message_or("opj_read_header failed"),
            ));
        }
        let image = ImageGuard(raw_image);

        if opj::opj_decode(codec.0, opj_stream.0, image.0) == 0 {
            return Err(DecodeError::DecodeFailed(
                sink.message_or("opj_decode failed"),
            ));
        }

        let (width, height, planes) = collect_planes(&*image.0)?;
        let pixels = normalize::interleave_rgba8(&planes, width, height)?;

        Ok(Rgba8Image {
            width: width as u32,
            height: height as u32,
            stride: width * 4,
            pixels,
        })
    }
}

/// Validates the decoded image and borrows its component planes.
unsafe fn collect_planes(image: &opj::opj_image_t) -> DecodeResult<(usize, usize, Vec<Plane<'_>>)> {
    let width = image.x1.checked_sub(image.x0).unwrap_or(0) as usize;
    let height = image.y1.checked_sub(image.y0).unwrap_or(0) as usize;
    if width == 0 || height == 0 {
        return Err(DecodeError::DecodeFailed(format!(
            "decoded image has invalid dimensions {}x{}",
            width, height
        )));
    }
    if image.numcomps == 0 || image.comps.is_null() {
        return Err(DecodeError::DecodeFailed(
            "decoded image has no components".into(),
        ));
    }

    unsafe {
        let comps = std::slice::from_raw_parts(image.comps, image.numcomps as usize);
        let mut planes = Vec::with_capacity(comps.len());
        for comp in comps {
            if comp.data.is_null() || comp.w == 0 || comp.h == 0 {
                return Err(DecodeError::DecodeFailed(
                    "decoded component has no sample data".into(),
                ));
            }
            let len = comp.w as usize * comp.h as usize;
            planes.push(Plane {
                data: std::slice::from_raw_parts(comp.data, len),
                width: comp.w as usize,
                height: comp.h as usize,
                dx: comp.dx.max(1) as usize,
                dy: comp.dy.max(1) as usize,
                prec: comp.prec,
                signed: comp.sgnd != 0,
            });
        }
        Ok((width, height, planes))
    }
}
