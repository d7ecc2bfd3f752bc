//! In-memory byte stream adapter for the OpenJPEG decoder.
//!
//! OpenJPEG pulls its input through read/skip/seek callbacks on an
//! `opj_stream_t`. This adapter serves those callbacks from a fixed byte
//! range owned by the caller, so decoding from memory never touches the
//! filesystem. A single cursor is the only state; the stream never grows
//! and never copies the input.

use openjpeg_sys as opj;
use std::ffi::c_void;

/// OpenJPEG's read-buffer size for this stream, as in the reference
/// decoders.
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// A cursor over a fixed byte range, handed to OpenJPEG as user data.
///
/// The struct must stay alive (and pinned in place) for as long as the
/// `opj_stream_t` built from it exists; [`super`]'s orchestrator keeps it
/// on the stack across the whole decode.
pub(crate) struct MemStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemStream<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        MemStream { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads up to `max_bytes`, returning 0 at end-of-data.
    fn read(&mut self, buffer: &mut [u8]) -> usize {
        let to_read = buffer.len().min(self.remaining());
        if to_read > 0 {
            buffer[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
            self.pos += to_read;
        }
        to_read
    }

    /// Advances the cursor; fails if the skip would pass the end.
    fn skip(&mut self, count: i64) -> bool {
        if count <= 0 || count as u64 > self.remaining() as u64 {
            return false;
        }
        self.pos += count as usize;
        true
    }

    /// Repositions the cursor absolutely. Backward seeks are legal; only
    /// negative or past-end positions fail.
    fn seek(&mut self, position: i64) -> bool {
        if position < 0 || position as u64 > self.data.len() as u64 {
            return false;
        }
        self.pos = position as usize;
        true
    }
}

/// Builds an `opj_stream_t` that pulls from `mem`.
///
/// Returns null if OpenJPEG cannot allocate the stream. The caller must
/// destroy the stream with `opj_stream_destroy` and must not outlive
/// `mem` with it.
pub(crate) unsafe fn create_stream(mem: &mut MemStream<'_>) -> *mut opj::opj_stream_t {
    unsafe {
        let stream = opj::opj_stream_create(STREAM_BUFFER_SIZE, opj::OPJ_TRUE as i32);
        if stream.is_null() {
            return stream;
        }

        let user_data = mem as *mut MemStream<'_> as *mut c_void;
        opj::opj_stream_set_user_data(stream, user_data, Some(mem_free));
        opj::opj_stream_set_user_data_length(stream, mem.data.len() as u64);
        opj::opj_stream_set_read_function(stream, Some(mem_read));
        opj::opj_stream_set_skip_function(stream, Some(mem_skip));
        opj::opj_stream_set_seek_function(stream, Some(mem_seek));
        stream
    }
}

unsafe extern "C" fn mem_read(
    p_buffer: *mut c_void,
    p_nb_bytes: usize,
    p_user_data: *mut c_void,
) -> usize {
    if p_user_data.is_null() || p_buffer.is_null() {
        return usize::MAX; // OpenJPEG's (OPJ_SIZE_T)-1 failure sentinel
    }
    unsafe {
        let mem = &mut *(p_user_data as *mut MemStream<'_>);
        let buffer = std::slice::from_raw_parts_mut(p_buffer as *mut u8, p_nb_bytes);
        mem.read(buffer)
    }
}

unsafe extern "C" fn mem_skip(p_nb_bytes: i64, p_user_data: *mut c_void) -> i64 {
    if p_user_data.is_null() {
        return -1;
    }
    unsafe {
        let mem = &mut *(p_user_data as *mut MemStream<'_>);
        if mem.skip(p_nb_bytes) { p_nb_bytes } else { -1 }
    }
}

unsafe extern "C" fn mem_seek(p_nb_bytes: i64, p_user_data: *mut c_void) -> i32 {
    if p_user_data.is_null() {
        return opj::OPJ_FALSE as i32;
    }
    unsafe {
        let mem = &mut *(p_user_data as *mut MemStream<'_>);
        if mem.seek(p_nb_bytes) {
            opj::OPJ_TRUE as i32
        } else {
            opj::OPJ_FALSE as i32
        }
    }
}

/// The stream borrows the caller's bytes; there is nothing to free.
unsafe extern "C" fn mem_free(_p_user_data: *mut c_void) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_stops_at_end_of_data() {
        let data = [1u8, 2, 3, 4, 5];
        let mut mem = MemStream::new(&data);

        let mut buf = [0u8; 3];
        assert_eq!(mem.read(&mut buf), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(mem.read(&mut buf), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        // End of data reads zero, not an error.
        assert_eq!(mem.read(&mut buf), 0);
    }

    #[test]
    fn skip_rejects_past_end_and_non_positive() {
        let data = [0u8; 8];
        let mut mem = MemStream::new(&data);
        assert!(mem.skip(4));
        assert!(!mem.skip(5));
        assert!(!mem.skip(0));
        assert!(!mem.skip(-1));
        assert!(mem.skip(4));
        assert_eq!(mem.remaining(), 0);
    }

    #[test]
    fn seek_allows_backward_but_not_out_of_range() {
        let data = [0u8; 8];
        let mut mem = MemStream::new(&data);
        assert!(mem.seek(8));
        assert!(mem.seek(0));
        assert!(mem.seek(5));
        assert!(!mem.seek(9));
        assert!(!mem.seek(-1));
        assert_eq!(mem.remaining(), 3);
    }
}
