//! Per-thread, per-family last-error slots.
//!
//! Each codec family keeps one bounded error string per calling thread.
//! The slot is cleared on success and overwritten on failure, so a
//! caller polling after a successful call never sees a stale message and
//! a decode on one thread can never clobber another thread's message.

use std::cell::RefCell;
use std::ffi::{CString, c_char};
use std::thread::LocalKey;

/// Fixed slot capacity, including the terminating NUL.
const SLOT_CAPACITY: usize = 512;

thread_local! {
    static LAST_HDR_ERROR: RefCell<CString> = RefCell::new(CString::default());
    static LAST_EXR_ERROR: RefCell<CString> = RefCell::new(CString::default());
    static LAST_J2K_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

/// Handle to one family's thread-local error slot.
pub(crate) struct ErrorSlot(&'static LocalKey<RefCell<CString>>);

pub(crate) static HDR_ERROR: ErrorSlot = ErrorSlot(&LAST_HDR_ERROR);
pub(crate) static EXR_ERROR: ErrorSlot = ErrorSlot(&LAST_EXR_ERROR);
pub(crate) static J2K_ERROR: ErrorSlot = ErrorSlot(&LAST_J2K_ERROR);

impl ErrorSlot {
    /// Stores `message` for the calling thread, truncated to the slot
    /// capacity. Interior NULs are dropped rather than rejected; a
    /// producer can never crash the slot.
    pub(crate) fn set(&'static self, message: &str) {
        // Truncation may split a UTF-8 sequence; the C side treats the
        // message as opaque bytes, so that is acceptable.
        let bytes: Vec<u8> = message
            .bytes()
            .filter(|&b| b != 0)
            .take(SLOT_CAPACITY - 1)
            .collect();
        let message = CString::new(bytes).unwrap_or_default();
        self.0.with(|slot| *slot.borrow_mut() = message);
    }

    /// Resets the calling thread's slot to the empty string.
    pub(crate) fn clear(&'static self) {
        self.0.with(|slot| *slot.borrow_mut() = CString::default());
    }

    /// Pointer to the calling thread's current message. Never null;
    /// valid until the next operation of this family on this thread.
    pub(crate) fn as_ptr(&'static self) -> *const c_char {
        self.0.with(|slot| slot.borrow().as_ptr())
    }

    #[cfg(test)]
    pub(crate) fn message(&'static self) -> String {
        self.0
            .with(|slot| slot.borrow().to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_clear_round_trips() {
        HDR_ERROR.set("failed to open HDR file");
        assert_eq!(HDR_ERROR.message(), "failed to open HDR file");

        HDR_ERROR.clear();
        assert_eq!(HDR_ERROR.message(), "");
        assert!(!HDR_ERROR.as_ptr().is_null());
    }

    #[test]
    fn families_are_independent() {
        HDR_ERROR.set("hdr message");
        J2K_ERROR.set("j2k message");
        assert_eq!(HDR_ERROR.message(), "hdr message");
        assert_eq!(J2K_ERROR.message(), "j2k message");
        HDR_ERROR.clear();
        assert_eq!(J2K_ERROR.message(), "j2k message");
        J2K_ERROR.clear();
    }

    #[test]
    fn oversized_message_is_truncated_not_rejected() {
        let long = "x".repeat(4096);
        EXR_ERROR.set(&long);
        let stored = EXR_ERROR.message();
        assert_eq!(stored.len(), SLOT_CAPACITY - 1);
        EXR_ERROR.clear();
    }

    #[test]
    fn interior_nuls_are_dropped() {
        EXR_ERROR.set("before\0after");
        assert_eq!(EXR_ERROR.message(), "beforeafter");
        EXR_ERROR.clear();
    }

    #[test]
    fn slots_are_thread_scoped() {
        HDR_ERROR.set("main thread message");
        std::thread::spawn(|| {
            assert_eq!(HDR_ERROR.message(), "");
            HDR_ERROR.set("worker message");
            assert_eq!(HDR_ERROR.message(), "worker message");
        })
        .join()
        .unwrap();
        assert_eq!(HDR_ERROR.message(), "main thread message");
        HDR_ERROR.clear();
    }
}
