//! Allocation registries for pixel buffers crossing the C boundary.
//!
//! Every buffer returned to the foreign caller is owned by a registry
//! until the matching free entry point hands it back. Membership in the
//! registry is the sole authority for whether a free is honored: a null,
//! unknown, or already-released address is diagnosed and ignored, never
//! deallocated, so a caller's bookkeeping mistake cannot corrupt the
//! heap. Each codec family has its own registry instance.

use std::collections::HashMap;
use std::sync::Mutex;

/// A set of live pixel buffers keyed by their raw address.
///
/// The lock is held only for set mutation, never across a decode, so
/// concurrent decodes on independent threads proceed in parallel.
pub(crate) struct PixelRegistry<T: Send + 'static> {
    family: &'static str,
    live: Mutex<HashMap<usize, Box<[T]>>>,
}

impl<T: Send + 'static> PixelRegistry<T> {
    pub(crate) fn new(family: &'static str) -> Self {
        PixelRegistry {
            family,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Takes ownership of `pixels` and returns the raw address handed to
    /// the foreign caller. The buffer stays alive until [`release`]
    /// removes it.
    ///
    /// [`release`]: PixelRegistry::release
    pub(crate) fn register(&self, pixels: Vec<T>) -> *mut T {
        let mut boxed = pixels.into_boxed_slice();
        let ptr = boxed.as_mut_ptr();
        self.lock().insert(ptr as usize, boxed);
        ptr
    }

    /// Releases a previously registered buffer.
    ///
    /// Returns `false` without side effects for null pointers and for
    /// addresses this registry never issued (or already released).
    pub(crate) fn release(&self, ptr: *mut T) -> bool {
        if ptr.is_null() {
            tracing::warn!("free_{}_pixels called with null pointer", self.family);
            return false;
        }

        match self.lock().remove(&(ptr as usize)) {
            Some(buffer) => {
                drop(buffer);
                true
            }
            None => {
                tracing::warn!(
                    "attempt to free unknown or already freed {} pointer {:p}",
                    self.family,
                    ptr
                );
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<usize, Box<[T]>>> {
        // A poisoned lock only means another thread panicked mid-insert;
        // the map itself is still usable.
        match self.live.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_is_single_shot() {
        let registry = PixelRegistry::new("test");
        let ptr = registry.register(vec![1.0f32, 2.0, 3.0]);
        assert!(!ptr.is_null());
        assert_eq!(registry.len(), 1);

        assert!(registry.release(ptr));
        assert_eq!(registry.len(), 0);
        // Double free: diagnosed, refused, no crash.
        assert!(!registry.release(ptr));
    }

    #[test]
    fn null_and_foreign_pointers_are_refused() {
        let registry = PixelRegistry::<u8>::new("test");
        assert!(!registry.release(std::ptr::null_mut()));

        let mut local = [0u8; 4];
        assert!(!registry.release(local.as_mut_ptr()));
    }

    #[test]
    fn buffers_are_independent() {
        let registry = PixelRegistry::new("test");
        let a = registry.register(vec![0u8; 16]);
        let b = registry.register(vec![1u8; 16]);
        assert_ne!(a, b);

        assert!(registry.release(a));
        // Releasing one buffer leaves the other registered.
        assert_eq!(registry.len(), 1);
        assert!(registry.release(b));
    }

    #[test]
    fn registered_buffer_is_readable_through_the_pointer() {
        let registry = PixelRegistry::new("test");
        let ptr = registry.register(vec![10u8, 20, 30]);
        let restored = unsafe { std::slice::from_raw_parts(ptr, 3) };
        assert_eq!(restored, &[10, 20, 30]);
        assert!(registry.release(ptr));
    }
}
