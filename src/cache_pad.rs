//! Keeps each cursor of the [`Queue`] on its own cache line.
//!
//! Producers hammer the write cursor and the publish cursor while consumers hammer the read
//! cursor. If two of them shared a line, every CAS on one would invalidate the line for threads
//! spinning on the other.
//!
//! Alignment is 128 bytes on x86_64 (adjacent-line prefetch pulls lines in pairs) and aarch64
//! (Apple M1 reports `hw.cachelinesize: 128`), 64 bytes everywhere else.
//!
//! [`Queue`]: crate::queue::Queue

use std::fmt;
use std::ops::Deref;

/// Pads and aligns a value to the length of a cache line.
#[cfg_attr(any(target_arch = "x86_64", target_arch = "aarch64"), repr(align(128)))]
#[cfg_attr(
    not(any(target_arch = "x86_64", target_arch = "aarch64")),
    repr(align(64))
)]
pub(crate) struct CachePad<T> {
    value: T,
}

impl<T> CachePad<T> {
    pub(crate) fn new(value: T) -> CachePad<T> {
        CachePad { value }
    }

    /// Exclusive access, used when the queue is torn down.
    pub(crate) fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> Deref for CachePad<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePad<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}
