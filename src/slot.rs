//! Holds one item of the [`Queue`].
//!
//! The cursors decide *which* thread owns a [`Slot`]; the slot's state tells the owner when the
//! memory is actually ready for it:
//!
//! ```txt
//! VACANT 0b00000000 -> The previous item (if any) has been moved out by its consumer.
//! FILLED 0b00000001 -> A producer finished writing the item.
//! ```
//!
//! A slot alternates `VACANT -> FILLED -> VACANT` once per lap of the cursors. A producer that
//! wins the write cursor for a slot may reach it while the consumer of the previous lap has
//! advanced the read cursor but not yet moved its item out, so the producer waits for
//! [`VACANT`] before writing.
//!
//! [`Queue`]: crate::queue::Queue

use crate::variant::cell::UnsafeCell;
use crate::variant::sync::atomic::{AtomicUsize, Ordering};
use crate::variant::thread;

use std::mem::MaybeUninit;

/// Holds one item of the [`Queue`].
///
/// [`Queue`]: crate::queue::Queue
#[derive(Debug)]
pub(crate) struct Slot<T> {
    /// Holds an item pushed to the [`Queue`].
    ///
    /// [`Queue`]: crate::queue::Queue
    item: UnsafeCell<MaybeUninit<T>>,

    /// Reports whether `item` is initialized.
    state: AtomicUsize,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            item: UnsafeCell::new(MaybeUninit::uninit()),
            state: AtomicUsize::new(VACANT),
        }
    }

    /// Moves `item` into the slot and marks it [`FILLED`].
    ///
    /// # Safety
    ///
    /// The caller must own the slot through a successful claim of the write cursor.
    pub(crate) unsafe fn write(&self, item: T) {
        while self.state.load(Ordering::Acquire) != VACANT {
            thread::yield_now();
        }

        self.item.with_mut(|p| unsafe { p.write(MaybeUninit::new(item)) });
        self.state.store(FILLED, Ordering::Release);
    }

    /// Moves the item out of the slot and marks it [`VACANT`].
    ///
    /// # Safety
    ///
    /// The caller must own the slot through a successful claim of the read cursor, which
    /// implies the slot was published.
    pub(crate) unsafe fn take(&self) -> T {
        debug_assert_eq!(self.state.load(Ordering::Acquire), FILLED);

        let item = self.item.with(|p| unsafe { p.read().assume_init() });
        self.state.store(VACANT, Ordering::Release);

        item
    }

    /// Drops the item in place.
    ///
    /// # Safety
    ///
    /// Only called from the queue's `Drop`, on slots holding a published item.
    pub(crate) unsafe fn drop_item(&mut self) {
        self.item.with_mut(|p| unsafe { (*p).assume_init_drop() });
    }
}

/// The slot holds no item.
pub(crate) const VACANT: usize = 0;

/// The slot holds an initialized item.
pub(crate) const FILLED: usize = 1;
