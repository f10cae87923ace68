//! A lock-free multi-producer multi-consumer bounded queue.

use crate::cache_pad::CachePad;
use crate::error::CapacityError;
use crate::slot::Slot;
use crate::trace::{debug, trace};
use crate::variant::sync::atomic::{AtomicUsize, Ordering};
use crate::variant::sync::Arc;
use crate::variant::thread;

use std::fmt;

/// A lock-free multi-producer multi-consumer bounded queue.
///
/// Cloning a [`Queue`] hands out another reference to the same buffer; the buffer and any
/// items left in it are dropped with the last reference.
pub struct Queue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Queue<T> {
    /// Creates a new [`Queue`] holding up to `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`Queue::try_new`] to handle it as an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_lf_queue::Queue;
    ///
    /// let queue = Queue::<usize>::new(16);
    /// assert_eq!(queue.capacity(), 16);
    /// ```
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(queue) => queue,
            Err(err) => panic!("{}", err),
        }
    }

    /// Creates a new [`Queue`] holding up to `capacity` items, or reports why it can't.
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_lf_queue::{CapacityError, Queue};
    ///
    /// assert!(Queue::<usize>::try_new(4).is_ok());
    /// assert_eq!(Queue::<usize>::try_new(0).unwrap_err(), CapacityError::Zero);
    /// ```
    pub fn try_new(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError::Zero);
        }

        debug!(capacity, "creating bounded queue");

        Ok(Self {
            inner: Arc::new(Inner::new(capacity, 0)),
        })
    }

    /// Push an item into the [`Queue`]. Returns `false` if the [`Queue`] is full, in which
    /// case the item is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_lf_queue::Queue;
    ///
    /// let queue = Queue::<usize>::new(2);
    ///
    /// assert!(queue.push(1));
    /// assert!(queue.push(2));
    /// assert!(!queue.push(3));
    /// ```
    pub fn push(&self, item: T) -> bool {
        self.inner.push(item).is_ok()
    }

    /// Push an item into the [`Queue`]. Hands the item back if the [`Queue`] is full.
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_lf_queue::Queue;
    ///
    /// let queue = Queue::<String>::new(1);
    ///
    /// assert!(queue.try_push("a".to_string()).is_ok());
    /// assert_eq!(queue.try_push("b".to_string()), Err("b".to_string()));
    /// ```
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.inner.push(item)
    }

    /// Pop an item from the [`Queue`]. Returns none if the [`Queue`] is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_lf_queue::Queue;
    ///
    /// let queue = Queue::<usize>::new(8);
    /// for i in 0..8 {
    ///   assert!(queue.push(i));
    /// }
    ///
    /// for i in 0..8 {
    ///   assert_eq!(i, queue.pop().unwrap());
    /// }
    ///
    /// assert!(queue.pop().is_none());
    /// ```
    pub fn pop(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Reports whether the [`Queue`] was full when checked.
    ///
    /// The answer may be stale by the time it is read; [`Queue::push`] still has to be
    /// checked for failure.
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Reports whether the [`Queue`] was empty when checked.
    ///
    /// The answer may be stale by the time it is read; [`Queue::pop`] still has to be
    /// checked for `None`.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of published items when checked. Same caveats as [`Queue::is_empty`].
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Maximum number of items the [`Queue`] holds.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.inner.capacity)
            .field("read", &self.inner.read.load(Ordering::Relaxed))
            .field("max_read", &self.inner.max_read.load(Ordering::Relaxed))
            .field("write", &self.inner.write.load(Ordering::Relaxed))
            .finish()
    }
}

/// Shared state behind every [`Queue`] handle.
///
/// The three cursors only ever move forward and always satisfy
/// `read <= max_read <= write <= read + capacity`. A cursor value `c` addresses the slot
/// `c % capacity`.
struct Inner<T> {
    /// Next position a producer will claim.
    write: CachePad<AtomicUsize>,

    /// Next position a consumer will claim.
    read: CachePad<AtomicUsize>,

    /// Every position below it holds a fully written item. Producers advance it in the same
    /// order they claimed `write`.
    max_read: CachePad<AtomicUsize>,

    slots: Box<[Slot<T>]>,

    capacity: usize,
}

// Items are moved between threads through the slots, never shared.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Inner<T> {
    fn new(capacity: usize, start: usize) -> Self {
        Self {
            write: CachePad::new(AtomicUsize::new(start)),
            read: CachePad::new(AtomicUsize::new(start)),
            max_read: CachePad::new(AtomicUsize::new(start)),
            slots: (0..capacity).map(|_| Slot::new()).collect(),
            capacity,
        }
    }

    fn slot(&self, cursor: usize) -> &Slot<T> {
        &self.slots[cursor % self.capacity]
    }

    fn push(&self, item: T) -> Result<(), T> {
        match self.claim() {
            Some(write) => {
                unsafe { self.publish(write, item) };
                Ok(())
            }
            None => Err(item),
        }
    }

    /// Claims the next write position, or returns `None` if the queue is full.
    fn claim(&self) -> Option<usize> {
        // `read` is loaded first: any later load of `write` is at least as large, so the
        // difference can't underflow.
        let mut read = self.read.load(Ordering::Acquire);
        let mut write = self.write.load(Ordering::Acquire);

        loop {
            if write.wrapping_sub(read) >= self.capacity {
                // `read` may be stale. Only an unchanged `read` proves the queue was full
                // when `write` was loaded.
                let current = self.read.load(Ordering::Acquire);
                if current == read {
                    trace!(write, read, "queue full, rejecting push");
                    return None;
                }

                read = current;
                write = self.write.load(Ordering::Acquire);
                continue;
            }

            match self.write.compare_exchange_weak(
                write,
                write.wrapping_add(1),
                Ordering::SeqCst,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(write),
                // Another producer claimed `write` first. Reload both cursors as a
                // consumer may have freed room meanwhile.
                Err(_) => {
                    read = self.read.load(Ordering::Acquire);
                    write = self.write.load(Ordering::Acquire);
                }
            }
        }
    }

    /// Writes `item` at the claimed position `write` and makes it visible to consumers.
    ///
    /// # Safety
    ///
    /// `write` must come from [`Inner::claim`] and be published exactly once.
    unsafe fn publish(&self, write: usize, item: T) {
        unsafe { self.slot(write).write(item) };

        // Publish in claim order: wait until every producer that claimed an earlier position
        // has moved `max_read` up to ours.
        while self
            .max_read
            .compare_exchange_weak(
                write,
                write.wrapping_add(1),
                Ordering::SeqCst,
                Ordering::Relaxed,
            )
            .is_err()
        {
            thread::yield_now();
        }
    }

    fn pop(&self) -> Option<T> {
        // Same load order as `push`: `max_read` can't be observed below `read`.
        let mut read = self.read.load(Ordering::Acquire);
        let mut max_read = self.max_read.load(Ordering::Acquire);

        loop {
            if read == max_read {
                return None;
            }

            match self.read.compare_exchange_weak(
                read,
                read.wrapping_add(1),
                Ordering::SeqCst,
                Ordering::Acquire,
            ) {
                // The published position `read` is ours, take the item out.
                Ok(_) => return Some(unsafe { self.slot(read).take() }),
                // Another consumer took this position first.
                Err(_) => {
                    read = self.read.load(Ordering::Acquire);
                    max_read = self.max_read.load(Ordering::Acquire);
                }
            }
        }
    }

    fn is_full(&self) -> bool {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);

        write.wrapping_sub(read) >= self.capacity
    }

    fn is_empty(&self) -> bool {
        let read = self.read.load(Ordering::Acquire);
        let max_read = self.max_read.load(Ordering::Acquire);

        read == max_read
    }

    fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let max_read = self.max_read.load(Ordering::Acquire);

        max_read.wrapping_sub(read).min(self.capacity)
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let mut read = self.read.get_mut().with_mut(|v| *v);
        let max_read = self.max_read.get_mut().with_mut(|v| *v);

        debug!(
            capacity = self.capacity,
            residual = max_read.wrapping_sub(read),
            "dropping bounded queue"
        );

        // No handle is left, so no push is in flight: every claimed position is published.
        while read != max_read {
            let index = read % self.capacity;
            unsafe { self.slots[index].drop_item() };
            read = read.wrapping_add(1);
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    // Starts every cursor a few positions before `usize::MAX`.
    fn queue_near_overflow<T>(capacity: usize, before_overflow: usize) -> Queue<T> {
        Queue {
            inner: Arc::new(Inner::new(capacity, usize::MAX - before_overflow + 1)),
        }
    }

    // cargo test --package bounded-lf-queue --lib -- queue::tests::test_cursor_overflow --exact
    #[test]
    fn test_cursor_overflow() {
        // A power of two capacity keeps `cursor % capacity` continuous across the overflow.
        let queue = queue_near_overflow::<usize>(4, 2);

        for i in 0..4 {
            assert!(queue.push(i));
        }
        assert!(queue.is_full());
        assert_eq!(queue.len(), 4);
        assert!(!queue.push(4));

        for round in 0..3 {
            for i in 0..4 {
                assert_eq!(queue.pop(), Some(round * 4 + i));
                assert!(queue.push((round + 1) * 4 + i));
            }
        }

        for i in 12..16 {
            assert_eq!(queue.pop(), Some(i));
        }
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.pop().is_none());
    }

    // cargo test --package bounded-lf-queue --lib -- queue::tests::test_drop_across_overflow --exact
    #[test]
    fn test_drop_across_overflow() {
        let item = Arc::new(());
        let queue = queue_near_overflow(2, 1);

        assert!(queue.push(item.clone()));
        assert!(queue.push(item.clone()));
        assert_eq!(Arc::strong_count(&item), 3);

        drop(queue);
        assert_eq!(Arc::strong_count(&item), 1);
    }

    // cargo test --package bounded-lf-queue --lib -- queue::tests::test_cursor_invariants_under_contention --exact
    #[test]
    fn test_cursor_invariants_under_contention() {
        use std::sync::atomic::AtomicBool;

        const CAPACITY: usize = 3;
        const COUNT: usize = 2_000;
        let queue: Queue<usize> = Queue::new(CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));

        let watcher = {
            let q = queue.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let inner = &q.inner;
                let mut stable = 0;
                loop {
                    // Sampled once more after the workers stopped, so `stable` can't stay zero.
                    let stopped = stop.load(Ordering::SeqCst);
                    let read = inner.read.load(Ordering::SeqCst);
                    let max_read = inner.max_read.load(Ordering::SeqCst);
                    let write = inner.write.load(Ordering::SeqCst);
                    assert!(read <= max_read && max_read <= write);

                    // An unchanged `read` was still current when `write` was loaded, so the
                    // pair is an exact count of claimed positions.
                    if inner.read.load(Ordering::SeqCst) == read {
                        assert!(write - read <= CAPACITY);
                        stable += 1;
                    }

                    if stopped {
                        break stable;
                    }
                }
            })
        };

        let ths: Vec<_> = (0..2)
            .map(|_| {
                let q = queue.clone();
                thread::spawn(move || {
                    for i in 0..COUNT {
                        while !q.push(i) {
                            thread::yield_now();
                        }
                        while q.pop().is_none() {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        for th in ths {
            th.join().unwrap();
        }
        stop.store(true, Ordering::SeqCst);
        assert!(watcher.join().unwrap() > 0);

        assert!(queue.is_empty());
    }

    #[test]
    fn test_debug_reports_cursors() {
        let queue = Queue::<u8>::new(3);
        assert!(queue.push(1));

        let out = format!("{:?}", queue);
        assert_eq!(out, "Queue { capacity: 3, read: 0, max_read: 1, write: 1 }");
    }
}
