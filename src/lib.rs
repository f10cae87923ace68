#![deny(
    warnings,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_op_in_unsafe_fn,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    rust_2018_idioms
)]

//! A lock-free multi-producer multi-consumer bounded queue.
//!
//! The queue is a fixed array of slots addressed by three ever increasing cursors: producers
//! claim positions on the write cursor, consumers claim them on the read cursor, and the
//! publish cursor in between tells consumers which positions hold a fully written item.
//! Producers publish in the order they claimed, so items come out in the order their pushes
//! claimed a slot whatever the thread interleaving.
//!
//! [`Queue::push`] and [`Queue::pop`] never block: a full queue rejects the push and an empty
//! queue returns `None`.
//!
//! # Examples
//!
//! Single Producer - Single Consumer:
//!
//! ```
//! use bounded_lf_queue::Queue;
//!
//! const CAPACITY: usize = 3;
//! let queue: Queue<char> = Queue::new(CAPACITY);
//!
//! assert!(queue.push('a'));
//! assert!(queue.push('b'));
//! assert!(queue.push('c'));
//! assert!(!queue.push('d'));
//!
//! assert_eq!(queue.pop(), Some('a'));
//! assert!(queue.push('d'));
//!
//! assert_eq!(queue.pop(), Some('b'));
//! assert_eq!(queue.pop(), Some('c'));
//! assert_eq!(queue.pop(), Some('d'));
//! assert!(queue.pop().is_none());
//! ```
//!
//! Multi Producer - Multi Consumer:
//!
//! ```
//! use bounded_lf_queue::Queue;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//!
//! const COUNT: usize = 1_000;
//! const CONCURRENCY: usize = 4;
//!
//! let queue: Queue<usize> = Queue::new(16);
//! let items = Arc::new((0..COUNT).map(|_| AtomicUsize::new(0)).collect::<Vec<_>>());
//!
//! let ths: Vec<_> = (0..CONCURRENCY)
//!     .map(|_| {
//!         let q = queue.clone();
//!         let its = items.clone();
//!         thread::spawn(move || {
//!             for _ in 0..COUNT {
//!                 let n = loop {
//!                     if let Some(x) = q.pop() {
//!                         break x;
//!                     } else {
//!                         thread::yield_now();
//!                     }
//!                 };
//!                 its[n].fetch_add(1, Ordering::SeqCst);
//!             }
//!         })
//!     })
//!     .collect::<Vec<_>>()
//!     .into_iter()
//!     .chain((0..CONCURRENCY).map(|_| {
//!         let q = queue.clone();
//!         thread::spawn(move || {
//!             for i in 0..COUNT {
//!                 let mut item = i;
//!                 while let Err(back) = q.try_push(item) {
//!                     item = back;
//!                     thread::yield_now();
//!                 }
//!             }
//!         })
//!     }))
//!     .collect();
//!
//! for th in ths {
//!     th.join().unwrap();
//! }
//!
//! for c in &*items {
//!     assert_eq!(c.load(Ordering::SeqCst), CONCURRENCY);
//! }
//!
//! assert!(queue.pop().is_none());
//! ```
//!
//! # Features
//!
//! - `tracing`: emits `tracing` events on queue creation, rejected pushes and teardown.
//!   [`init_tracing`] installs a formatter for tests and benchmarks.

mod error;
mod queue;
mod trace;

pub(crate) mod cache_pad;
pub(crate) mod slot;
pub(crate) mod variant;

pub use error::CapacityError;
pub use queue::Queue;
pub use trace::init_tracing;
