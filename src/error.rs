//! Errors reported when building a [`Queue`].
//!
//! A full or empty queue is not an error: [`Queue::push`] returns `false` and [`Queue::pop`]
//! returns `None`.
//!
//! [`Queue`]: crate::Queue
//! [`Queue::push`]: crate::Queue::push
//! [`Queue::pop`]: crate::Queue::pop

use thiserror::Error;

/// Rejected queue capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// A queue needs at least one slot.
    #[error("queue capacity must be greater than zero")]
    Zero,
}
