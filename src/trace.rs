//! Tracing hooks for the queue.
//!
//! Enable with `--features tracing`. Without the feature the macros expand to nothing, so the
//! push and pop paths carry no logging cost.

/// Installs a `tracing-subscriber` formatter honouring `RUST_LOG`.
///
/// Defaults to `bounded_lf_queue=trace` when `RUST_LOG` is unset. Call it at the start of a
/// test or benchmark. Does nothing if the `tracing` feature is not enabled.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bounded_lf_queue=trace"));

    // A second call from another test keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

/// Installs a `tracing-subscriber` formatter honouring `RUST_LOG`.
///
/// Does nothing since the `tracing` feature is not enabled.
#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
macro_rules! debug_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use debug_noop as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use trace_noop as trace;
