//! Advisory off-heap byte counter.
//!
//! Blocks with pressure tracking enabled report every size change here, so
//! the counter approximates the native bytes held by tracked blocks. Each
//! block remembers what it reported and removes exactly that on release.
//! The counter is diagnostic only; nothing reads it for correctness.
//!
//! Without the `pressure` feature every function is a no-op and
//! [`tracked_bytes`] returns 0.

#[cfg(feature = "pressure")]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "pressure")]
static TRACKED: AtomicUsize = AtomicUsize::new(0);

/// Bytes currently reported by tracked blocks across the process.
pub fn tracked_bytes() -> usize {
    #[cfg(feature = "pressure")]
    {
        TRACKED.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "pressure"))]
    {
        0
    }
}

/// Whether the counter is compiled in.
pub const fn enabled() -> bool {
    cfg!(feature = "pressure")
}

#[cfg_attr(not(feature = "pressure"), allow(unused_variables))]
pub(crate) fn add(bytes: usize) {
    #[cfg(feature = "pressure")]
    if bytes > 0 {
        TRACKED.fetch_add(bytes, Ordering::Relaxed);
    }
}

#[cfg_attr(not(feature = "pressure"), allow(unused_variables))]
pub(crate) fn remove(bytes: usize) {
    #[cfg(feature = "pressure")]
    if bytes > 0 {
        // Saturate rather than wrap if accounting is ever off.
        let _ = TRACKED.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
            Some(cur.saturating_sub(bytes))
        });
    }
}
