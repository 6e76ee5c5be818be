//! C FFI bindings for memblob.
//!
//! Exposes blocks and packed string collections to C callers through
//! process-wide handle tables. Every entry point returns a
//! [`MemblobStatus`] code, writes results through caller-supplied
//! out-pointers, and catches panics before they cross the boundary.
//! Alongside `memblob-block`, this is the only crate that may contain
//! `unsafe` code.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run an FFI body, mapping a caught panic to
/// [`MemblobStatus::Panicked`](crate::status::MemblobStatus::Panicked).
macro_rules! ffi_guard {
    ($body:block) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> i32 { $body })) {
            Ok(status) => status,
            Err(_) => $crate::status::MemblobStatus::Panicked as i32,
        }
    };
}

/// Lock a global table, returning
/// [`MemblobStatus::InternalError`](crate::status::MemblobStatus::InternalError)
/// from the enclosing function if a prior panic poisoned it.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::MemblobStatus::InternalError as i32,
        }
    };
}

/// Unwrap a `Result`, returning its error as a status code.
macro_rules! ffi_try {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => return $crate::status::MemblobStatus::from(&e) as i32,
        }
    };
}

mod args;
pub mod block;
pub mod collection;
pub mod status;
pub mod types;

// Public re-exports for the primary API surface.
pub use status::MemblobStatus;
pub use types::{MemblobFraming, MemblobStrategy};
