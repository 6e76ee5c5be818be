//! C-compatible status codes.
//!
//! [`MemblobStatus`] is a `repr(i32)` enum covering every failure the
//! block and collection layers report. Conversions from [`BlockError`]
//! and [`CollectionError`] are provided.

use memblob_core::{BlockError, CollectionError};

/// C-compatible status code returned by all FFI functions.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemblobStatus {
    /// Success.
    Ok = 0,
    /// Handle is stale, was already freed, or never existed.
    InvalidHandle = -1,
    /// An argument is null, out of range, or otherwise invalid.
    InvalidArgument = -2,
    /// The allocator returned nothing.
    AllocationFailed = -3,
    /// A strategy-specific release was used on another strategy's block.
    StrategyMismatch = -4,
    /// A byte range falls outside the block.
    OutOfBounds = -5,
    /// An entry index is at or past the end of the collection.
    IndexOutOfRange = -6,
    /// Empty entries are not representable in null-terminated framing.
    EmptyEntry = -7,
    /// An entry for null-terminated framing contains NUL.
    EmbeddedNul = -8,
    /// An entry length or entry count exceeds its descriptor width.
    Overflow = -9,
    /// A buffer does not follow the declared framing.
    Malformed = -10,
    /// An entry is not valid UTF-16.
    InvalidUtf16 = -11,
    /// Caller-provided buffer is too small; the required length was
    /// written to the length out-pointer.
    BufferTooSmall = -12,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -13,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&BlockError> for MemblobStatus {
    fn from(e: &BlockError) -> Self {
        match e {
            BlockError::AllocationFailed { .. } => MemblobStatus::AllocationFailed,
            BlockError::InvalidArgument { .. } => MemblobStatus::InvalidArgument,
            BlockError::StrategyMismatch { .. } => MemblobStatus::StrategyMismatch,
            BlockError::OutOfBounds { .. } => MemblobStatus::OutOfBounds,
            BlockError::InvalidHandle { .. } => MemblobStatus::InvalidHandle,
        }
    }
}

impl From<&CollectionError> for MemblobStatus {
    fn from(e: &CollectionError) -> Self {
        match e {
            CollectionError::IndexOutOfRange { .. } => MemblobStatus::IndexOutOfRange,
            CollectionError::EmptyEntry => MemblobStatus::EmptyEntry,
            CollectionError::EmbeddedNul { .. } => MemblobStatus::EmbeddedNul,
            CollectionError::LengthOverflow { .. } | CollectionError::CountOverflow { .. } => {
                MemblobStatus::Overflow
            }
            CollectionError::Malformed { .. } => MemblobStatus::Malformed,
            CollectionError::InvalidUtf16 { .. } => MemblobStatus::InvalidUtf16,
            CollectionError::Block(inner) => MemblobStatus::from(inner),
        }
    }
}
