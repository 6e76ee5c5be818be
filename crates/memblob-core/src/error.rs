//! Error types for the memblob toolkit.
//!
//! Organized by layer: [`BlockError`] for allocation, shifting and
//! handle-table access; [`CollectionError`] for the packed string
//! collection, which wraps block failures it cannot handle itself.

use std::error::Error;
use std::fmt;

use crate::id::Handle;
use crate::strategy::AllocStrategy;

/// Errors from memory-block operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockError {
    /// The allocator returned nothing. Callers may retry with another
    /// strategy; nothing in this crate retries on their behalf.
    AllocationFailed {
        /// Number of bytes requested.
        requested: usize,
        /// Strategy that failed.
        strategy: AllocStrategy,
    },
    /// A size, alignment or offset argument was rejected at the call
    /// boundary.
    InvalidArgument {
        /// What was wrong with the argument.
        reason: String,
    },
    /// A strategy-specific free was invoked on a block produced by a
    /// different strategy.
    StrategyMismatch {
        /// Strategy the caller's release path belongs to.
        expected: AllocStrategy,
        /// Strategy that actually produced the block.
        actual: AllocStrategy,
    },
    /// A range falls outside the block.
    OutOfBounds {
        /// Start of the requested range in bytes.
        offset: usize,
        /// Length of the requested range in bytes.
        len: usize,
        /// Current block size in bytes.
        size: usize,
    },
    /// A handle is stale, was already freed, or never existed.
    InvalidHandle {
        /// The rejected handle.
        handle: Handle,
    },
}

impl BlockError {
    /// Shorthand for [`BlockError::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed {
                requested,
                strategy,
            } => {
                write!(f, "{strategy} allocation of {requested} bytes failed")
            }
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::StrategyMismatch { expected, actual } => {
                write!(
                    f,
                    "strategy mismatch: {expected} release path used on a {actual} block"
                )
            }
            Self::OutOfBounds { offset, len, size } => {
                write!(
                    f,
                    "range {offset}..{} out of bounds for block of {size} bytes",
                    offset.saturating_add(*len)
                )
            }
            Self::InvalidHandle { handle } => write!(f, "invalid block handle {handle}"),
        }
    }
}

impl Error for BlockError {}

/// Errors from packed string collection operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionError {
    /// An entry index at or past the end of the collection.
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of entries at the time of the call.
        count: usize,
    },
    /// An empty entry in null-terminated framing, where it would be
    /// indistinguishable from the end-of-list sentinel.
    EmptyEntry,
    /// A NUL code unit inside an entry destined for null-terminated framing.
    EmbeddedNul {
        /// Position of the NUL within the entry, in UTF-16 units.
        position: usize,
    },
    /// An entry longer than its length descriptor can express.
    LengthOverflow {
        /// Entry length in UTF-16 units.
        len: usize,
        /// Descriptor width in bytes.
        width: usize,
    },
    /// More entries than the count header can express.
    CountOverflow {
        /// The entry count that did not fit.
        count: usize,
        /// Descriptor width in bytes.
        width: usize,
    },
    /// A foreign buffer does not follow the declared framing.
    Malformed {
        /// What was inconsistent.
        reason: String,
    },
    /// An entry is not valid UTF-16 and cannot become a `String`.
    InvalidUtf16 {
        /// Index of the offending entry.
        index: usize,
    },
    /// The backing block failed.
    Block(BlockError),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, count } => {
                write!(f, "index {index} out of range for {count} entries")
            }
            Self::EmptyEntry => {
                write!(f, "empty entries are not representable in null-terminated framing")
            }
            Self::EmbeddedNul { position } => {
                write!(f, "entry contains NUL at unit {position}")
            }
            Self::LengthOverflow { len, width } => {
                write!(
                    f,
                    "entry of {len} units does not fit a {width}-byte length descriptor"
                )
            }
            Self::CountOverflow { count, width } => {
                write!(f, "{count} entries do not fit a {width}-byte count header")
            }
            Self::Malformed { reason } => write!(f, "malformed buffer: {reason}"),
            Self::InvalidUtf16 { index } => write!(f, "entry {index} is not valid UTF-16"),
            Self::Block(e) => write!(f, "block operation failed: {e}"),
        }
    }
}

impl Error for CollectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Block(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BlockError> for CollectionError {
    fn from(e: BlockError) -> Self {
        Self::Block(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_failure_names_strategy() {
        let e = BlockError::AllocationFailed {
            requested: 64,
            strategy: AllocStrategy::Virtual,
        };
        assert_eq!(e.to_string(), "virtual allocation of 64 bytes failed");
    }

    #[test]
    fn out_of_bounds_renders_range() {
        let e = BlockError::OutOfBounds {
            offset: 8,
            len: 4,
            size: 10,
        };
        assert_eq!(
            e.to_string(),
            "range 8..12 out of bounds for block of 10 bytes"
        );
    }

    #[test]
    fn collection_error_exposes_block_source() {
        let inner = BlockError::invalid_argument("odd alignment");
        let e = CollectionError::from(inner.clone());
        let source = e.source().expect("block errors carry a source");
        assert_eq!(source.to_string(), inner.to_string());
        assert!(CollectionError::EmptyEntry.source().is_none());
    }

    #[test]
    fn index_out_of_range_message() {
        let e = CollectionError::IndexOutOfRange { index: 3, count: 2 };
        assert_eq!(e.to_string(), "index 3 out of range for 2 entries");
    }
}
