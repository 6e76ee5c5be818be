//! C-compatible enums for allocation strategies and entry framing.

use memblob_core::AllocStrategy;
use memblob_strings::{DescriptorWidth, Framing};

/// Allocation strategy for `memblob_block_alloc` and collection creation.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemblobStrategy {
    /// General-purpose process heap.
    ProcessHeap = 0,
    /// Process heap with the exposed start aligned.
    Aligned = 1,
    /// Page-granular OS virtual memory.
    Virtual = 2,
    /// Network buffer allocator.
    Network = 3,
    /// Cross-component task allocator.
    ComTask = 4,
}

impl MemblobStrategy {
    /// Decode a raw C value.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::ProcessHeap),
            1 => Some(Self::Aligned),
            2 => Some(Self::Virtual),
            3 => Some(Self::Network),
            4 => Some(Self::ComTask),
            _ => None,
        }
    }
}

impl From<MemblobStrategy> for AllocStrategy {
    fn from(s: MemblobStrategy) -> Self {
        match s {
            MemblobStrategy::ProcessHeap => AllocStrategy::ProcessHeap,
            MemblobStrategy::Aligned => AllocStrategy::Aligned,
            MemblobStrategy::Virtual => AllocStrategy::Virtual,
            MemblobStrategy::Network => AllocStrategy::Network,
            MemblobStrategy::ComTask => AllocStrategy::ComTask,
        }
    }
}

/// Entry framing for packed string collections.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemblobFraming {
    /// Count header plus a length descriptor per entry. Pair with a
    /// descriptor width of 1, 2, 4 or 8 bytes.
    LengthPrefixed = 0,
    /// NUL-terminated entries ending in an empty entry. Width is ignored.
    NullTerminated = 1,
}

impl MemblobFraming {
    /// Decode a raw C value.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::LengthPrefixed),
            1 => Some(Self::NullTerminated),
            _ => None,
        }
    }

    /// Combine with a descriptor width in bytes. `None` if the width is
    /// not 1, 2, 4 or 8 for length-prefixed framing.
    pub fn with_width(self, width_bytes: u32) -> Option<Framing> {
        match self {
            MemblobFraming::LengthPrefixed => {
                DescriptorWidth::from_bytes(width_bytes as usize).map(Framing::LengthPrefixed)
            }
            MemblobFraming::NullTerminated => Some(Framing::NullTerminated),
        }
    }
}

/// Decode a `(framing, width)` pair from C.
pub(crate) fn framing_arg(framing: i32, width_bytes: u32) -> Option<Framing> {
    MemblobFraming::from_raw(framing)?.with_width(width_bytes)
}

/// Decode a strategy from C.
pub(crate) fn strategy_arg(strategy: i32) -> Option<AllocStrategy> {
    MemblobStrategy::from_raw(strategy).map(AllocStrategy::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_values_round_trip() {
        for (raw, expected) in AllocStrategy::ALL.iter().enumerate() {
            assert_eq!(strategy_arg(raw as i32), Some(*expected));
        }
        assert_eq!(strategy_arg(5), None);
        assert_eq!(strategy_arg(-1), None);
    }

    #[test]
    fn framing_needs_a_valid_width() {
        assert_eq!(
            framing_arg(0, 2),
            Some(Framing::LengthPrefixed(DescriptorWidth::U16))
        );
        assert_eq!(framing_arg(0, 3), None);
        assert_eq!(framing_arg(1, 0), Some(Framing::NullTerminated));
        assert_eq!(framing_arg(2, 4), None);
    }
}
