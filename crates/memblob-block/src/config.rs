//! Block configuration parameters.

use memblob_core::BlockError;

/// Configuration applied to a [`MemoryBlock`](crate::MemoryBlock) at
/// construction.
///
/// Copied into every block built from it; changing a config after the fact
/// does not affect existing blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockConfig {
    /// Report this block's size to the global pressure counter.
    ///
    /// Default: `false`. Has no observable effect when the `pressure`
    /// feature is disabled.
    pub track_pressure: bool,

    /// Alignment used when an [`AllocStrategy::Aligned`] block is built
    /// without an explicit alignment.
    ///
    /// Default: 512. Must be even and non-zero.
    ///
    /// [`AllocStrategy::Aligned`]: memblob_core::AllocStrategy::Aligned
    pub default_alignment: usize,
}

impl BlockConfig {
    /// Default alignment for aligned allocations.
    pub const DEFAULT_ALIGNMENT: usize = 512;

    /// Check that every field holds a usable value.
    pub fn validate(&self) -> Result<(), BlockError> {
        check_alignment(self.default_alignment)
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            track_pressure: false,
            default_alignment: Self::DEFAULT_ALIGNMENT,
        }
    }
}

/// Alignments must be even and non-zero.
pub(crate) fn check_alignment(alignment: usize) -> Result<(), BlockError> {
    if alignment == 0 {
        return Err(BlockError::invalid_argument("alignment must be non-zero"));
    }
    if alignment % 2 != 0 {
        return Err(BlockError::invalid_argument(format!(
            "alignment must be even, got {alignment}"
        )));
    }
    Ok(())
}
