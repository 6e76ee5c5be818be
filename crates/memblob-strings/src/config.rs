//! Collection configuration.

use memblob_core::AllocStrategy;

use crate::framing::Framing;

/// How a collection locates its entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexMode {
    /// Keep an offset index, rebuilt after every structural mutation.
    #[default]
    Cached,
    /// Keep no index; walk the buffer on every lookup.
    AlwaysRewalk,
}

/// Configuration for a
/// [`PackedStringCollection`](crate::PackedStringCollection).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Entry framing. Default: length-prefixed with 4-byte descriptors.
    pub framing: Framing,
    /// Index strategy. Default: [`IndexMode::Cached`].
    pub index_mode: IndexMode,
    /// Strategy for the backing block. Default:
    /// [`AllocStrategy::ProcessHeap`].
    pub strategy: AllocStrategy,
}

impl CollectionConfig {
    /// Default configuration with the given framing.
    pub fn with_framing(framing: Framing) -> Self {
        Self {
            framing,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::DescriptorWidth;

    #[test]
    fn defaults() {
        let config = CollectionConfig::default();
        assert_eq!(
            config.framing,
            Framing::LengthPrefixed(DescriptorWidth::U32)
        );
        assert_eq!(config.index_mode, IndexMode::Cached);
        assert_eq!(config.strategy, AllocStrategy::ProcessHeap);
    }

    #[test]
    fn with_framing_keeps_other_defaults() {
        let config = CollectionConfig::with_framing(Framing::NullTerminated);
        assert_eq!(config.framing, Framing::NullTerminated);
        assert_eq!(config.index_mode, IndexMode::Cached);
    }
}
