//! memblob: owning native memory blocks and packed UTF-16 string
//! collections.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all memblob sub-crates. For most users, adding `memblob` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use memblob::prelude::*;
//!
//! // A 16-byte heap block; fresh memory is zeroed.
//! let mut block = MemoryBlock::allocate(AllocStrategy::ProcessHeap, 16).unwrap();
//! block.set_at::<u32>(1, 0xC0FFEE);
//! assert_eq!(block.get_at_absolute::<u32>(4), 0xC0FFEE);
//!
//! // Open a gap in front of the value; it moves with the tail.
//! block.push_out(0, 4).unwrap();
//! assert_eq!(block.size(), 20);
//! assert_eq!(block.get_at::<u32>(2), 0xC0FFEE);
//!
//! // Pack strings into one buffer behind a 4-byte count header.
//! let mut names = PackedStringCollection::new();
//! names.add_range(["ab", "xyz"]).unwrap();
//! names.insert_at(1, "Q").unwrap();
//! assert_eq!(names.to_vec().unwrap(), ["ab", "Q", "xyz"]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `memblob-core` | Errors, identifiers, strategy tag, `Primitive`, `HandleTable` |
//! | [`block`] | `memblob-block` | `MemoryBlock`, views, shifting, `BlockTable`, pressure counter |
//! | [`strings`] | `memblob-strings` | `PackedStringCollection`, framings, formatting |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, identifiers and errors (`memblob-core`).
///
/// Contains [`types::BlockError`], [`types::CollectionError`], the
/// [`types::AllocStrategy`] tag and the [`types::HandleTable`] used by
/// the arena and the C ABI.
pub use memblob_core as types;

/// Owning blocks, typed views and shifting (`memblob-block`).
///
/// [`block::MemoryBlock`] owns one allocation; [`block::ReadView`] and
/// [`block::WriteView`] address it by offset; [`block::BlockTable`] hands
/// out bounds-checked handles.
pub use memblob_block as block;

/// Packed string collections (`memblob-strings`).
///
/// [`strings::PackedStringCollection`] stores entries under a
/// [`strings::Framing`], either length-prefixed or null-terminated.
pub use memblob_strings as strings;

/// Common imports for typical memblob usage.
///
/// ```rust
/// use memblob::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use memblob_core::{AllocStrategy, Guid, Handle, Primitive, Timestamp};

    // Errors
    pub use memblob_core::{BlockError, CollectionError};

    // Blocks
    pub use memblob_block::{
        BlockConfig, BlockTable, MemoryBlock, ReadView, TypedView, TypedViewMut, WriteView,
    };

    // Strings
    pub use memblob_strings::{
        CollectionConfig, DescriptorWidth, FormatOptions, Framing, IndexMode,
        PackedStringCollection,
    };
}
