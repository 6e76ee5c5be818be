//! Benchmark profiles for memblob.
//!
//! Provides pre-built inputs shared by the criterion benches:
//!
//! - [`patterned_block`]: a block of any strategy filled with a repeating
//!   byte pattern
//! - [`reference_entries`]: deterministic entry text of varied length
//! - [`reference_collection`]: a collection holding those entries

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use memblob_block::MemoryBlock;
use memblob_core::{AllocStrategy, BlockError, CollectionError};
use memblob_strings::{CollectionConfig, Framing, IndexMode, PackedStringCollection};

/// One 4 KiB page.
pub const SMALL_BLOCK: usize = 4 * 1024;

/// 1 MiB, large enough that shifts are dominated by the copy loop.
pub const LARGE_BLOCK: usize = 1 << 20;

/// Entry count for the reference collection.
pub const REFERENCE_ENTRIES: usize = 1_000;

/// A `size`-byte block from `strategy` holding `0, 1, ..., 255, 0, ...`.
pub fn patterned_block(strategy: AllocStrategy, size: usize) -> Result<MemoryBlock, BlockError> {
    let mut block = MemoryBlock::allocate(strategy, size)?;
    for (i, byte) in block.as_mut_slice().iter_mut().enumerate() {
        *byte = i as u8;
    }
    Ok(block)
}

/// `count` entries between 1 and 64 characters, non-ASCII included.
pub fn reference_entries(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let stem = if i % 7 == 0 { "zeichenkette-ü" } else { "entry" };
            let pad = "x".repeat(i % 48);
            format!("{stem}-{i:05}{pad}")
        })
        .collect()
}

/// A collection of [`reference_entries`] under `framing` and `index_mode`.
pub fn reference_collection(
    framing: Framing,
    index_mode: IndexMode,
    count: usize,
) -> Result<PackedStringCollection, CollectionError> {
    let config = CollectionConfig {
        framing,
        index_mode,
        ..CollectionConfig::default()
    };
    let mut collection = PackedStringCollection::with_config(config);
    collection.add_range(reference_entries(count))?;
    Ok(collection)
}
