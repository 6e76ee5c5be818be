//! Test fixtures and seeded generators for memblob development.
//!
//! Provides lettered byte blocks for shift tests, a fixed set of
//! awkward entries for string collections, and deterministic random
//! generators (see [`fixtures`]) so property-style tests and benchmarks
//! see the same data on every run.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use memblob_block::MemoryBlock;
use memblob_core::AllocStrategy;
use memblob_strings::{CollectionConfig, Framing, PackedStringCollection};

pub use fixtures::{random_bytes, random_entries, random_units};

/// Entries that exercise surrogate pairs, combining marks and lengths
/// crossing one-byte descriptor boundaries. None is empty and none
/// contains NUL, so every framing accepts them.
pub const SAMPLE_ENTRIES: [&str; 6] = [
    "alpha",
    "b",
    "gamma ray",
    "δέλτα",
    "e\u{301}clair \u{1F600}",
    "the quick brown fox jumps over the lazy dog",
];

/// `n` bytes spelling `ABC...`, wrapping after `Z`.
pub fn lettered(n: usize) -> Vec<u8> {
    (0..n).map(|i| b'A' + (i % 26) as u8).collect()
}

/// A process-heap block holding [`lettered(n)`](lettered).
pub fn lettered_block(n: usize) -> MemoryBlock {
    let mut block = MemoryBlock::new();
    if n > 0 {
        block
            .alloc(n)
            .unwrap_or_else(|e| panic!("lettered_block({n}): {e}"));
        block.as_mut_slice().copy_from_slice(&lettered(n));
    }
    block
}

/// A block of `size` bytes from `strategy`, every byte set to `fill`.
pub fn filled_block(strategy: AllocStrategy, size: usize, fill: u8) -> MemoryBlock {
    let mut block = MemoryBlock::allocate(strategy, size)
        .unwrap_or_else(|e| panic!("filled_block({strategy}, {size}): {e}"));
    block.as_mut_slice().fill(fill);
    block
}

/// A collection in `framing` holding `entries` in order.
pub fn collection_of(framing: Framing, entries: &[&str]) -> PackedStringCollection {
    let mut collection =
        PackedStringCollection::with_config(CollectionConfig::with_framing(framing));
    collection
        .add_range(entries.iter().copied())
        .unwrap_or_else(|e| panic!("collection_of({framing}): {e}"));
    collection
}

/// UTF-16 units of `value`.
pub fn units(value: &str) -> Vec<u16> {
    value.encode_utf16().collect()
}
