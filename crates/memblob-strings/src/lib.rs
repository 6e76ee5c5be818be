//! Packed variable-length UTF-16 string collections.
//!
//! [`PackedStringCollection`] stores an ordered list of entries back to
//! back in a single [`MemoryBlock`](memblob_block::MemoryBlock), using
//! either a length-prefixed or a null-terminated [`Framing`]. Mutations
//! shift bytes in place; an [`OffsetIndex`] built by walking the buffer
//! gives O(1) lookups.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collection;
pub mod config;
pub mod convert;
pub mod format;
pub mod framing;
pub mod iter;

pub use collection::PackedStringCollection;
pub use config::{CollectionConfig, IndexMode};
pub use format::FormatOptions;
pub use framing::{DescriptorWidth, Framing, OffsetIndex, Span};
pub use iter::Iter;
