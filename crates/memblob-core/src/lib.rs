//! Core types and traits for the memblob native-memory toolkit.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the memblob workspace:
//! identifiers, the allocation-strategy tag, the fixed-width value codec,
//! error types, and the slot+generation handle table.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod handle;
pub mod id;
pub mod primitive;
pub mod strategy;

pub use error::{BlockError, CollectionError};
pub use handle::HandleTable;
pub use id::{Guid, Handle, Timestamp};
pub use primitive::Primitive;
pub use strategy::AllocStrategy;
