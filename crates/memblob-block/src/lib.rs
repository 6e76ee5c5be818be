//! Owning native memory blocks for memblob.
//!
//! A [`MemoryBlock`] owns one contiguous allocation made by one of five
//! interchangeable strategies ([`AllocStrategy`]). On top of it sit typed,
//! offset-addressed views ([`ReadView`], [`WriteView`]), in-place shifting
//! (`push_out`, `pull_in`, `slide`) and a handle table ([`BlockTable`]) for
//! callers that should never see a raw address.
//!
//! # Architecture
//!
//! ```text
//! BlockTable (slot+generation handles, bounds-checked access)
//! └── MemoryBlock (owning, one strategy tag at a time)
//!     ├── ProcessHeap / ComTask → RawBuf (resized in place)
//!     ├── Aligned  → AlignedBuf (base address stored before the start)
//!     ├── Virtual  → VirtualRegion (anonymous page-granular mapping)
//!     └── Network  → RawBuf + cached size (resized by copy)
//! ```
//!
//! # Safety
//!
//! All `unsafe` lives in the private `raw` module. Every byte handed out
//! through a slice is initialised: fresh memory and grown tails are zeroed.
//!
//! [`AllocStrategy`]: memblob_core::AllocStrategy

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod block;
pub mod config;
pub mod pressure;
mod raw;
pub mod shift;
pub mod table;
pub mod view;

// Public re-exports for the primary API surface.
pub use block::MemoryBlock;
pub use config::BlockConfig;
pub use table::BlockTable;
pub use view::{ReadView, TypedView, TypedViewMut, WriteView, POINTER_WIDTH};
