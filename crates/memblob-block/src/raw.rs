//! Low-level allocation primitives, one per strategy.
//!
//! This is the only module in the workspace's core that contains `unsafe`.
//! Every block is a [`RawBuf`] (a zero-initialised run from the global
//! allocator) or a [`VirtualRegion`] (an anonymous OS mapping); the
//! strategy wrappers add their own metadata on top. All bytes handed out
//! as slices are initialised.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::slice;

use memmap2::MmapMut;

/// Alignment of process-heap runs, matching typical heap granularity.
pub(crate) const HEAP_ALIGN: usize = 16;

/// Alignment of network and task buffers.
pub(crate) const BUFFER_ALIGN: usize = 8;

/// Width of the base-address prefix stored before an aligned start.
pub(crate) const ALIGN_PREFIX: usize = 8;

/// Granularity of virtual regions.
pub(crate) const PAGE_SIZE: usize = 4096;

/// A zero-initialised run of bytes owned through the global allocator.
pub(crate) struct RawBuf {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
}

// SAFETY: `RawBuf` uniquely owns its allocation, like `Vec<u8>`; moving it
// to another thread moves that ownership. It is not `Sync`.
unsafe impl Send for RawBuf {}

impl RawBuf {
    /// Allocate `len` zeroed bytes. Returns `None` for `len == 0`, an invalid
    /// layout, or allocator exhaustion.
    pub(crate) fn alloc_zeroed(len: usize, align: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let layout = Layout::from_size_align(len, align).ok()?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        NonNull::new(ptr).map(|ptr| Self { ptr, len, align })
    }

    /// Resize in place (or by the allocator's own move), zeroing any grown
    /// tail. On failure the buffer is left exactly as it was.
    pub(crate) fn realloc_zeroed(&mut self, new_len: usize) -> bool {
        if new_len == 0 {
            return false;
        }
        if new_len == self.len {
            return true;
        }
        if Layout::from_size_align(new_len, self.align).is_err() {
            return false;
        }
        let old_layout = self.layout();
        // SAFETY: `ptr` came from the global allocator with `old_layout`;
        // `new_len` is non-zero and forms a valid layout with the same align.
        let ptr = unsafe { alloc::realloc(self.ptr.as_ptr(), old_layout, new_len) };
        let Some(ptr) = NonNull::new(ptr) else {
            return false;
        };
        if new_len > self.len {
            // SAFETY: `[len, new_len)` lies inside the new allocation.
            unsafe { ptr.as_ptr().add(self.len).write_bytes(0, new_len - self.len) };
        }
        self.ptr = ptr;
        self.len = new_len;
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` is valid for `len` initialised bytes for the life of
        // `self`; every byte was zeroed on allocation or growth.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as `as_slice`, and `&mut self` guarantees exclusivity.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn layout(&self) -> Layout {
        // SAFETY: the same (len, align) pair was validated by
        // `Layout::from_size_align` when the buffer was created or resized.
        unsafe { Layout::from_size_align_unchecked(self.len, self.align) }
    }
}

impl Drop for RawBuf {
    fn drop(&mut self) {
        // SAFETY: `ptr` was allocated by the global allocator with exactly
        // this layout and is released once.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout()) };
    }
}

/// Heap run over-allocated so that `offset` is a multiple of `alignment`.
///
/// Layout: `[padding][8-byte base address][len bytes]`, where the base
/// address is the true start of the underlying run.
pub(crate) struct AlignedBuf {
    raw: RawBuf,
    offset: usize,
    len: usize,
    alignment: usize,
}

impl AlignedBuf {
    /// Allocate `len + (alignment - 1) + 8` bytes and place the exposed start
    /// at the first `alignment` multiple that leaves room for the prefix.
    pub(crate) fn alloc(len: usize, alignment: usize) -> Option<Self> {
        if len == 0 || alignment == 0 {
            return None;
        }
        let total = len.checked_add(alignment - 1)?.checked_add(ALIGN_PREFIX)?;
        let mut raw = RawBuf::alloc_zeroed(total, BUFFER_ALIGN)?;
        let base = raw.addr();
        let first = base.checked_add(ALIGN_PREFIX + alignment - 1)?;
        let aligned = first - first % alignment;
        let offset = aligned - base;
        raw.as_mut_slice()[offset - ALIGN_PREFIX..offset]
            .copy_from_slice(&(base as u64).to_le_bytes());
        Some(Self {
            raw,
            offset,
            len,
            alignment,
        })
    }

    /// The base address recovered from the prefix.
    pub(crate) fn stored_base(&self) -> usize {
        let mut prefix = [0u8; ALIGN_PREFIX];
        prefix.copy_from_slice(&self.raw.as_slice()[self.offset - ALIGN_PREFIX..self.offset]);
        u64::from_le_bytes(prefix) as usize
    }

    /// Whether the prefix still points at the run that backs this buffer.
    pub(crate) fn prefix_intact(&self) -> bool {
        self.stored_base() == self.raw.addr()
    }

    /// Release through the recovered base. Returns whether the prefix was
    /// intact; the run is released either way.
    pub(crate) fn release(self) -> bool {
        let intact = self.prefix_intact();
        drop(self.raw);
        intact
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn alignment(&self) -> usize {
        self.alignment
    }

    pub(crate) fn addr(&self) -> usize {
        self.raw.addr() + self.offset
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.raw.as_slice()[self.offset..self.offset + self.len]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        let (start, end) = (self.offset, self.offset + self.len);
        &mut self.raw.as_mut_slice()[start..end]
    }
}

/// Anonymous read/write mapping reserved and committed in one step.
pub(crate) struct VirtualRegion {
    map: MmapMut,
}

impl VirtualRegion {
    /// Map at least `len` bytes. The region is page-granular, so its
    /// queried size may exceed the request.
    pub(crate) fn map(len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let rounded = len.checked_add(PAGE_SIZE - 1)? / PAGE_SIZE * PAGE_SIZE;
        MmapMut::map_anon(rounded).ok().map(|map| Self { map })
    }

    /// Size as recorded by the region itself.
    pub(crate) fn region_size(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn addr(&self) -> usize {
        self.map.as_ptr() as usize
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }
}

/// Copy the leading bytes of `src` into a fresh `dst`, up to the shorter
/// of the two.
pub(crate) fn copy_prefix(dst: &mut [u8], src: &[u8]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}
