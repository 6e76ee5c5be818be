//! The owning memory block and its five allocation strategies.

use std::fmt;
use std::mem;

use memblob_core::{AllocStrategy, BlockError};
use tracing::{debug, trace, warn};

use crate::config::{check_alignment, BlockConfig};
use crate::pressure;
use crate::raw::{
    self, AlignedBuf, RawBuf, VirtualRegion, BUFFER_ALIGN, HEAP_ALIGN, PAGE_SIZE,
};

/// Current allocation, tagged by the strategy that produced it.
///
/// Each variant carries only the metadata its release path needs.
enum Allocation {
    Empty,
    ProcessHeap(RawBuf),
    Aligned(AlignedBuf),
    Virtual(VirtualRegion),
    Network { buf: RawBuf, cached_size: usize },
    ComTask(RawBuf),
}

impl Allocation {
    fn strategy(&self) -> Option<AllocStrategy> {
        match self {
            Self::Empty => None,
            Self::ProcessHeap(_) => Some(AllocStrategy::ProcessHeap),
            Self::Aligned(_) => Some(AllocStrategy::Aligned),
            Self::Virtual(_) => Some(AllocStrategy::Virtual),
            Self::Network { .. } => Some(AllocStrategy::Network),
            Self::ComTask(_) => Some(AllocStrategy::ComTask),
        }
    }

    fn size(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::ProcessHeap(buf) | Self::ComTask(buf) => buf.len(),
            Self::Aligned(buf) => buf.len(),
            Self::Virtual(region) => region.region_size(),
            Self::Network { cached_size, .. } => *cached_size,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Empty => &[],
            Self::ProcessHeap(buf) | Self::ComTask(buf) => buf.as_slice(),
            Self::Aligned(buf) => buf.as_slice(),
            Self::Virtual(region) => region.as_slice(),
            Self::Network { buf, cached_size } => &buf.as_slice()[..*cached_size],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Empty => &mut [],
            Self::ProcessHeap(buf) | Self::ComTask(buf) => buf.as_mut_slice(),
            Self::Aligned(buf) => buf.as_mut_slice(),
            Self::Virtual(region) => region.as_mut_slice(),
            Self::Network { buf, cached_size } => &mut buf.as_mut_slice()[..*cached_size],
        }
    }

    /// Fresh zeroed allocation of `size` bytes for `strategy`.
    fn new(strategy: AllocStrategy, size: usize, alignment: usize) -> Result<Self, BlockError> {
        let fresh = match strategy {
            AllocStrategy::ProcessHeap => {
                RawBuf::alloc_zeroed(size, HEAP_ALIGN).map(Self::ProcessHeap)
            }
            AllocStrategy::Aligned => AlignedBuf::alloc(size, alignment).map(Self::Aligned),
            AllocStrategy::Virtual => VirtualRegion::map(size).map(Self::Virtual),
            AllocStrategy::Network => RawBuf::alloc_zeroed(size, BUFFER_ALIGN).map(|buf| {
                let cached_size = buf.len();
                Self::Network { buf, cached_size }
            }),
            AllocStrategy::ComTask => {
                RawBuf::alloc_zeroed(size, BUFFER_ALIGN).map(Self::ComTask)
            }
        };
        fresh.ok_or_else(|| {
            debug!(%strategy, requested = size, "allocation failed");
            BlockError::AllocationFailed {
                requested: size,
                strategy,
            }
        })
    }
}

/// An owning handle over one contiguous native allocation.
///
/// A block is either empty or holds exactly one allocation made by one of
/// the [`AllocStrategy`] variants. Every resize and release goes through the
/// path matching that strategy. All exposed bytes are initialised: fresh
/// allocations and grown tails are zeroed.
///
/// The block always owns its memory and releases it on drop. Borrow it for
/// non-owning access; use [`take`](Self::take) to hand ownership on
/// explicitly. Blocks are `Send` but not `Sync`.
pub struct MemoryBlock {
    alloc: Allocation,
    config: BlockConfig,
    reported: usize,
}

impl MemoryBlock {
    /// An empty block with default configuration.
    pub fn new() -> Self {
        Self::with_config(BlockConfig::default())
    }

    /// An empty block using `config` for later allocations.
    pub fn with_config(config: BlockConfig) -> Self {
        Self {
            alloc: Allocation::Empty,
            config,
            reported: 0,
        }
    }

    /// Build a block of `size` zeroed bytes with the given strategy.
    ///
    /// [`AllocStrategy::Aligned`] uses [`BlockConfig::DEFAULT_ALIGNMENT`].
    pub fn allocate(strategy: AllocStrategy, size: usize) -> Result<Self, BlockError> {
        Self::allocate_with(BlockConfig::default(), strategy, size)
    }

    /// As [`allocate`](Self::allocate), with an explicit configuration.
    pub fn allocate_with(
        config: BlockConfig,
        strategy: AllocStrategy,
        size: usize,
    ) -> Result<Self, BlockError> {
        config.validate()?;
        let mut block = Self::with_config(config);
        block.alloc_as(strategy, size, config.default_alignment)?;
        Ok(block)
    }

    /// Copy `bytes` into a new process-heap block. An empty slice gives an
    /// empty block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        let mut block = Self::new();
        if !bytes.is_empty() {
            block.alloc(bytes.len())?;
            block.as_mut_slice().copy_from_slice(bytes);
        }
        Ok(block)
    }

    // ── Generic lifecycle ───────────────────────────────────────

    /// Allocate `size` zeroed bytes from the process heap.
    ///
    /// An already-allocated block is resized instead, keeping its strategy.
    pub fn alloc(&mut self, size: usize) -> Result<(), BlockError> {
        if matches!(self.alloc, Allocation::Empty) {
            if size == 0 {
                return Ok(());
            }
            self.alloc_as(AllocStrategy::ProcessHeap, size, self.config.default_alignment)
        } else {
            self.resize(size)
        }
    }

    /// Grow or shrink within the current strategy, preserving leading bytes.
    ///
    /// Grown bytes are zeroed. The granted size may exceed `new_size` for
    /// page-granular strategies. `resize(0)` frees; resizing an empty block
    /// allocates from the process heap. On failure the block is unchanged.
    pub fn resize(&mut self, new_size: usize) -> Result<(), BlockError> {
        if new_size == 0 {
            self.free();
            return Ok(());
        }
        let Some(strategy) = self.strategy() else {
            return self.alloc_as(
                AllocStrategy::ProcessHeap,
                new_size,
                self.config.default_alignment,
            );
        };
        if strategy.resizes_in_place() {
            let resized = match &mut self.alloc {
                Allocation::ProcessHeap(buf) | Allocation::ComTask(buf) => {
                    buf.realloc_zeroed(new_size)
                }
                _ => false,
            };
            if !resized {
                debug!(%strategy, requested = new_size, "resize failed");
                return Err(BlockError::AllocationFailed {
                    requested: new_size,
                    strategy,
                });
            }
        } else if strategy == AllocStrategy::Virtual
            && new_size.div_ceil(PAGE_SIZE) * PAGE_SIZE == self.size()
        {
            // Same page count: the mapping already fits.
            return Ok(());
        } else {
            self.relocate(new_size)?;
        }
        trace!(size = self.size(), "block resized");
        self.sync_pressure();
        Ok(())
    }

    /// Release the allocation through the path matching its strategy.
    ///
    /// Idempotent. Returns whether an allocation was released.
    pub fn free(&mut self) -> bool {
        let released = match mem::replace(&mut self.alloc, Allocation::Empty) {
            Allocation::Empty => false,
            Allocation::Aligned(buf) => {
                if !buf.release() {
                    warn!("aligned block prefix was overwritten; released by tracked base");
                }
                true
            }
            other => {
                drop(other);
                true
            }
        };
        if released {
            trace!("block released");
        }
        self.sync_pressure();
        released
    }

    // ── Strategy-specific lifecycle ─────────────────────────────

    /// Allocate `size` bytes whose start address is a multiple of
    /// `alignment`.
    ///
    /// The true base of the over-allocated run is stored in the 8 bytes
    /// immediately before the aligned start. Any existing allocation is
    /// released first. `alignment` must be even and non-zero.
    pub fn aligned_alloc(&mut self, size: usize, alignment: usize) -> Result<(), BlockError> {
        check_alignment(alignment)?;
        self.alloc_as(AllocStrategy::Aligned, size, alignment)
    }

    /// Release an aligned allocation through its stored base.
    pub fn aligned_free(&mut self) -> Result<bool, BlockError> {
        self.free_as(AllocStrategy::Aligned)
    }

    /// Reserve and commit an anonymous page-granular region. The granted
    /// size is rounded up to whole pages.
    pub fn virtual_alloc(&mut self, size: usize) -> Result<(), BlockError> {
        self.alloc_as(AllocStrategy::Virtual, size, self.config.default_alignment)
    }

    /// Release a virtual region.
    pub fn virtual_free(&mut self) -> Result<bool, BlockError> {
        self.free_as(AllocStrategy::Virtual)
    }

    /// Allocate from the network buffer allocator. Its size is cached at
    /// allocation time; resizing copies into a fresh buffer.
    pub fn net_alloc(&mut self, size: usize) -> Result<(), BlockError> {
        self.alloc_as(AllocStrategy::Network, size, self.config.default_alignment)
    }

    /// Release a network buffer.
    pub fn net_free(&mut self) -> Result<bool, BlockError> {
        self.free_as(AllocStrategy::Network)
    }

    /// Allocate from the task allocator.
    pub fn com_task_alloc(&mut self, size: usize) -> Result<(), BlockError> {
        self.alloc_as(AllocStrategy::ComTask, size, self.config.default_alignment)
    }

    /// Release a task allocation.
    pub fn com_task_free(&mut self) -> Result<bool, BlockError> {
        self.free_as(AllocStrategy::ComTask)
    }

    // ── Ownership ───────────────────────────────────────────────

    /// Deep copy into a new allocation of the same strategy (and alignment).
    pub fn try_clone(&self) -> Result<Self, BlockError> {
        let mut copy = Self::with_config(self.config);
        if let Some(strategy) = self.strategy() {
            copy.alloc_as(strategy, self.size(), self.alignment())?;
            raw::copy_prefix(copy.as_mut_slice(), self.as_slice());
        }
        Ok(copy)
    }

    /// Move the allocation out, leaving this block empty with the same
    /// configuration. Pressure reported for the allocation moves with it.
    pub fn take(&mut self) -> Self {
        let config = self.config;
        let reported = mem::take(&mut self.reported);
        Self {
            alloc: mem::replace(&mut self.alloc, Allocation::Empty),
            config,
            reported,
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Current size in bytes; 0 when empty.
    pub fn size(&self) -> usize {
        self.alloc.size()
    }

    /// Whether the block holds no allocation.
    pub fn is_empty(&self) -> bool {
        matches!(self.alloc, Allocation::Empty)
    }

    /// Strategy of the current allocation, `None` when empty.
    pub fn strategy(&self) -> Option<AllocStrategy> {
        self.alloc.strategy()
    }

    /// Start address of the exposed bytes; 0 when empty.
    pub fn address(&self) -> usize {
        match &self.alloc {
            Allocation::Empty => 0,
            Allocation::ProcessHeap(buf) | Allocation::ComTask(buf) => buf.addr(),
            Allocation::Network { buf, .. } => buf.addr(),
            Allocation::Aligned(buf) => buf.addr(),
            Allocation::Virtual(region) => region.addr(),
        }
    }

    /// Guaranteed alignment of [`address`](Self::address); 0 when empty.
    pub fn alignment(&self) -> usize {
        match &self.alloc {
            Allocation::Empty => 0,
            Allocation::ProcessHeap(_) => HEAP_ALIGN,
            Allocation::Aligned(buf) => buf.alignment(),
            Allocation::Virtual(_) => PAGE_SIZE,
            Allocation::Network { .. } | Allocation::ComTask(_) => BUFFER_ALIGN,
        }
    }

    /// Configuration this block was built with.
    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    /// Best-effort consistency check for diagnostics.
    ///
    /// Empty blocks are invalid and aligned blocks re-read their stored
    /// base. Every other strategy only reports liveness.
    pub fn validate(&self) -> bool {
        match &self.alloc {
            Allocation::Empty => false,
            Allocation::Aligned(buf) => buf.prefix_intact(),
            _ => true,
        }
    }

    // ── Byte access ─────────────────────────────────────────────

    /// The block's bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.alloc.bytes()
    }

    /// The block's bytes, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.alloc.bytes_mut()
    }

    /// Copy the block into a fresh `Vec`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    // ── Pressure ────────────────────────────────────────────────

    /// Start or stop reporting this block's size to the pressure counter.
    pub fn set_pressure_tracking(&mut self, enabled: bool) {
        self.config.track_pressure = enabled;
        self.sync_pressure();
    }

    /// Whether this block reports to the pressure counter.
    pub fn is_pressure_tracked(&self) -> bool {
        self.config.track_pressure
    }

    /// Bytes this block has currently reported to the pressure counter.
    pub fn reported_pressure(&self) -> usize {
        self.reported
    }

    // ── Internals ───────────────────────────────────────────────

    fn alloc_as(
        &mut self,
        strategy: AllocStrategy,
        size: usize,
        alignment: usize,
    ) -> Result<(), BlockError> {
        self.free();
        if size == 0 {
            return Ok(());
        }
        self.alloc = Allocation::new(strategy, size, alignment)?;
        trace!(%strategy, requested = size, granted = self.size(), "block allocated");
        self.sync_pressure();
        Ok(())
    }

    fn free_as(&mut self, expected: AllocStrategy) -> Result<bool, BlockError> {
        match self.strategy() {
            None => Ok(false),
            Some(actual) if actual == expected => Ok(self.free()),
            Some(actual) => {
                warn!(%expected, %actual, "release path does not match block strategy");
                Err(BlockError::StrategyMismatch { expected, actual })
            }
        }
    }

    /// Allocate-copy-release within the current strategy.
    fn relocate(&mut self, new_size: usize) -> Result<(), BlockError> {
        let Some(strategy) = self.strategy() else {
            return Ok(());
        };
        let mut fresh = Allocation::new(strategy, new_size, self.alignment())?;
        raw::copy_prefix(fresh.bytes_mut(), self.alloc.bytes());
        let old = mem::replace(&mut self.alloc, fresh);
        if let Allocation::Aligned(buf) = old {
            buf.release();
        }
        Ok(())
    }

    fn sync_pressure(&mut self) {
        let target = if self.config.track_pressure {
            self.size()
        } else {
            0
        };
        if target > self.reported {
            pressure::add(target - self.reported);
        } else {
            pressure::remove(self.reported - target);
        }
        self.reported = target;
    }
}

impl Default for MemoryBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        self.free();
    }
}

impl fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("strategy", &self.strategy())
            .field("size", &self.size())
            .field("address", &format_args!("{:#x}", self.address()))
            .finish()
    }
}
