//! Handle-addressed blocks with bounds-checked access.
//!
//! [`BlockTable`] owns [`MemoryBlock`]s behind [`Handle`]s so callers
//! outside Rust never see a raw address. Every accessor checks its range
//! against the block's current size and returns
//! [`BlockError::OutOfBounds`] instead of panicking.

use memblob_core::{AllocStrategy, BlockError, Handle, HandleTable, Primitive};
use tracing::trace;

use crate::block::MemoryBlock;
use crate::config::BlockConfig;
use crate::view::{ReadView, WriteView};

/// A slot+generation table of owned blocks.
#[derive(Default)]
pub struct BlockTable {
    blocks: HandleTable<MemoryBlock>,
    config: BlockConfig,
}

impl BlockTable {
    /// An empty table with default block configuration.
    pub const fn new() -> Self {
        Self {
            blocks: HandleTable::new(),
            config: BlockConfig {
                track_pressure: false,
                default_alignment: BlockConfig::DEFAULT_ALIGNMENT,
            },
        }
    }

    /// An empty table whose blocks are built with `config`.
    pub fn with_config(config: BlockConfig) -> Result<Self, BlockError> {
        config.validate()?;
        Ok(Self {
            blocks: HandleTable::new(),
            config,
        })
    }

    /// Allocate a block and return its handle.
    pub fn alloc(
        &mut self,
        strategy: AllocStrategy,
        size: usize,
    ) -> Result<Handle, BlockError> {
        let block = MemoryBlock::allocate_with(self.config, strategy, size)?;
        Ok(self.insert(block))
    }

    /// Allocate an aligned block with an explicit alignment.
    pub fn alloc_aligned(
        &mut self,
        size: usize,
        alignment: usize,
    ) -> Result<Handle, BlockError> {
        let mut block = MemoryBlock::with_config(self.config);
        block.aligned_alloc(size, alignment)?;
        Ok(self.insert(block))
    }

    /// Take ownership of an existing block.
    pub fn insert(&mut self, block: MemoryBlock) -> Handle {
        let handle = self.blocks.insert(block);
        trace!(%handle, "block registered");
        handle
    }

    /// Remove a block from the table, handing ownership back.
    pub fn remove(&mut self, handle: Handle) -> Result<MemoryBlock, BlockError> {
        self.blocks
            .remove(handle)
            .ok_or(BlockError::InvalidHandle { handle })
    }

    /// Release a block and retire its handle. A second free of the same
    /// handle reports [`BlockError::InvalidHandle`].
    pub fn free(&mut self, handle: Handle) -> Result<(), BlockError> {
        let mut block = self.remove(handle)?;
        block.free();
        trace!(%handle, "block freed");
        Ok(())
    }

    /// Shared access to a block.
    pub fn get(&self, handle: Handle) -> Result<&MemoryBlock, BlockError> {
        self.blocks
            .get(handle)
            .ok_or(BlockError::InvalidHandle { handle })
    }

    /// Exclusive access to a block.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut MemoryBlock, BlockError> {
        self.blocks
            .get_mut(handle)
            .ok_or(BlockError::InvalidHandle { handle })
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the table holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Current size of a block.
    pub fn size(&self, handle: Handle) -> Result<usize, BlockError> {
        Ok(self.get(handle)?.size())
    }

    /// Resize a block within its strategy.
    pub fn resize(&mut self, handle: Handle, new_size: usize) -> Result<(), BlockError> {
        self.get_mut(handle)?.resize(new_size)
    }

    /// Copy a block's bytes out.
    pub fn to_vec(&self, handle: Handle) -> Result<Vec<u8>, BlockError> {
        Ok(self.get(handle)?.to_vec())
    }

    /// Read a `T` at a byte offset.
    pub fn read<T: Primitive>(&self, handle: Handle, offset: usize) -> Result<T, BlockError> {
        let block = self.get(handle)?;
        check_range(block, offset, T::SIZE)?;
        Ok(block.get_at_absolute(offset))
    }

    /// Write a `T` at a byte offset.
    pub fn write<T: Primitive>(
        &mut self,
        handle: Handle,
        offset: usize,
        value: T,
    ) -> Result<(), BlockError> {
        let block = self.get_mut(handle)?;
        check_range(block, offset, T::SIZE)?;
        block.set_at_absolute(offset, value);
        Ok(())
    }

    /// Copy exactly `out.len()` bytes from `offset`.
    pub fn read_bytes(
        &self,
        handle: Handle,
        offset: usize,
        out: &mut [u8],
    ) -> Result<(), BlockError> {
        let block = self.get(handle)?;
        check_range(block, offset, out.len())?;
        out.copy_from_slice(&block.as_slice()[offset..offset + out.len()]);
        Ok(())
    }

    /// Copy `bytes` in at `offset`; the whole range must fit.
    pub fn write_bytes(
        &mut self,
        handle: Handle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<(), BlockError> {
        let block = self.get_mut(handle)?;
        check_range(block, offset, bytes.len())?;
        block.as_mut_slice()[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Read the NUL-terminated UTF-16 units at `offset`, stopping at the
    /// end of the block if no terminator is found.
    pub fn read_string(&self, handle: Handle, offset: usize) -> Result<Vec<u16>, BlockError> {
        let block = self.get(handle)?;
        check_range(block, offset, 0)?;
        Ok(block.get_utf16(offset))
    }

    /// Write UTF-16 units plus a terminating NUL at `offset`. Returns the
    /// number of bytes written.
    pub fn write_string(
        &mut self,
        handle: Handle,
        offset: usize,
        units: &[u16],
    ) -> Result<usize, BlockError> {
        let block = self.get_mut(handle)?;
        check_range(block, offset, (units.len() + 1) * 2)?;
        Ok(block.set_utf16(offset, units))
    }

    /// [`MemoryBlock::push_out`] on a handle.
    pub fn push_out(
        &mut self,
        handle: Handle,
        offset: usize,
        delta: usize,
    ) -> Result<(), BlockError> {
        self.get_mut(handle)?.push_out(offset, delta)
    }

    /// [`MemoryBlock::pull_in`] on a handle.
    pub fn pull_in(
        &mut self,
        handle: Handle,
        offset: usize,
        delta: usize,
    ) -> Result<(), BlockError> {
        self.get_mut(handle)?.pull_in(offset, delta)
    }
}

fn check_range(block: &MemoryBlock, offset: usize, len: usize) -> Result<(), BlockError> {
    let size = block.size();
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(BlockError::OutOfBounds { offset, len, size }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_read_write_free() {
        let mut table = BlockTable::new();
        let h = table.alloc(AllocStrategy::ProcessHeap, 16).unwrap();
        table.write::<u32>(h, 4, 0x1234_5678).unwrap();
        assert_eq!(table.read::<u32>(h, 4).unwrap(), 0x1234_5678);
        assert_eq!(table.size(h).unwrap(), 16);
        table.free(h).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let mut table = BlockTable::new();
        let h = table.alloc(AllocStrategy::ComTask, 8).unwrap();
        assert_eq!(
            table.read::<u64>(h, 1),
            Err(BlockError::OutOfBounds {
                offset: 1,
                len: 8,
                size: 8
            })
        );
        assert!(table.write::<u8>(h, 8, 1).is_err());
        assert!(table.write_bytes(h, usize::MAX, &[1]).is_err());
        assert!(table.read_string(h, 9).is_err());
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut table = BlockTable::new();
        let h = table.alloc(AllocStrategy::Network, 8).unwrap();
        table.free(h).unwrap();
        assert_eq!(table.free(h), Err(BlockError::InvalidHandle { handle: h }));
        assert!(table.read::<u8>(h, 0).is_err());

        let h2 = table.alloc(AllocStrategy::Network, 8).unwrap();
        assert_eq!(h2.slot(), h.slot());
        assert!(table.size(h).is_err());
        assert!(table.size(h2).is_ok());
    }

    #[test]
    fn strings_and_bytes() {
        let mut table = BlockTable::new();
        let h = table.alloc(AllocStrategy::ProcessHeap, 32).unwrap();
        let units: Vec<u16> = "hey".encode_utf16().collect();
        assert_eq!(table.write_string(h, 2, &units).unwrap(), 8);
        assert_eq!(table.read_string(h, 2).unwrap(), units);

        table.write_bytes(h, 20, &[1, 2, 3]).unwrap();
        let mut out = [0u8; 3];
        table.read_bytes(h, 20, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3]);
        assert!(table.write_string(h, 30, &units).is_err());
    }

    #[test]
    fn shifting_through_handles() {
        let mut table = BlockTable::new();
        let h = table.insert(MemoryBlock::from_bytes(b"ABCDEFGHIJ").unwrap());
        table.push_out(h, 4, 6).unwrap();
        assert_eq!(table.size(h).unwrap(), 16);
        table.pull_in(h, 4, 6).unwrap();
        assert_eq!(table.to_vec(h).unwrap(), b"ABCDEFGHIJ");
        table.resize(h, 2).unwrap();
        assert_eq!(table.to_vec(h).unwrap(), b"AB");
    }

    #[test]
    fn aligned_blocks_through_table() {
        let mut table = BlockTable::new();
        let h = table.alloc_aligned(100, 128).unwrap();
        assert_eq!(table.get(h).unwrap().address() % 128, 0);
        assert!(table.alloc_aligned(100, 5).is_err());
        let block = table.remove(h).unwrap();
        assert_eq!(block.size(), 100);
    }
}
