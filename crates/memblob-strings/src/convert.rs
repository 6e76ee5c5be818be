//! Conversions between collections, blocks and plain buffers.

use memblob_block::MemoryBlock;
use memblob_core::CollectionError;
use tracing::warn;

use crate::collection::PackedStringCollection;
use crate::config::CollectionConfig;
use crate::framing::Framing;

impl PackedStringCollection {
    /// Copy a framed buffer into a new collection.
    ///
    /// The buffer is walked under `framing` first; a record that runs past
    /// the end is [`CollectionError::Malformed`]. Bytes after the last
    /// record (including a null-terminated end sentinel) are dropped.
    pub fn from_bytes(bytes: &[u8], framing: Framing) -> Result<Self, CollectionError> {
        let index = framing.walk(bytes).inspect_err(|e| {
            warn!(%framing, len = bytes.len(), error = %e, "rejected framed buffer");
        })?;
        let mut collection = Self::with_config(CollectionConfig::with_framing(framing));
        collection.block = MemoryBlock::from_bytes(&bytes[..index.end()])?;
        collection.refresh()?;
        Ok(collection)
    }

    /// Adopt an existing block that already holds framed data.
    ///
    /// Validated like [`from_bytes`](Self::from_bytes); trailing bytes are
    /// removed in place. On error the block is dropped.
    pub fn from_block(mut block: MemoryBlock, framing: Framing) -> Result<Self, CollectionError> {
        let end = framing
            .walk(block.as_slice())
            .inspect_err(|e| {
                warn!(%framing, len = block.size(), error = %e, "rejected framed block");
            })?
            .end();
        let size = block.size();
        block.pull_in(end, size - end)?;
        let config = CollectionConfig {
            framing,
            strategy: block.strategy().unwrap_or_default(),
            ..CollectionConfig::default()
        };
        let mut collection = Self::with_config(config);
        collection.block = block;
        collection.refresh()?;
        Ok(collection)
    }

    /// Copy the framed bytes out, header included and slack excluded.
    pub fn to_bytes(&self) -> Vec<u8> {
        let end = self.byte_len();
        self.block.as_slice()[..end].to_vec()
    }

    /// Give up the collection and keep its block.
    pub fn into_block(self) -> MemoryBlock {
        self.block
    }

    /// Every entry as a `String`, failing on invalid UTF-16.
    pub fn to_vec(&self) -> Result<Vec<String>, CollectionError> {
        (0..self.count()).map(|i| self.get(i)).collect()
    }

    /// Deep copy into a fresh block of the same strategy.
    pub fn try_clone(&self) -> Result<Self, CollectionError> {
        Ok(Self {
            block: self.block.try_clone()?,
            config: self.config,
            index: self.index.clone(),
        })
    }
}
