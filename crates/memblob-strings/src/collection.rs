//! The packed string collection and its structural mutations.

use std::borrow::Cow;

use memblob_block::{MemoryBlock, ReadView};
use memblob_core::{AllocStrategy, CollectionError};
use tracing::trace;

use crate::config::{CollectionConfig, IndexMode};
use crate::framing::{Framing, OffsetIndex, Span};

pub(crate) fn utf16(value: &str) -> Vec<u16> {
    value.encode_utf16().collect()
}

/// An ordered sequence of UTF-16 entries packed into one [`MemoryBlock`].
///
/// Entries are laid out back to back under a [`Framing`]. Every structural
/// mutation shifts the bytes in place (`push_out` / `pull_in`) and then
/// refreshes the offset index, so lookups stay O(1) in
/// [`IndexMode::Cached`]. Validation happens before any byte moves; an
/// allocation failure partway through a shift is reported but not rolled
/// back.
#[derive(Debug)]
pub struct PackedStringCollection {
    pub(crate) block: MemoryBlock,
    pub(crate) config: CollectionConfig,
    pub(crate) index: Option<OffsetIndex>,
}

impl PackedStringCollection {
    /// An empty collection with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::default())
    }

    /// An empty collection with `config`.
    pub fn with_config(config: CollectionConfig) -> Self {
        let index = match config.index_mode {
            IndexMode::Cached => Some(OffsetIndex::default()),
            IndexMode::AlwaysRewalk => None,
        };
        Self {
            block: MemoryBlock::new(),
            config,
            index,
        }
    }

    /// A collection holding `values`, written with a single allocation.
    pub fn from_strings<I, S>(framing: Framing, values: I) -> Result<Self, CollectionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut collection = Self::with_config(CollectionConfig::with_framing(framing));
        collection.add_range(values)?;
        Ok(collection)
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Entry framing.
    pub fn framing(&self) -> Framing {
        self.config.framing
    }

    /// Index strategy.
    pub fn index_mode(&self) -> IndexMode {
        self.config.index_mode
    }

    /// Configuration in effect.
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// The backing block. Its size may exceed [`byte_len`](Self::byte_len)
    /// for page-granular strategies.
    pub fn block(&self) -> &MemoryBlock {
        &self.block
    }

    /// Number of entries.
    ///
    /// Length-prefixed collections read the header; null-terminated ones
    /// use the cached index or walk the buffer.
    pub fn count(&self) -> usize {
        match self.config.framing {
            Framing::LengthPrefixed(width) => {
                let bytes = self.block.as_slice();
                if bytes.len() < width.bytes() {
                    0
                } else {
                    width.read(&bytes[..width.bytes()]) as usize
                }
            }
            // Collection-owned buffers always walk cleanly.
            Framing::NullTerminated => self.layout().map_or(0, |layout| layout.len()),
        }
    }

    /// Whether the collection holds no entries.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Bytes of framed data, header included.
    pub fn byte_len(&self) -> usize {
        self.layout().map_or(0, |layout| layout.end())
    }

    /// The entry at `index` as a `String`.
    pub fn get(&self, index: usize) -> Result<String, CollectionError> {
        let units = self.get_units(index)?;
        String::from_utf16(&units).map_err(|_| CollectionError::InvalidUtf16 { index })
    }

    /// The raw UTF-16 units of the entry at `index`.
    pub fn get_units(&self, index: usize) -> Result<Vec<u16>, CollectionError> {
        let span = self.span(index)?;
        Ok(self.block.to_chars(span.start, span.units))
    }

    /// Length of the entry at `index`, in UTF-16 units.
    pub fn len_at(&self, index: usize) -> Result<usize, CollectionError> {
        Ok(self.span(index)?.units)
    }

    /// Byte offset of the first unit of the entry at `index`.
    pub fn byte_offset_of(&self, index: usize) -> Result<usize, CollectionError> {
        Ok(self.span(index)?.start)
    }

    /// Rebuild the offset index with one walk. No-op in
    /// [`IndexMode::AlwaysRewalk`].
    pub fn refresh(&mut self) -> Result<(), CollectionError> {
        if self.config.index_mode == IndexMode::Cached {
            self.index = Some(self.config.framing.walk(self.block.as_slice())?);
        }
        Ok(())
    }

    // ── Mutations ───────────────────────────────────────────────

    /// Append one entry.
    pub fn add(&mut self, value: &str) -> Result<(), CollectionError> {
        self.add_units(&utf16(value))
    }

    /// Append one entry given as UTF-16 units.
    pub fn add_units(&mut self, units: &[u16]) -> Result<(), CollectionError> {
        self.append(&[units])
    }

    /// Append several entries with a single resize.
    pub fn add_range<I, S>(&mut self, values: I) -> Result<(), CollectionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let encoded: Vec<Vec<u16>> = values.into_iter().map(|v| utf16(v.as_ref())).collect();
        let entries: Vec<&[u16]> = encoded.iter().map(Vec::as_slice).collect();
        self.append(&entries)
    }

    /// Insert an entry before `index`; appends when `index >= count()`.
    pub fn insert_at(&mut self, index: usize, value: &str) -> Result<(), CollectionError> {
        self.insert_units(index, &utf16(value))
    }

    /// [`insert_at`](Self::insert_at) with the entry given as UTF-16 units.
    pub fn insert_units(&mut self, index: usize, units: &[u16]) -> Result<(), CollectionError> {
        let framing = self.config.framing;
        framing.check_entry(units)?;
        let (count, span, used) = {
            let layout = self.layout()?;
            (layout.len(), layout.get(index), layout.end())
        };
        let Some(span) = span else {
            return self.append(&[units]);
        };
        framing.check_count(count + 1)?;
        let (start, _) = framing.record_range(span);
        let len = framing.record_len(units.len());
        let start = self.open_gap(start, used, len)?;
        framing.write_record(units, &mut self.block.as_mut_slice()[start..start + len]);
        self.set_count(count + 1);
        self.refresh()
    }

    /// Remove the entry at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<(), CollectionError> {
        let framing = self.config.framing;
        let (count, span) = self.span_with_count(index)?;
        let (start, end) = framing.record_range(span);
        let used = self.byte_len();
        self.block.pull_in_within(start, used, end - start)?;
        self.set_count(count - 1);
        self.refresh()
    }

    /// Replace the entry at `index`, shifting the tail by the change in
    /// encoded length.
    pub fn replace(&mut self, index: usize, value: &str) -> Result<(), CollectionError> {
        self.replace_units(index, &utf16(value))
    }

    /// [`replace`](Self::replace) with the entry given as UTF-16 units.
    pub fn replace_units(&mut self, index: usize, units: &[u16]) -> Result<(), CollectionError> {
        let framing = self.config.framing;
        framing.check_entry(units)?;
        let (_, span) = self.span_with_count(index)?;
        let (start, end) = framing.record_range(span);
        let used = self.byte_len();
        let old_len = end - start;
        let new_len = framing.record_len(units.len());
        if new_len > old_len {
            self.block.push_out_within(end, used, new_len - old_len)?;
        } else if new_len < old_len {
            self.block.pull_in_within(start + new_len, used, old_len - new_len)?;
        }
        framing.write_record(units, &mut self.block.as_mut_slice()[start..start + new_len]);
        self.refresh()
    }

    /// Keep entries `0..=last_index` and drop the rest.
    pub fn truncate(&mut self, last_index: usize) -> Result<(), CollectionError> {
        let framing = self.config.framing;
        let (_, span) = self.span_with_count(last_index)?;
        let (_, keep_end) = framing.record_range(span);
        let data_end = self.byte_len();
        self.block.pull_in_within(keep_end, data_end, data_end - keep_end)?;
        self.set_count(last_index + 1);
        self.refresh()
    }

    /// Remove every entry and release the block.
    pub fn clear(&mut self) {
        self.block.free();
        if self.index.is_some() {
            self.index = Some(OffsetIndex::default());
        }
    }

    /// Re-encode every entry under `framing` into a fresh block of the same
    /// strategy. Also converts between descriptor widths.
    ///
    /// Every entry is validated against the new framing first; on error the
    /// collection is unchanged.
    pub fn reframe(&mut self, framing: Framing) -> Result<(), CollectionError> {
        if framing == self.config.framing {
            return Ok(());
        }
        let entries = self.all_units()?;
        let encoded = framing.encode_all(entries.iter().map(Vec::as_slice))?;
        let block = self.fresh_block(&encoded)?;
        trace!(from = %self.config.framing, to = %framing, entries = entries.len(), "reframed");
        self.block = block;
        self.config.framing = framing;
        self.refresh()
    }

    // ── Internals ───────────────────────────────────────────────

    /// The cached index, or a fresh walk when running without one.
    pub(crate) fn layout(&self) -> Result<Cow<'_, OffsetIndex>, CollectionError> {
        match &self.index {
            Some(index) => Ok(Cow::Borrowed(index)),
            None => self
                .config
                .framing
                .walk(self.block.as_slice())
                .map(Cow::Owned),
        }
    }

    fn span(&self, index: usize) -> Result<Span, CollectionError> {
        self.span_with_count(index).map(|(_, span)| span)
    }

    fn span_with_count(&self, index: usize) -> Result<(usize, Span), CollectionError> {
        let layout = self.layout()?;
        let count = layout.len();
        layout
            .get(index)
            .map(|span| (count, span))
            .ok_or(CollectionError::IndexOutOfRange { index, count })
    }

    pub(crate) fn all_units(&self) -> Result<Vec<Vec<u16>>, CollectionError> {
        let layout = self.layout()?;
        Ok(layout
            .spans()
            .iter()
            .map(|span| self.block.to_chars(span.start, span.units))
            .collect())
    }

    /// Strategy for new blocks: the live block's, else the configured one.
    fn strategy(&self) -> AllocStrategy {
        self.block.strategy().unwrap_or(self.config.strategy)
    }

    /// A block of this collection's strategy holding `bytes`.
    pub(crate) fn fresh_block(&self, bytes: &[u8]) -> Result<MemoryBlock, CollectionError> {
        if bytes.is_empty() {
            return Ok(MemoryBlock::new());
        }
        let mut block = MemoryBlock::allocate(self.strategy(), bytes.len())?;
        block.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
        Ok(block)
    }

    /// Open `len` zeroed bytes at `offset` in data ending at `used`, taking
    /// them from the block's slack when it has enough. An empty block is
    /// allocated with room for the header; returns where the gap actually
    /// starts.
    fn open_gap(
        &mut self,
        offset: usize,
        used: usize,
        len: usize,
    ) -> Result<usize, CollectionError> {
        if self.block.is_empty() {
            let header = self.config.framing.header_len();
            self.block = MemoryBlock::allocate(self.strategy(), header + len)?;
            return Ok(header);
        }
        self.block.push_out_within(offset, used, len)?;
        Ok(offset)
    }

    fn append(&mut self, entries: &[&[u16]]) -> Result<(), CollectionError> {
        let framing = self.config.framing;
        for units in entries {
            framing.check_entry(units)?;
        }
        if entries.is_empty() {
            return Ok(());
        }
        let (count, end) = {
            let layout = self.layout()?;
            (layout.len(), layout.end())
        };
        framing.check_count(count + entries.len())?;
        let total: usize = entries.iter().map(|u| framing.record_len(u.len())).sum();
        let mut pos = self.open_gap(end, end, total)?;
        let bytes = self.block.as_mut_slice();
        for units in entries {
            let len = framing.record_len(units.len());
            framing.write_record(units, &mut bytes[pos..pos + len]);
            pos += len;
        }
        self.set_count(count + entries.len());
        self.refresh()
    }

    fn set_count(&mut self, count: usize) {
        if let Framing::LengthPrefixed(width) = self.config.framing {
            let d = width.bytes();
            if self.block.size() >= d {
                width.write(count, &mut self.block.as_mut_slice()[..d]);
            }
        }
    }
}

impl Default for PackedStringCollection {
    fn default() -> Self {
        Self::new()
    }
}
