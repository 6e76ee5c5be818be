//! On-buffer framings for packed UTF-16 entries.
//!
//! Two layouts, both little-endian:
//!
//! ```text
//! LengthPrefixed(D):  [count: D][len: D][2*len bytes] [len: D][2*len bytes] ...
//! NullTerminated:     [2*len bytes][0x0000] [2*len bytes][0x0000] ...
//! ```
//!
//! A walk over either layout produces an [`OffsetIndex`]: the start of each
//! entry's text plus the byte offset where the data ends.

use std::fmt;

use memblob_core::CollectionError;
use smallvec::SmallVec;

/// Byte width of the count and length descriptors in length-prefixed
/// framing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorWidth {
    /// One byte; entries and counts up to 255.
    U8,
    /// Two bytes.
    U16,
    /// Four bytes. The default.
    U32,
    /// Eight bytes.
    U64,
}

impl DescriptorWidth {
    /// All widths, narrowest first.
    pub const ALL: [DescriptorWidth; 4] = [Self::U8, Self::U16, Self::U32, Self::U64];

    /// Width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }

    /// Width from a byte count, if it is one of 1, 2, 4 or 8.
    pub fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            1 => Some(Self::U8),
            2 => Some(Self::U16),
            4 => Some(Self::U32),
            8 => Some(Self::U64),
            _ => None,
        }
    }

    /// Largest value a descriptor of this width can hold.
    pub fn max_value(self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
            Self::U64 => u64::MAX,
        }
    }

    /// Whether `value` fits a descriptor of this width.
    pub fn fits(self, value: usize) -> bool {
        u64::try_from(value).is_ok_and(|v| v <= self.max_value())
    }

    /// Decode a descriptor from exactly `self.bytes()` bytes.
    pub(crate) fn read(self, bytes: &[u8]) -> u64 {
        let mut buf = [0u8; 8];
        buf[..self.bytes()].copy_from_slice(bytes);
        u64::from_le_bytes(buf)
    }

    /// Encode a descriptor into exactly `self.bytes()` bytes. Callers check
    /// [`fits`](Self::fits) first.
    pub(crate) fn write(self, value: usize, out: &mut [u8]) {
        let n = self.bytes();
        out.copy_from_slice(&(value as u64).to_le_bytes()[..n]);
    }
}

impl fmt::Display for DescriptorWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.bytes() * 8)
    }
}

/// How entries are delimited in the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Framing {
    /// A count header, then `[length][units]` records.
    LengthPrefixed(DescriptorWidth),
    /// `[units][NUL]` records. Empty entries are not representable.
    NullTerminated,
}

impl Default for Framing {
    fn default() -> Self {
        Self::LengthPrefixed(DescriptorWidth::U32)
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthPrefixed(width) => write!(f, "length-prefixed({width})"),
            Self::NullTerminated => f.write_str("null-terminated"),
        }
    }
}

/// Position of one entry's text inside the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first UTF-16 unit.
    pub start: usize,
    /// Length in UTF-16 units.
    pub units: usize,
}

impl Span {
    /// Byte offset just past the last unit (excluding any terminator).
    pub fn text_end(&self) -> usize {
        self.start + self.units * 2
    }
}

/// Entry positions produced by one walk of the buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OffsetIndex {
    spans: SmallVec<[Span; 8]>,
    end: usize,
}

impl OffsetIndex {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Span of the entry at `index`.
    pub fn get(&self, index: usize) -> Option<Span> {
        self.spans.get(index).copied()
    }

    /// All spans, in buffer order.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Byte offset just past the last record; the header length for an
    /// empty length-prefixed buffer, 0 for an empty block.
    pub fn end(&self) -> usize {
        self.end
    }
}

fn malformed(reason: impl Into<String>) -> CollectionError {
    CollectionError::Malformed {
        reason: reason.into(),
    }
}

fn unit_at(bytes: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([bytes[pos], bytes[pos + 1]])
}

impl Framing {
    /// Bytes before the first record.
    pub fn header_len(self) -> usize {
        match self {
            Self::LengthPrefixed(width) => width.bytes(),
            Self::NullTerminated => 0,
        }
    }

    /// Encoded size of a record holding `units` UTF-16 units.
    pub fn record_len(self, units: usize) -> usize {
        match self {
            Self::LengthPrefixed(width) => width.bytes() + units * 2,
            Self::NullTerminated => units * 2 + 2,
        }
    }

    /// Byte range `[start, end)` of the whole record around `span`.
    pub fn record_range(self, span: Span) -> (usize, usize) {
        match self {
            Self::LengthPrefixed(width) => (span.start - width.bytes(), span.text_end()),
            Self::NullTerminated => (span.start, span.text_end() + 2),
        }
    }

    /// Whether `units` can be stored as one entry.
    pub fn check_entry(self, units: &[u16]) -> Result<(), CollectionError> {
        match self {
            Self::LengthPrefixed(width) => {
                if !width.fits(units.len()) {
                    return Err(CollectionError::LengthOverflow {
                        len: units.len(),
                        width: width.bytes(),
                    });
                }
            }
            Self::NullTerminated => {
                if units.is_empty() {
                    return Err(CollectionError::EmptyEntry);
                }
                if let Some(position) = units.iter().position(|&u| u == 0) {
                    return Err(CollectionError::EmbeddedNul { position });
                }
            }
        }
        Ok(())
    }

    /// Whether `count` entries can be recorded in the header.
    pub fn check_count(self, count: usize) -> Result<(), CollectionError> {
        match self {
            Self::LengthPrefixed(width) if !width.fits(count) => {
                Err(CollectionError::CountOverflow {
                    count,
                    width: width.bytes(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Encode one record into `out`, which must be exactly
    /// [`record_len`](Self::record_len) bytes.
    pub(crate) fn write_record(self, units: &[u16], out: &mut [u8]) {
        let text = match self {
            Self::LengthPrefixed(width) => {
                let (desc, text) = out.split_at_mut(width.bytes());
                width.write(units.len(), desc);
                text
            }
            Self::NullTerminated => {
                let n = out.len();
                out[n - 2..].fill(0);
                &mut out[..n - 2]
            }
        };
        for (pair, unit) in text.chunks_exact_mut(2).zip(units) {
            pair.copy_from_slice(&unit.to_le_bytes());
        }
    }

    /// Encode a full buffer (header included) for `entries`.
    pub(crate) fn encode_all<'a>(
        self,
        entries: impl Iterator<Item = &'a [u16]> + Clone,
    ) -> Result<Vec<u8>, CollectionError> {
        let mut count = 0usize;
        let mut total = self.header_len();
        for units in entries.clone() {
            self.check_entry(units)?;
            count += 1;
            total += self.record_len(units.len());
        }
        self.check_count(count)?;
        let mut out = vec![0u8; total];
        if let Self::LengthPrefixed(width) = self {
            width.write(count, &mut out[..width.bytes()]);
        }
        let mut pos = self.header_len();
        for units in entries {
            let len = self.record_len(units.len());
            self.write_record(units, &mut out[pos..pos + len]);
            pos += len;
        }
        Ok(out)
    }

    /// Walk `bytes` and index every entry.
    ///
    /// Bytes after the last record are ignored. A record that runs past the
    /// end of `bytes` is [`CollectionError::Malformed`].
    pub fn walk(self, bytes: &[u8]) -> Result<OffsetIndex, CollectionError> {
        match self {
            Self::LengthPrefixed(width) => walk_length_prefixed(width, bytes),
            Self::NullTerminated => walk_null_terminated(bytes),
        }
    }
}

fn walk_length_prefixed(
    width: DescriptorWidth,
    bytes: &[u8],
) -> Result<OffsetIndex, CollectionError> {
    let mut index = OffsetIndex::default();
    if bytes.is_empty() {
        return Ok(index);
    }
    let d = width.bytes();
    if bytes.len() < d {
        return Err(malformed(format!(
            "{} bytes cannot hold a {d}-byte count header",
            bytes.len()
        )));
    }
    let count = usize::try_from(width.read(&bytes[..d]))
        .map_err(|_| malformed("count header exceeds addressable size"))?;
    // Every record needs at least `d` bytes; don't trust the header for
    // the reservation.
    index.spans.reserve(count.min((bytes.len() - d) / d));
    let mut pos = d;
    for i in 0..count {
        if pos + d > bytes.len() {
            return Err(malformed(format!(
                "header claims {count} entries but record {i} starts past the end"
            )));
        }
        let units = usize::try_from(width.read(&bytes[pos..pos + d]))
            .map_err(|_| malformed(format!("record {i} length exceeds addressable size")))?;
        let start = pos + d;
        pos = units
            .checked_mul(2)
            .and_then(|n| start.checked_add(n))
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| malformed(format!("record {i} of {units} units runs past the end")))?;
        index.spans.push(Span { start, units });
    }
    index.end = pos;
    Ok(index)
}

fn walk_null_terminated(bytes: &[u8]) -> Result<OffsetIndex, CollectionError> {
    let mut index = OffsetIndex::default();
    let mut pos = 0;
    while pos + 2 <= bytes.len() && unit_at(bytes, pos) != 0 {
        let mut cur = pos;
        while cur + 2 <= bytes.len() && unit_at(bytes, cur) != 0 {
            cur += 2;
        }
        if cur + 2 > bytes.len() {
            return Err(malformed(format!(
                "entry {} has no terminator",
                index.spans.len()
            )));
        }
        index.spans.push(Span {
            start: pos,
            units: (cur - pos) / 2,
        });
        pos = cur + 2;
    }
    index.end = pos;
    Ok(index)
}
