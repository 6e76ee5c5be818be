//! Strongly-typed identifiers and fixed-width value types.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Token for a value stored in a [`HandleTable`](crate::HandleTable): a
/// block in a block table or a collection behind the C ABI.
///
/// Encoding: upper 32 bits = slot index, lower 32 bits = generation.
/// A handle whose generation no longer matches its slot is stale and
/// never resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl Handle {
    /// Build a handle from its slot and generation halves.
    pub fn from_parts(slot: u32, generation: u32) -> Self {
        Self(((slot as u64) << 32) | (generation as u64))
    }

    /// The slot index half.
    pub fn slot(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The generation half.
    pub fn generation(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slot(), self.generation())
    }
}

impl From<u64> for Handle {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// A 128-bit globally unique identifier in the mixed-endian layout used by
/// native interfaces: `data1`..`data3` little-endian, `data4` as raw bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid {
    /// First 32 bits.
    pub data1: u32,
    /// Next 16 bits.
    pub data2: u16,
    /// Next 16 bits.
    pub data3: u16,
    /// Final 64 bits, stored byte-for-byte.
    pub data4: [u8; 8],
}

impl Guid {
    /// The all-zero GUID.
    pub const NIL: Guid = Guid {
        data1: 0,
        data2: 0,
        data3: 0,
        data4: [0; 8],
    };

    /// Build a GUID from its four fields.
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Decode from the 16-byte in-memory layout.
    pub fn from_bytes_le(bytes: [u8; 16]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&bytes[8..16]);
        Self {
            data1: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data2: u16::from_le_bytes([bytes[4], bytes[5]]),
            data3: u16::from_le_bytes([bytes[6], bytes[7]]),
            data4,
        }
    }

    /// Encode to the 16-byte in-memory layout.
    pub fn to_bytes_le(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..4].copy_from_slice(&self.data1.to_le_bytes());
        out[4..6].copy_from_slice(&self.data2.to_le_bytes());
        out[6..8].copy_from_slice(&self.data3.to_le_bytes());
        out[8..16].copy_from_slice(&self.data4);
        out
    }

    /// Whether every bit is zero.
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

/// A 64-bit timestamp counted in 100-nanosecond intervals since
/// 1601-01-01 UTC (the native file-time epoch).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Intervals between 1601-01-01 and 1970-01-01.
    pub const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

    /// Intervals per second.
    pub const TICKS_PER_SECOND: i64 = 10_000_000;

    /// Convert from a wall-clock time. Times before 1601 saturate to 0.
    pub fn from_system_time(time: SystemTime) -> Self {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self::UNIX_EPOCH_TICKS.saturating_add(duration_ticks(after)),
            Err(before) => Self::UNIX_EPOCH_TICKS.saturating_sub(duration_ticks(before.duration())),
        };
        Self(ticks.max(0))
    }

    /// Convert to a wall-clock time.
    pub fn to_system_time(self) -> SystemTime {
        let rel = self.0 - Self::UNIX_EPOCH_TICKS;
        let magnitude = Duration::new(
            rel.unsigned_abs() / Self::TICKS_PER_SECOND as u64,
            ((rel.unsigned_abs() % Self::TICKS_PER_SECOND as u64) * 100) as u32,
        );
        if rel >= 0 {
            UNIX_EPOCH + magnitude
        } else {
            UNIX_EPOCH - magnitude
        }
    }
}

fn duration_ticks(d: Duration) -> i64 {
    let ticks = d.as_nanos() / 100;
    i64::try_from(ticks).unwrap_or(i64::MAX)
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(v: i64) -> Self {
        Self(v)
    }
}
