//! Fixed-width value codec for offset-addressed access.
//!
//! [`Primitive`] is implemented for the signed/unsigned 8–64-bit integers,
//! `f32`, `f64`, [`Guid`] and [`Timestamp`]. Values are always encoded
//! little-endian so a buffer's layout does not depend on the host.

use crate::id::{Guid, Timestamp};

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width value that can be read from and written to a byte slice.
///
/// Sealed: the set of supported types is closed.
pub trait Primitive: Copy + sealed::Sealed {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Decode from exactly [`SIZE`](Primitive::SIZE) bytes.
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len() != Self::SIZE`.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode into exactly [`SIZE`](Primitive::SIZE) bytes.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() != Self::SIZE`.
    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_primitive!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

impl sealed::Sealed for Guid {}

impl Primitive for Guid {
    const SIZE: usize = 16;

    fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(bytes);
        Guid::from_bytes_le(buf)
    }

    fn write_le(self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_bytes_le());
    }
}

impl sealed::Sealed for Timestamp {}

impl Primitive for Timestamp {
    const SIZE: usize = 8;

    fn read_le(bytes: &[u8]) -> Self {
        Timestamp(i64::read_le(bytes))
    }

    fn write_le(self, out: &mut [u8]) {
        self.0.write_le(out);
    }
}
