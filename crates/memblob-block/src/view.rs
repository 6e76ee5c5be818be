//! Typed, offset-addressed access over a block's bytes.
//!
//! [`ReadView`] and [`WriteView`] are implemented by [`MemoryBlock`],
//! [`TypedView`] and [`TypedViewMut`]. Primitive and string accessors do no
//! soft bounds checking: an offset past the end panics on slice indexing.
//! Bulk copies clamp to the remaining bytes instead. Error-returning checks
//! live in [`BlockTable`](crate::BlockTable) and the string collection.

use std::ops::{Bound, RangeBounds};

use memblob_core::Primitive;

use crate::block::MemoryBlock;

/// Width of the address fields read by the indirect accessors.
pub const POINTER_WIDTH: usize = std::mem::size_of::<usize>();

fn resolve_range(range: impl RangeBounds<usize>, len: usize) -> Option<(usize, usize)> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.checked_add(1)?,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.checked_add(1)?,
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    (start <= end && end <= len).then_some((start, end))
}

fn utf16_units(bytes: &[u8]) -> impl Iterator<Item = u16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
}

/// Read access at byte offsets.
pub trait ReadView {
    /// The bytes being viewed.
    fn view_bytes(&self) -> &[u8];

    /// Read the `index`-th `T`, at byte offset `index * T::SIZE`.
    fn get_at<T: Primitive>(&self, index: usize) -> T {
        self.get_at_absolute(index * T::SIZE)
    }

    /// Read a `T` at a byte offset.
    fn get_at_absolute<T: Primitive>(&self, offset: usize) -> T {
        T::read_le(&self.view_bytes()[offset..offset + T::SIZE])
    }

    /// Number of UTF-16 units from `offset` up to the first NUL unit, or to
    /// the end of the view if none.
    fn string_len(&self, offset: usize) -> usize {
        utf16_units(&self.view_bytes()[offset..])
            .take_while(|&u| u != 0)
            .count()
    }

    /// The NUL-terminated UTF-16 units starting at `offset`.
    fn get_utf16(&self, offset: usize) -> Vec<u16> {
        utf16_units(&self.view_bytes()[offset..])
            .take_while(|&u| u != 0)
            .collect()
    }

    /// The NUL-terminated UTF-16 string at `offset`. Unpaired surrogates
    /// become U+FFFD.
    fn get_string(&self, offset: usize) -> String {
        String::from_utf16_lossy(&self.get_utf16(offset))
    }

    /// The NUL-terminated UTF-8 string at `offset`. Invalid sequences
    /// become U+FFFD.
    fn get_utf8_string(&self, offset: usize) -> String {
        let tail = &self.view_bytes()[offset..];
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        String::from_utf8_lossy(&tail[..end]).into_owned()
    }

    /// Resolve the address field at `offset` to an offset inside this view.
    ///
    /// `None` if the address points outside the view. Addresses go stale
    /// whenever the underlying block moves.
    fn get_pointer_at_absolute(&self, offset: usize) -> Option<usize> {
        let mut raw = [0u8; POINTER_WIDTH];
        raw.copy_from_slice(&self.view_bytes()[offset..offset + POINTER_WIDTH]);
        let target = usize::from_le_bytes(raw);
        let bytes = self.view_bytes();
        let base = bytes.as_ptr() as usize;
        target
            .checked_sub(base)
            .filter(|&rel| rel < bytes.len())
    }

    /// The UTF-16 string at the address stored at `offset`.
    fn get_string_indirect(&self, offset: usize) -> Option<String> {
        self.get_pointer_at_absolute(offset)
            .map(|target| self.get_string(target))
    }

    /// The UTF-8 string at the address stored at `offset`.
    fn get_utf8_string_indirect(&self, offset: usize) -> Option<String> {
        self.get_pointer_at_absolute(offset)
            .map(|target| self.get_utf8_string(target))
    }

    /// Read a list of NUL-terminated UTF-16 strings ending in an empty
    /// string (a double NUL) or at the end of the view.
    fn get_string_array(&self, offset: usize) -> Vec<String> {
        let len = self.view_bytes().len();
        let mut out = Vec::new();
        let mut pos = offset;
        while pos + 2 <= len {
            let units = self.get_utf16(pos);
            if units.is_empty() {
                break;
            }
            pos += (units.len() + 1) * 2;
            out.push(String::from_utf16_lossy(&units));
        }
        out
    }

    /// Copy up to `len` bytes from `offset`. Clamped to the view.
    fn to_bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        let bytes = self.view_bytes();
        let start = offset.min(bytes.len());
        let end = start.saturating_add(len).min(bytes.len());
        bytes[start..end].to_vec()
    }

    /// Copy up to `len` UTF-16 units from `offset`. Clamped to the view.
    fn to_chars(&self, offset: usize, len: usize) -> Vec<u16> {
        utf16_units(&self.to_bytes(offset, len.saturating_mul(2))).collect()
    }

    /// Copy up to `count` values of `T` from `offset`. Clamped to whole
    /// values inside the view.
    fn to_vec_of<T: Primitive>(&self, offset: usize, count: usize) -> Vec<T> {
        self.to_bytes(offset, count.saturating_mul(T::SIZE))
            .chunks_exact(T::SIZE)
            .map(T::read_le)
            .collect()
    }
}

/// Write access at byte offsets.
pub trait WriteView: ReadView {
    /// The bytes being viewed, mutably.
    fn view_bytes_mut(&mut self) -> &mut [u8];

    /// Write the `index`-th `T`, at byte offset `index * T::SIZE`.
    fn set_at<T: Primitive>(&mut self, index: usize, value: T) {
        self.set_at_absolute(index * T::SIZE, value);
    }

    /// Write a `T` at a byte offset.
    fn set_at_absolute<T: Primitive>(&mut self, offset: usize, value: T) {
        value.write_le(&mut self.view_bytes_mut()[offset..offset + T::SIZE]);
    }

    /// Write UTF-16 units followed by a NUL unit. Returns bytes written.
    fn set_utf16(&mut self, offset: usize, units: &[u16]) -> usize {
        let total = (units.len() + 1) * 2;
        let out = &mut self.view_bytes_mut()[offset..offset + total];
        for (pair, unit) in out.chunks_exact_mut(2).zip(units.iter().chain(&[0])) {
            pair.copy_from_slice(&unit.to_le_bytes());
        }
        total
    }

    /// Write `value` as NUL-terminated UTF-16. Returns bytes written.
    fn set_string(&mut self, offset: usize, value: &str) -> usize {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.set_utf16(offset, &units)
    }

    /// Write `value` as NUL-terminated UTF-8. Returns bytes written.
    fn set_utf8_string(&mut self, offset: usize, value: &str) -> usize {
        let total = value.len() + 1;
        let out = &mut self.view_bytes_mut()[offset..offset + total];
        out[..value.len()].copy_from_slice(value.as_bytes());
        out[value.len()] = 0;
        total
    }

    /// Store the address of `target` (an offset in this view) at `offset`.
    ///
    /// Returns `false` without writing if `target` is outside the view.
    fn set_pointer_at_absolute(&mut self, offset: usize, target: usize) -> bool {
        let bytes = self.view_bytes_mut();
        if target >= bytes.len() {
            return false;
        }
        let addr = bytes.as_ptr() as usize + target;
        bytes[offset..offset + POINTER_WIDTH].copy_from_slice(&addr.to_le_bytes());
        true
    }

    /// Write UTF-16 at the address stored at `offset`. `false` if the
    /// address is outside the view or the string does not fit.
    fn set_string_indirect(&mut self, offset: usize, value: &str) -> bool {
        let Some(target) = self.get_pointer_at_absolute(offset) else {
            return false;
        };
        let units: Vec<u16> = value.encode_utf16().collect();
        if target + (units.len() + 1) * 2 > self.view_bytes().len() {
            return false;
        }
        self.set_utf16(target, &units);
        true
    }

    /// Write UTF-8 at the address stored at `offset`. `false` if the
    /// address is outside the view or the string does not fit.
    fn set_utf8_string_indirect(&mut self, offset: usize, value: &str) -> bool {
        let Some(target) = self.get_pointer_at_absolute(offset) else {
            return false;
        };
        if target + value.len() + 1 > self.view_bytes().len() {
            return false;
        }
        self.set_utf8_string(target, value);
        true
    }

    /// Copy `bytes` in at `offset`, clamped to the view. Returns the number
    /// of bytes copied.
    fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> usize {
        let out = self.view_bytes_mut();
        let start = offset.min(out.len());
        let n = bytes.len().min(out.len() - start);
        out[start..start + n].copy_from_slice(&bytes[..n]);
        n
    }

    /// Zero a byte range; `..` clears everything. A range outside the view
    /// is ignored.
    fn zero(&mut self, range: impl RangeBounds<usize>) {
        let out = self.view_bytes_mut();
        if let Some((start, end)) = resolve_range(range, out.len()) {
            out[start..end].fill(0);
        }
    }
}

/// Read-only typed view over a borrowed byte range.
#[derive(Clone, Copy, Debug)]
pub struct TypedView<'a> {
    bytes: &'a [u8],
}

impl<'a> TypedView<'a> {
    /// View `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Length of the view in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The underlying bytes, with the view's lifetime.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl ReadView for TypedView<'_> {
    fn view_bytes(&self) -> &[u8] {
        self.bytes
    }
}

/// Mutable typed view over a borrowed byte range.
#[derive(Debug)]
pub struct TypedViewMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> TypedViewMut<'a> {
    /// View `bytes` mutably.
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Length of the view in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ReadView for TypedViewMut<'_> {
    fn view_bytes(&self) -> &[u8] {
        &*self.bytes
    }
}

impl WriteView for TypedViewMut<'_> {
    fn view_bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }
}

impl ReadView for MemoryBlock {
    fn view_bytes(&self) -> &[u8] {
        self.as_slice()
    }
}

impl WriteView for MemoryBlock {
    fn view_bytes_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl MemoryBlock {
    /// Borrow the block as a read-only typed view.
    pub fn view(&self) -> TypedView<'_> {
        TypedView::new(self.as_slice())
    }

    /// Borrow the block as a mutable typed view.
    pub fn view_mut(&mut self) -> TypedViewMut<'_> {
        TypedViewMut::new(self.as_mut_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memblob_core::{Guid, Timestamp};

    fn block(size: usize) -> MemoryBlock {
        let mut block = MemoryBlock::new();
        block.alloc(size).unwrap();
        block
    }

    #[test]
    fn scaled_and_absolute_accessors_agree() {
        let mut b = block(32);
        b.set_at::<u32>(2, 0xdead_beef);
        assert_eq!(b.get_at_absolute::<u32>(8), 0xdead_beef);
        assert_eq!(&b.as_slice()[8..12], &[0xef, 0xbe, 0xad, 0xde]);
        b.set_at_absolute::<i16>(1, -2);
        assert_eq!(b.get_at_absolute::<i16>(1), -2);
    }

    #[test]
    fn every_primitive_round_trips() {
        let mut b = block(64);
        b.set_at::<i8>(0, -5);
        b.set_at::<u16>(1, 65_000);
        b.set_at::<i32>(1, -70_000);
        b.set_at::<u64>(1, u64::MAX - 3);
        b.set_at::<f32>(4, 1.5);
        b.set_at::<f64>(3, -2.25);
        assert_eq!(b.get_at::<i8>(0), -5);
        assert_eq!(b.get_at::<u16>(1), 65_000);
        assert_eq!(b.get_at::<i32>(1), -70_000);
        assert_eq!(b.get_at::<u64>(1), u64::MAX - 3);
        assert_eq!(b.get_at::<f32>(4), 1.5);
        assert_eq!(b.get_at::<f64>(3), -2.25);
    }

    #[test]
    fn guid_and_timestamp_accessors() {
        let mut b = block(32);
        let g = Guid::new(1, 2, 3, [4, 5, 6, 7, 8, 9, 10, 11]);
        b.set_at::<Guid>(1, g);
        assert_eq!(b.get_at_absolute::<Guid>(16), g);
        b.set_at::<Timestamp>(0, Timestamp(42));
        assert_eq!(b.get_at::<Timestamp>(0), Timestamp(42));
    }

    #[test]
    #[should_panic]
    fn primitive_past_end_panics() {
        let b = block(4);
        let _ = b.get_at_absolute::<u32>(2);
    }

    #[test]
    fn utf16_strings() {
        let mut b = block(64);
        let written = b.set_string(4, "héllo");
        assert_eq!(written, 12);
        assert_eq!(b.get_string(4), "héllo");
        assert_eq!(b.string_len(4), 5);
        assert_eq!(b.get_utf16(4).len(), 5);
    }

    #[test]
    fn string_without_terminator_stops_at_end() {
        let mut b = block(6);
        b.set_at::<u16>(0, 'a' as u16);
        b.set_at::<u16>(1, 'b' as u16);
        b.set_at::<u16>(2, 'c' as u16);
        assert_eq!(b.get_string(0), "abc");
    }

    #[test]
    fn utf8_strings() {
        let mut b = block(16);
        assert_eq!(b.set_utf8_string(2, "ünï"), 6);
        assert_eq!(b.get_utf8_string(2), "ünï");
    }

    #[test]
    fn indirect_strings_resolve_inside_block() {
        let mut b = block(64);
        assert!(b.set_pointer_at_absolute(0, 16));
        assert_eq!(b.get_pointer_at_absolute(0), Some(16));
        assert!(b.set_string_indirect(0, "ptr"));
        assert_eq!(b.get_string(16), "ptr");
        assert_eq!(b.get_string_indirect(0).as_deref(), Some("ptr"));

        assert!(b.set_pointer_at_absolute(8, 40));
        assert!(b.set_utf8_string_indirect(8, "u8"));
        assert_eq!(b.get_utf8_string_indirect(8).as_deref(), Some("u8"));
    }

    #[test]
    fn indirect_outside_block_is_rejected() {
        let mut b = block(32);
        assert!(!b.set_pointer_at_absolute(0, 32));
        b.set_at_absolute::<u64>(0, 1);
        assert_eq!(b.get_pointer_at_absolute(0), None);
        assert_eq!(b.get_string_indirect(0), None);
        assert!(!b.set_string_indirect(0, "x"));
    }

    #[test]
    fn indirect_write_that_does_not_fit_is_rejected() {
        let mut b = block(16);
        assert!(b.set_pointer_at_absolute(0, 12));
        assert!(!b.set_string_indirect(0, "abc"));
        assert!(b.set_string_indirect(0, "a"));
    }

    #[test]
    fn string_array_stops_at_double_nul() {
        let mut b = block(64);
        let mut pos = 0;
        for s in ["one", "two", "three"] {
            pos += b.set_string(pos, s);
        }
        b.set_at_absolute::<u16>(pos, 0);
        b.set_string(pos + 2, "hidden");
        assert_eq!(b.get_string_array(0), vec!["one", "two", "three"]);
    }

    #[test]
    fn bulk_copies_clamp() {
        let b = MemoryBlock::from_bytes(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(b.to_bytes(4, 100), vec![5, 6]);
        assert_eq!(b.to_bytes(10, 2), Vec::<u8>::new());
        assert_eq!(b.to_chars(0, 10), vec![0x0201, 0x0403, 0x0605]);
        assert_eq!(b.to_vec_of::<u32>(0, 4), vec![0x0403_0201]);
    }

    #[test]
    fn set_bytes_clamps() {
        let mut b = block(4);
        assert_eq!(b.set_bytes(2, &[9, 9, 9]), 2);
        assert_eq!(b.as_slice(), &[0, 0, 9, 9]);
        assert_eq!(b.set_bytes(8, &[1]), 0);
    }

    #[test]
    fn zero_ranges() {
        let mut b = MemoryBlock::from_bytes(&[1; 8]).unwrap();
        b.zero(2..4);
        assert_eq!(b.as_slice(), &[1, 1, 0, 0, 1, 1, 1, 1]);
        b.zero(6..20);
        assert_eq!(b.as_slice(), &[1, 1, 0, 0, 1, 1, 1, 1]);
        b.zero(..);
        assert!(b.as_slice().iter().all(|&x| x == 0));
    }

    #[test]
    fn views_share_the_trait_surface() {
        let mut b = block(8);
        {
            let mut view = b.view_mut();
            view.set_at::<u32>(1, 7);
            assert_eq!(view.len(), 8);
        }
        let view = b.view();
        assert_eq!(view.get_at::<u32>(1), 7);
        assert!(!view.is_empty());

        let raw = [0x41u8, 0, 0x42, 0, 0, 0];
        assert_eq!(TypedView::new(&raw).get_string(0), "AB");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn strings_without_nul_round_trip(s in "[^\\x00]{0,40}") {
                let units = s.encode_utf16().count();
                let mut b = block((units + 1) * 2);
                b.set_string(0, &s);
                prop_assert_eq!(b.get_string(0), s);
            }

            #[test]
            fn to_bytes_never_exceeds_view(
                data in proptest::collection::vec(any::<u8>(), 0..64),
                offset in 0usize..80,
                len in 0usize..80,
            ) {
                let view = TypedView::new(&data);
                let out = view.to_bytes(offset, len);
                prop_assert!(out.len() <= len);
                prop_assert!(offset + out.len() <= data.len().max(offset));
            }
        }
    }
}
