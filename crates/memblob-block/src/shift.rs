//! In-place byte shifting: opening and closing ranges inside a live block.
//!
//! Copies walk in the direction that keeps overlapping source bytes intact
//! (high-to-low when moving forward, low-to-high when moving back), eight
//! bytes at a time with a bytewise tail.

use memblob_core::BlockError;

use crate::block::MemoryBlock;

const WORD: usize = 8;

/// Copy `len` bytes from `src` to a higher `dst`, highest word first.
fn copy_toward_end(buf: &mut [u8], src: usize, dst: usize, len: usize) {
    debug_assert!(dst >= src);
    let mut remaining = len;
    while remaining >= WORD {
        remaining -= WORD;
        let mut word = [0u8; WORD];
        word.copy_from_slice(&buf[src + remaining..src + remaining + WORD]);
        buf[dst + remaining..dst + remaining + WORD].copy_from_slice(&word);
    }
    while remaining > 0 {
        remaining -= 1;
        buf[dst + remaining] = buf[src + remaining];
    }
}

/// Copy `len` bytes from `src` to a lower `dst`, lowest word first.
fn copy_toward_start(buf: &mut [u8], src: usize, dst: usize, len: usize) {
    debug_assert!(dst <= src);
    let mut done = 0;
    while len - done >= WORD {
        let mut word = [0u8; WORD];
        word.copy_from_slice(&buf[src + done..src + done + WORD]);
        buf[dst + done..dst + done + WORD].copy_from_slice(&word);
        done += WORD;
    }
    while done < len {
        buf[dst + done] = buf[src + done];
        done += 1;
    }
}

fn out_of_bounds(offset: usize, len: usize, size: usize) -> BlockError {
    BlockError::OutOfBounds { offset, len, size }
}

impl MemoryBlock {
    /// Open a zeroed gap of `delta` bytes at `offset`.
    ///
    /// Grows the block by `delta` and moves everything at or after `offset`
    /// forward. On an empty block with `offset == 0` this is
    /// [`alloc(delta)`](Self::alloc). A failed resize leaves the block
    /// unchanged.
    pub fn push_out(&mut self, offset: usize, delta: usize) -> Result<(), BlockError> {
        self.push_out_within(offset, self.size(), delta)
    }

    /// [`push_out`](Self::push_out) for a block whose data ends at `used`.
    ///
    /// Only `[offset, used)` moves. Bytes in `[used, size)` are slack: when
    /// they can absorb `delta` the size is unchanged, otherwise the block
    /// grows to `used + delta`. Slack must be zeroed.
    pub fn push_out_within(
        &mut self,
        offset: usize,
        used: usize,
        delta: usize,
    ) -> Result<(), BlockError> {
        let size = self.size();
        if offset > used || used > size {
            return Err(out_of_bounds(offset, delta, size));
        }
        if delta == 0 {
            return Ok(());
        }
        if self.is_empty() {
            return self.alloc(delta);
        }
        let needed = used
            .checked_add(delta)
            .ok_or_else(|| BlockError::invalid_argument("push_out size overflows usize"))?;
        if needed > size {
            self.resize(needed)?;
        }
        let buf = self.as_mut_slice();
        copy_toward_end(buf, offset, offset + delta, used - offset);
        buf[offset..offset + delta].fill(0);
        Ok(())
    }

    /// Close the `delta` bytes at `offset`, moving the remainder back and
    /// shrinking the block by `delta`.
    pub fn pull_in(&mut self, offset: usize, delta: usize) -> Result<(), BlockError> {
        self.pull_in_within(offset, self.size(), delta)
    }

    /// [`pull_in`](Self::pull_in) for a block whose data ends at `used`.
    ///
    /// Only `[offset + delta, used)` moves, the vacated `delta` bytes before
    /// `used` are zeroed and the block is resized to `used - delta`, which
    /// lets page-granular blocks give whole pages back.
    pub fn pull_in_within(
        &mut self,
        offset: usize,
        used: usize,
        delta: usize,
    ) -> Result<(), BlockError> {
        let size = self.size();
        if used > size || offset.checked_add(delta).is_none_or(|end| end > used) {
            return Err(out_of_bounds(offset, delta, size));
        }
        if delta == 0 {
            return Ok(());
        }
        let buf = self.as_mut_slice();
        copy_toward_start(buf, offset + delta, offset, used - offset - delta);
        // Page-granular blocks may keep their size; never leave stale bytes.
        buf[used - delta..used].fill(0);
        self.resize(used - delta)
    }

    /// Open a gap at `offset` and copy `bytes` into it.
    pub fn insert_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), BlockError> {
        self.push_out(offset, bytes.len())?;
        self.as_mut_slice()[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Remove `len` bytes at `offset`.
    pub fn delete_bytes(&mut self, offset: usize, len: usize) -> Result<(), BlockError> {
        self.pull_in(offset, len)
    }

    /// Move `len` bytes at `offset` by `shift` positions (negative moves
    /// toward the start). The bytes displaced by the move rotate into the
    /// vacated side, so nothing is lost and the size is unchanged.
    pub fn slide(&mut self, offset: usize, len: usize, shift: isize) -> Result<(), BlockError> {
        let size = self.size();
        let distance = shift.unsigned_abs();
        let (start, end) = if shift >= 0 {
            (Some(offset), offset.checked_add(len).and_then(|e| e.checked_add(distance)))
        } else {
            (offset.checked_sub(distance), offset.checked_add(len))
        };
        let (Some(start), Some(end)) = (start, end) else {
            return Err(out_of_bounds(offset, len, size));
        };
        if end > size {
            return Err(out_of_bounds(offset, len, size));
        }
        let window = &mut self.as_mut_slice()[start..end];
        if shift >= 0 {
            window.rotate_right(distance);
        } else {
            window.rotate_left(distance);
        }
        Ok(())
    }

    /// Reverse every byte of the block in place.
    pub fn reverse(&mut self) {
        self.as_mut_slice().reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memblob_core::AllocStrategy;

    fn lettered(n: u8) -> MemoryBlock {
        let bytes: Vec<u8> = (0..n).map(|i| b'A' + i).collect();
        MemoryBlock::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn push_out_opens_zeroed_gap() {
        let mut block = lettered(10);
        block.push_out(4, 6).unwrap();
        assert_eq!(block.size(), 16);
        assert_eq!(&block.as_slice()[..4], b"ABCD");
        assert_eq!(&block.as_slice()[4..10], &[0; 6]);
        assert_eq!(&block.as_slice()[10..], b"EFGHIJ");
    }

    #[test]
    fn push_out_at_end_appends() {
        let mut block = lettered(3);
        block.push_out(3, 2).unwrap();
        assert_eq!(block.as_slice(), b"ABC\0\0");
    }

    #[test]
    fn push_out_on_empty_allocates() {
        let mut block = MemoryBlock::new();
        block.push_out(0, 12).unwrap();
        assert_eq!(block.size(), 12);
        assert_eq!(block.strategy(), Some(AllocStrategy::ProcessHeap));
    }

    #[test]
    fn push_out_past_end_is_rejected() {
        let mut block = lettered(4);
        assert_eq!(
            block.push_out(5, 1),
            Err(BlockError::OutOfBounds {
                offset: 5,
                len: 1,
                size: 4
            })
        );
        assert_eq!(block.as_slice(), b"ABCD");
    }

    #[test]
    fn pull_in_closes_range() {
        let mut block = lettered(10);
        block.pull_in(2, 3).unwrap();
        assert_eq!(block.as_slice(), b"ABFGHIJ");
    }

    #[test]
    fn pull_in_everything_frees() {
        let mut block = lettered(5);
        block.pull_in(0, 5).unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn pull_in_past_end_is_rejected() {
        let mut block = lettered(5);
        assert!(block.pull_in(3, 3).is_err());
        assert!(block.pull_in(usize::MAX, 2).is_err());
        assert_eq!(block.as_slice(), b"ABCDE");
    }

    #[test]
    fn pull_in_on_virtual_block_clears_tail() {
        let mut block = MemoryBlock::allocate(AllocStrategy::Virtual, 64).unwrap();
        let size = block.size();
        block.as_mut_slice().fill(0xAA);
        block.pull_in(0, 16).unwrap();
        assert_eq!(block.size(), size);
        assert!(block.as_slice()[size - 16..].iter().all(|&b| b == 0));
        assert!(block.as_slice()[..size - 16].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn push_out_within_uses_slack() {
        let mut block = MemoryBlock::allocate(AllocStrategy::Virtual, 10).unwrap();
        let size = block.size();
        block.as_mut_slice()[..10].copy_from_slice(b"ABCDEFGHIJ");
        block.push_out_within(4, 10, 6).unwrap();
        assert_eq!(block.size(), size);
        assert_eq!(&block.as_slice()[..16], b"ABCD\0\0\0\0\0\0EFGHIJ");
        assert!(block.as_slice()[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn push_out_within_grows_from_used_end() {
        let mut block = MemoryBlock::allocate(AllocStrategy::Virtual, 10).unwrap();
        let page = block.size();
        let used = page - 2;
        block.as_mut_slice()[used - 1] = 0x7F;
        block.push_out_within(used - 1, used, 8).unwrap();
        assert_eq!(block.size(), 2 * page);
        assert_eq!(block.as_slice()[used + 7], 0x7F);
        assert!(block.as_slice()[used - 1..used + 7].iter().all(|&b| b == 0));
    }

    #[test]
    fn pull_in_within_returns_pages() {
        let mut block = MemoryBlock::allocate(AllocStrategy::Virtual, 4100).unwrap();
        let size = block.size();
        assert!(size > 4096);
        block.as_mut_slice()[..8].copy_from_slice(b"ABCDEFGH");
        block.pull_in_within(2, 4100, 10).unwrap();
        assert_eq!(block.size(), 4096);
        assert_eq!(&block.as_slice()[..6], &[b'A', b'B', 0, 0, 0, 0]);
    }

    #[test]
    fn within_variants_check_used() {
        let mut block = lettered(8);
        assert!(block.push_out_within(0, 9, 1).is_err());
        assert!(block.push_out_within(5, 4, 1).is_err());
        assert!(block.pull_in_within(2, 4, 3).is_err());
        assert_eq!(block.as_slice(), b"ABCDEFGH");
        block.pull_in_within(1, 4, 2).unwrap();
        assert_eq!(block.as_slice(), b"AD");
    }

    #[test]
    fn insert_and_delete_bytes() {
        let mut block = lettered(4);
        block.insert_bytes(2, b"xyz").unwrap();
        assert_eq!(block.as_slice(), b"ABxyzCD");
        block.delete_bytes(2, 3).unwrap();
        assert_eq!(block.as_slice(), b"ABCD");
    }

    #[test]
    fn slide_right_rotates_displaced_bytes_left() {
        let mut block = lettered(8);
        block.slide(1, 3, 2).unwrap();
        assert_eq!(block.as_slice(), b"AEFBCDGH");
    }

    #[test]
    fn slide_left_rotates_displaced_bytes_right() {
        let mut block = lettered(8);
        block.slide(4, 2, -3).unwrap();
        assert_eq!(block.as_slice(), b"AEFBCDGH");
    }

    #[test]
    fn slide_out_of_range_is_rejected() {
        let mut block = lettered(8);
        assert!(block.slide(6, 2, 1).is_err());
        assert!(block.slide(1, 2, -2).is_err());
        assert_eq!(block.as_slice(), b"ABCDEFGH");
    }

    #[test]
    fn reverse_in_place() {
        let mut block = lettered(5);
        block.reverse();
        assert_eq!(block.as_slice(), b"EDCBA");
    }

    #[test]
    fn directional_copies_handle_overlap() {
        let mut buf: Vec<u8> = (0..40).collect();
        let mut expected = buf.clone();
        expected.copy_within(3..30, 8);
        copy_toward_end(&mut buf, 3, 8, 27);
        assert_eq!(buf, expected);

        let mut buf: Vec<u8> = (0..40).collect();
        let mut expected = buf.clone();
        expected.copy_within(9..40, 2);
        copy_toward_start(&mut buf, 9, 2, 31);
        assert_eq!(buf, expected);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn insert_matches_vec_splice(
                data in proptest::collection::vec(any::<u8>(), 1..200),
                extra in proptest::collection::vec(any::<u8>(), 0..50),
                at in any::<prop::sample::Index>(),
            ) {
                let offset = at.index(data.len() + 1);
                let mut block = MemoryBlock::from_bytes(&data).unwrap();
                block.insert_bytes(offset, &extra).unwrap();
                let mut model = data.clone();
                model.splice(offset..offset, extra.iter().copied());
                prop_assert_eq!(block.to_vec(), model);
            }

            #[test]
            fn push_out_then_pull_in_restores(
                data in proptest::collection::vec(any::<u8>(), 1..200),
                at in any::<prop::sample::Index>(),
                delta in 1usize..64,
            ) {
                let offset = at.index(data.len() + 1);
                let mut block = MemoryBlock::from_bytes(&data).unwrap();
                block.push_out(offset, delta).unwrap();
                block.pull_in(offset, delta).unwrap();
                prop_assert_eq!(block.to_vec(), data);
            }
        }
    }
}
