//! Block lifecycle and access FFI: alloc, resize, free, typed reads and
//! writes, UTF-16 strings, and in-place shifting.
//!
//! All blocks live in one global [`BlockTable`]. Every call takes the table
//! lock for its whole duration, so calls on different handles serialize;
//! none of them block on anything but the allocator.

use std::sync::Mutex;

use memblob_block::{pressure, BlockTable, MemoryBlock};
use memblob_core::{Handle, Primitive};

use crate::args::{copy_out, slice_in, slice_out, write_out};
use crate::status::MemblobStatus;
use crate::types::strategy_arg;

static BLOCKS: Mutex<BlockTable> = Mutex::new(BlockTable::new());

/// Allocate a zeroed block of `size` bytes with the given strategy.
///
/// `strategy` is a [`MemblobStrategy`](crate::MemblobStrategy) value. A
/// size of 0 yields a valid handle to an empty block.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_alloc(strategy: i32, size: usize, handle_out: *mut u64) -> i32 {
    ffi_guard!({
        if handle_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        let Some(strategy) = strategy_arg(strategy) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        let handle = ffi_try!(ffi_lock!(BLOCKS).alloc(strategy, size));
        // SAFETY: handle_out is non-null and valid per caller contract.
        unsafe { write_out(handle_out, handle.0) };
        MemblobStatus::Ok as i32
    })
}

/// Allocate an aligned block whose first byte is a multiple of
/// `alignment`, which must be even and non-zero.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_alloc_aligned(
    size: usize,
    alignment: usize,
    handle_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if handle_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        let handle = ffi_try!(ffi_lock!(BLOCKS).alloc_aligned(size, alignment));
        // SAFETY: handle_out is non-null and valid per caller contract.
        unsafe { write_out(handle_out, handle.0) };
        MemblobStatus::Ok as i32
    })
}

/// Allocate a process-heap block holding a copy of `len` bytes at `bytes`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_from_bytes(
    bytes: *const u8,
    len: usize,
    handle_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if handle_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        // SAFETY: bytes points to len readable bytes per caller contract.
        let Some(bytes) = (unsafe { slice_in(bytes, len) }) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        let block = ffi_try!(MemoryBlock::from_bytes(bytes));
        let handle = ffi_lock!(BLOCKS).insert(block);
        // SAFETY: handle_out is non-null and valid per caller contract.
        unsafe { write_out(handle_out, handle.0) };
        MemblobStatus::Ok as i32
    })
}

/// Release a block and retire its handle. Freeing the same handle twice
/// returns `MEMBLOB_STATUS_INVALID_HANDLE`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_free(handle: u64) -> i32 {
    ffi_guard!({
        ffi_try!(ffi_lock!(BLOCKS).free(Handle(handle)));
        MemblobStatus::Ok as i32
    })
}

/// Resize a block within its strategy, preserving the common prefix.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_resize(handle: u64, new_size: usize) -> i32 {
    ffi_guard!({
        ffi_try!(ffi_lock!(BLOCKS).resize(Handle(handle), new_size));
        MemblobStatus::Ok as i32
    })
}

/// Write a block's current size in bytes to `size_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_size(handle: u64, size_out: *mut usize) -> i32 {
    ffi_guard!({
        if size_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        let size = ffi_try!(ffi_lock!(BLOCKS).size(Handle(handle)));
        // SAFETY: size_out is non-null and valid per caller contract.
        unsafe { write_out(size_out, size) };
        MemblobStatus::Ok as i32
    })
}

/// Copy `len` bytes starting at `offset` into `buf`. The whole range must
/// lie inside the block.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_bytes(
    handle: u64,
    offset: usize,
    buf: *mut u8,
    len: usize,
) -> i32 {
    ffi_guard!({
        // SAFETY: buf points to len writable bytes per caller contract.
        let Some(out) = (unsafe { slice_out(buf, len) }) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        ffi_try!(ffi_lock!(BLOCKS).read_bytes(Handle(handle), offset, out));
        MemblobStatus::Ok as i32
    })
}

/// Copy `len` bytes from `buf` into the block at `offset`. The whole range
/// must lie inside the block.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_bytes(
    handle: u64,
    offset: usize,
    buf: *const u8,
    len: usize,
) -> i32 {
    ffi_guard!({
        // SAFETY: buf points to len readable bytes per caller contract.
        let Some(bytes) = (unsafe { slice_in(buf, len) }) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        ffi_try!(ffi_lock!(BLOCKS).write_bytes(Handle(handle), offset, bytes));
        MemblobStatus::Ok as i32
    })
}

/// Read the NUL-terminated UTF-16 string at `offset`.
///
/// The string's length in units (terminator excluded) is always written
/// to `len_out`. If `capacity` is smaller, nothing is copied and
/// `MEMBLOB_STATUS_BUFFER_TOO_SMALL` is returned; call again with a
/// larger buffer. No terminator is written to `buf`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_string(
    handle: u64,
    offset: usize,
    buf: *mut u16,
    capacity: usize,
    len_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if len_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        let units = ffi_try!(ffi_lock!(BLOCKS).read_string(Handle(handle), offset));
        copy_out(&units, buf, capacity, len_out)
    })
}

/// Write `len` UTF-16 units from `units` plus a terminating NUL at
/// `offset`. The units and terminator must fit inside the block.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_string(
    handle: u64,
    offset: usize,
    units: *const u16,
    len: usize,
) -> i32 {
    ffi_guard!({
        // SAFETY: units points to len readable u16s per caller contract.
        let Some(units) = (unsafe { slice_in(units, len) }) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        ffi_try!(ffi_lock!(BLOCKS).write_string(Handle(handle), offset, units));
        MemblobStatus::Ok as i32
    })
}

/// Open a zeroed gap of `delta` bytes at `offset`, growing the block.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_push_out(handle: u64, offset: usize, delta: usize) -> i32 {
    ffi_guard!({
        ffi_try!(ffi_lock!(BLOCKS).push_out(Handle(handle), offset, delta));
        MemblobStatus::Ok as i32
    })
}

/// Close `delta` bytes at `offset`, shrinking the block.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_pull_in(handle: u64, offset: usize, delta: usize) -> i32 {
    ffi_guard!({
        ffi_try!(ffi_lock!(BLOCKS).pull_in(Handle(handle), offset, delta));
        MemblobStatus::Ok as i32
    })
}

/// Write the bytes currently reported to the global pressure counter.
/// Always 0 when the library was built without pressure tracking.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_pressure_bytes(bytes_out: *mut usize) -> i32 {
    ffi_guard!({
        // SAFETY: bytes_out is valid per caller contract when non-null.
        if unsafe { write_out(bytes_out, pressure::tracked_bytes()) } {
            MemblobStatus::Ok as i32
        } else {
            MemblobStatus::InvalidArgument as i32
        }
    })
}

// ── Typed access ────────────────────────────────────────────────

#[allow(unsafe_code)]
fn read_value<T: Primitive>(handle: u64, offset: usize, value_out: *mut T) -> i32 {
    if value_out.is_null() {
        return MemblobStatus::InvalidArgument as i32;
    }
    let value = ffi_try!(ffi_lock!(BLOCKS).read::<T>(Handle(handle), offset));
    // SAFETY: value_out is non-null and valid per caller contract.
    unsafe { write_out(value_out, value) };
    MemblobStatus::Ok as i32
}

fn write_value<T: Primitive>(handle: u64, offset: usize, value: T) -> i32 {
    ffi_try!(ffi_lock!(BLOCKS).write::<T>(Handle(handle), offset, value));
    MemblobStatus::Ok as i32
}

/// Read a little-endian `u8` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_u8(handle: u64, offset: usize, value_out: *mut u8) -> i32 {
    ffi_guard!({ read_value(handle, offset, value_out) })
}

/// Write a `u8` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_u8(handle: u64, offset: usize, value: u8) -> i32 {
    ffi_guard!({ write_value(handle, offset, value) })
}

/// Read a little-endian `u16` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_u16(handle: u64, offset: usize, value_out: *mut u16) -> i32 {
    ffi_guard!({ read_value(handle, offset, value_out) })
}

/// Write a little-endian `u16` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_u16(handle: u64, offset: usize, value: u16) -> i32 {
    ffi_guard!({ write_value(handle, offset, value) })
}

/// Read a little-endian `u32` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_u32(handle: u64, offset: usize, value_out: *mut u32) -> i32 {
    ffi_guard!({ read_value(handle, offset, value_out) })
}

/// Write a little-endian `u32` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_u32(handle: u64, offset: usize, value: u32) -> i32 {
    ffi_guard!({ write_value(handle, offset, value) })
}

/// Read a little-endian `u64` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_u64(handle: u64, offset: usize, value_out: *mut u64) -> i32 {
    ffi_guard!({ read_value(handle, offset, value_out) })
}

/// Write a little-endian `u64` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_u64(handle: u64, offset: usize, value: u64) -> i32 {
    ffi_guard!({ write_value(handle, offset, value) })
}

/// Read a little-endian `i32` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_i32(handle: u64, offset: usize, value_out: *mut i32) -> i32 {
    ffi_guard!({ read_value(handle, offset, value_out) })
}

/// Write a little-endian `i32` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_i32(handle: u64, offset: usize, value: i32) -> i32 {
    ffi_guard!({ write_value(handle, offset, value) })
}

/// Read a little-endian `i64` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_i64(handle: u64, offset: usize, value_out: *mut i64) -> i32 {
    ffi_guard!({ read_value(handle, offset, value_out) })
}

/// Write a little-endian `i64` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_i64(handle: u64, offset: usize, value: i64) -> i32 {
    ffi_guard!({ write_value(handle, offset, value) })
}

/// Read a little-endian `f32` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_f32(handle: u64, offset: usize, value_out: *mut f32) -> i32 {
    ffi_guard!({ read_value(handle, offset, value_out) })
}

/// Write a little-endian `f32` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_f32(handle: u64, offset: usize, value: f32) -> i32 {
    ffi_guard!({ write_value(handle, offset, value) })
}

/// Read a little-endian `f64` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_read_f64(handle: u64, offset: usize, value_out: *mut f64) -> i32 {
    ffi_guard!({ read_value(handle, offset, value_out) })
}

/// Write a little-endian `f64` at `offset`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_block_write_f64(handle: u64, offset: usize, value: f64) -> i32 {
    ffi_guard!({ write_value(handle, offset, value) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemblobStrategy;
    use memblob_test_utils::{lettered, units};

    fn alloc(strategy: MemblobStrategy, size: usize) -> u64 {
        let mut h: u64 = 0;
        assert_eq!(
            memblob_block_alloc(strategy as i32, size, &mut h),
            MemblobStatus::Ok as i32
        );
        h
    }

    fn size_of_block(h: u64) -> usize {
        let mut size = 0usize;
        assert_eq!(memblob_block_size(h, &mut size), MemblobStatus::Ok as i32);
        size
    }

    #[test]
    fn alloc_write_read_free() {
        let h = alloc(MemblobStrategy::ProcessHeap, 32);
        assert_eq!(size_of_block(h), 32);

        assert_eq!(memblob_block_write_u32(h, 4, 0xDEAD_BEEF), 0);
        let mut v: u32 = 0;
        assert_eq!(memblob_block_read_u32(h, 4, &mut v), 0);
        assert_eq!(v, 0xDEAD_BEEF);

        let mut lo: u16 = 0;
        assert_eq!(memblob_block_read_u16(h, 4, &mut lo), 0);
        assert_eq!(lo, 0xBEEF);

        assert_eq!(memblob_block_write_f64(h, 8, -2.5), 0);
        let mut f: f64 = 0.0;
        assert_eq!(memblob_block_read_f64(h, 8, &mut f), 0);
        assert_eq!(f, -2.5);

        assert_eq!(memblob_block_write_i64(h, 16, -7), 0);
        let mut i: i64 = 0;
        assert_eq!(memblob_block_read_i64(h, 16, &mut i), 0);
        assert_eq!(i, -7);

        assert_eq!(memblob_block_free(h), MemblobStatus::Ok as i32);
    }

    #[test]
    fn every_strategy_allocates() {
        for strategy in [
            MemblobStrategy::ProcessHeap,
            MemblobStrategy::Aligned,
            MemblobStrategy::Virtual,
            MemblobStrategy::Network,
            MemblobStrategy::ComTask,
        ] {
            let h = alloc(strategy, 100);
            assert!(size_of_block(h) >= 100);
            assert_eq!(memblob_block_free(h), 0);
        }
    }

    #[test]
    fn invalid_strategy_rejected() {
        let mut h: u64 = 0;
        assert_eq!(
            memblob_block_alloc(9, 8, &mut h),
            MemblobStatus::InvalidArgument as i32
        );
    }

    #[test]
    fn null_out_pointers_rejected() {
        assert_eq!(
            memblob_block_alloc(0, 8, std::ptr::null_mut()),
            MemblobStatus::InvalidArgument as i32
        );
        let h = alloc(MemblobStrategy::ProcessHeap, 8);
        assert_eq!(
            memblob_block_size(h, std::ptr::null_mut()),
            MemblobStatus::InvalidArgument as i32
        );
        assert_eq!(
            memblob_block_read_u8(h, 0, std::ptr::null_mut()),
            MemblobStatus::InvalidArgument as i32
        );
        assert_eq!(
            memblob_block_write_bytes(h, 0, std::ptr::null(), 4),
            MemblobStatus::InvalidArgument as i32
        );
        memblob_block_free(h);
    }

    #[test]
    fn double_free_is_invalid_handle() {
        let h = alloc(MemblobStrategy::ComTask, 8);
        assert_eq!(memblob_block_free(h), MemblobStatus::Ok as i32);
        assert_eq!(memblob_block_free(h), MemblobStatus::InvalidHandle as i32);
        let mut v = 0u8;
        assert_eq!(
            memblob_block_read_u8(h, 0, &mut v),
            MemblobStatus::InvalidHandle as i32
        );
    }

    #[test]
    fn out_of_range_access_is_reported() {
        let h = alloc(MemblobStrategy::Network, 8);
        let mut v: u64 = 0;
        assert_eq!(
            memblob_block_read_u64(h, 1, &mut v),
            MemblobStatus::OutOfBounds as i32
        );
        assert_eq!(
            memblob_block_write_u8(h, 8, 1),
            MemblobStatus::OutOfBounds as i32
        );
        assert_eq!(
            memblob_block_push_out(h, 9, 1),
            MemblobStatus::OutOfBounds as i32
        );
        memblob_block_free(h);
    }

    #[test]
    fn aligned_alloc_checks_alignment() {
        let mut h: u64 = 0;
        assert_eq!(memblob_block_alloc_aligned(64, 64, &mut h), 0);
        assert_eq!(size_of_block(h), 64);
        memblob_block_free(h);
        assert_eq!(
            memblob_block_alloc_aligned(64, 3, &mut h),
            MemblobStatus::InvalidArgument as i32
        );
    }

    #[test]
    fn shift_round_trip() {
        let data = lettered(10);
        let mut h: u64 = 0;
        assert_eq!(memblob_block_from_bytes(data.as_ptr(), data.len(), &mut h), 0);

        assert_eq!(memblob_block_push_out(h, 4, 6), 0);
        assert_eq!(size_of_block(h), 16);
        let mut out = [0xFFu8; 16];
        assert_eq!(memblob_block_read_bytes(h, 0, out.as_mut_ptr(), 16), 0);
        assert_eq!(&out, b"ABCD\0\0\0\0\0\0EFGHIJ");

        assert_eq!(memblob_block_pull_in(h, 4, 6), 0);
        let mut out = [0u8; 10];
        assert_eq!(memblob_block_read_bytes(h, 0, out.as_mut_ptr(), 10), 0);
        assert_eq!(out.as_slice(), data.as_slice());
        memblob_block_free(h);
    }

    #[test]
    fn string_round_trip_with_buffer_probe() {
        let h = alloc(MemblobStrategy::ProcessHeap, 64);
        let text = units("héllo");
        assert_eq!(
            memblob_block_write_string(h, 6, text.as_ptr(), text.len()),
            0
        );

        let mut len = 0usize;
        assert_eq!(
            memblob_block_read_string(h, 6, std::ptr::null_mut(), 0, &mut len),
            MemblobStatus::BufferTooSmall as i32
        );
        assert_eq!(len, text.len());

        let mut buf = vec![0u16; len];
        assert_eq!(
            memblob_block_read_string(h, 6, buf.as_mut_ptr(), buf.len(), &mut len),
            0
        );
        assert_eq!(buf, text);
        memblob_block_free(h);
    }

    #[test]
    fn resize_preserves_prefix() {
        let data = lettered(6);
        let mut h: u64 = 0;
        assert_eq!(memblob_block_from_bytes(data.as_ptr(), data.len(), &mut h), 0);
        assert_eq!(memblob_block_resize(h, 3), 0);
        assert_eq!(size_of_block(h), 3);
        assert_eq!(memblob_block_resize(h, 5), 0);
        let mut out = [0xFFu8; 5];
        assert_eq!(memblob_block_read_bytes(h, 0, out.as_mut_ptr(), 5), 0);
        assert_eq!(&out, b"ABC\0\0");
        memblob_block_free(h);
    }

    #[test]
    fn pressure_query_needs_out_pointer() {
        let mut bytes = 0usize;
        assert_eq!(memblob_pressure_bytes(&mut bytes), 0);
        assert_eq!(
            memblob_pressure_bytes(std::ptr::null_mut()),
            MemblobStatus::InvalidArgument as i32
        );
    }
}
