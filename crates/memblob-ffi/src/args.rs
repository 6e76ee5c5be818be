//! Pointer arguments from C callers.

use crate::status::MemblobStatus;

/// Borrow `len` elements at `ptr`. A zero length needs no pointer.
///
/// # Safety
///
/// When `len > 0` and `ptr` is non-null, `ptr` must be valid for reads of
/// `len` elements for the returned lifetime.
#[allow(unsafe_code)]
pub(crate) unsafe fn slice_in<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and valid for `len` reads per the function contract.
    Some(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// Mutably borrow `len` elements at `ptr`. A zero length needs no pointer.
///
/// # Safety
///
/// When `len > 0` and `ptr` is non-null, `ptr` must be valid for writes of
/// `len` elements and not aliased for the returned lifetime.
#[allow(unsafe_code)]
pub(crate) unsafe fn slice_out<'a, T>(ptr: *mut T, len: usize) -> Option<&'a mut [T]> {
    if len == 0 {
        return Some(Default::default());
    }
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and valid for `len` writes per the function contract.
    Some(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
}

/// Store `value` through an out-pointer. Returns `false` on null.
///
/// # Safety
///
/// A non-null `out` must be valid for a write of one `T`.
#[allow(unsafe_code)]
pub(crate) unsafe fn write_out<T>(out: *mut T, value: T) -> bool {
    if out.is_null() {
        return false;
    }
    // SAFETY: non-null and writable per the function contract.
    unsafe { out.write(value) };
    true
}

/// Report `src.len()` through `len_out`, then copy `src` into `buf` if
/// `capacity` allows. Lets callers probe with a zero capacity first.
#[allow(unsafe_code)]
pub(crate) fn copy_out<T: Copy>(
    src: &[T],
    buf: *mut T,
    capacity: usize,
    len_out: *mut usize,
) -> i32 {
    // SAFETY: len_out is valid per caller contract when non-null.
    if !unsafe { write_out(len_out, src.len()) } {
        return MemblobStatus::InvalidArgument as i32;
    }
    if capacity < src.len() {
        return MemblobStatus::BufferTooSmall as i32;
    }
    // SAFETY: buf points to capacity writable elements per caller contract.
    let Some(out) = (unsafe { slice_out(buf, src.len()) }) else {
        return MemblobStatus::InvalidArgument as i32;
    };
    out.copy_from_slice(src);
    MemblobStatus::Ok as i32
}
