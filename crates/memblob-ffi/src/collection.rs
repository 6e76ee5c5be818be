//! Packed string collection FFI.
//!
//! Entries cross the boundary as UTF-16 units with explicit lengths, never
//! as terminated strings, so length-prefixed collections can carry empty
//! entries and embedded NULs. Reads use the probe pattern: pass a zero
//! capacity to learn the length, then call again with a buffer.

use std::sync::Mutex;

use memblob_core::{CollectionError, Handle, HandleTable};
use memblob_strings::{CollectionConfig, PackedStringCollection};

use crate::args::{copy_out, slice_in, write_out};
use crate::status::MemblobStatus;
use crate::types::{framing_arg, strategy_arg};

static COLLECTIONS: Mutex<HandleTable<PackedStringCollection>> =
    Mutex::new(HandleTable::new());

/// Run `f` on a live collection, mapping its error to a status code.
fn with_collection<F>(handle: u64, f: F) -> i32
where
    F: FnOnce(&mut PackedStringCollection) -> Result<(), CollectionError>,
{
    let mut table = ffi_lock!(COLLECTIONS);
    let Some(collection) = table.get_mut(Handle(handle)) else {
        return MemblobStatus::InvalidHandle as i32;
    };
    ffi_try!(f(collection));
    MemblobStatus::Ok as i32
}

/// Create an empty collection.
///
/// `framing` is a [`MemblobFraming`](crate::MemblobFraming) value,
/// `width_bytes` the descriptor width for length-prefixed framing (1, 2,
/// 4 or 8; ignored otherwise), and `strategy` a
/// [`MemblobStrategy`](crate::MemblobStrategy) for the backing block.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_create(
    framing: i32,
    width_bytes: u32,
    strategy: i32,
    handle_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if handle_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        let (Some(framing), Some(strategy)) =
            (framing_arg(framing, width_bytes), strategy_arg(strategy))
        else {
            return MemblobStatus::InvalidArgument as i32;
        };
        let config = CollectionConfig {
            framing,
            strategy,
            ..CollectionConfig::default()
        };
        let handle = ffi_lock!(COLLECTIONS).insert(PackedStringCollection::with_config(config));
        // SAFETY: handle_out is non-null and valid per caller contract.
        unsafe { write_out(handle_out, handle.0) };
        MemblobStatus::Ok as i32
    })
}

/// Adopt a copy of a framed buffer produced elsewhere. The buffer is
/// walked strictly; a malformed buffer returns `MEMBLOB_STATUS_MALFORMED`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_from_bytes(
    bytes: *const u8,
    len: usize,
    framing: i32,
    width_bytes: u32,
    handle_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if handle_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        let Some(framing) = framing_arg(framing, width_bytes) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        // SAFETY: bytes points to len readable bytes per caller contract.
        let Some(bytes) = (unsafe { slice_in(bytes, len) }) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        let collection = ffi_try!(PackedStringCollection::from_bytes(bytes, framing));
        let handle = ffi_lock!(COLLECTIONS).insert(collection);
        // SAFETY: handle_out is non-null and valid per caller contract.
        unsafe { write_out(handle_out, handle.0) };
        MemblobStatus::Ok as i32
    })
}

/// Destroy a collection and release its block.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_destroy(handle: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(COLLECTIONS).remove(Handle(handle)) {
            Some(_) => MemblobStatus::Ok as i32,
            None => MemblobStatus::InvalidHandle as i32,
        }
    })
}

/// Write the number of entries to `count_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_count(handle: u64, count_out: *mut usize) -> i32 {
    ffi_guard!({
        if count_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        let table = ffi_lock!(COLLECTIONS);
        let Some(collection) = table.get(Handle(handle)) else {
            return MemblobStatus::InvalidHandle as i32;
        };
        // SAFETY: count_out is non-null and valid per caller contract.
        unsafe { write_out(count_out, collection.count()) };
        MemblobStatus::Ok as i32
    })
}

/// Append an entry of `len` UTF-16 units.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_add(handle: u64, units: *const u16, len: usize) -> i32 {
    ffi_guard!({
        // SAFETY: units points to len readable u16s per caller contract.
        let Some(units) = (unsafe { slice_in(units, len) }) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        with_collection(handle, |c| c.add_units(units))
    })
}

/// Insert an entry before `index`. An index at or past the end appends.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_insert(
    handle: u64,
    index: usize,
    units: *const u16,
    len: usize,
) -> i32 {
    ffi_guard!({
        // SAFETY: units points to len readable u16s per caller contract.
        let Some(units) = (unsafe { slice_in(units, len) }) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        with_collection(handle, |c| c.insert_units(index, units))
    })
}

/// Replace the entry at `index`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_replace(
    handle: u64,
    index: usize,
    units: *const u16,
    len: usize,
) -> i32 {
    ffi_guard!({
        // SAFETY: units points to len readable u16s per caller contract.
        let Some(units) = (unsafe { slice_in(units, len) }) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        with_collection(handle, |c| c.replace_units(index, units))
    })
}

/// Remove the entry at `index`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_remove(handle: u64, index: usize) -> i32 {
    ffi_guard!({ with_collection(handle, |c| c.remove_at(index)) })
}

/// Keep entries `0..=last_index` and drop the rest.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_truncate(handle: u64, last_index: usize) -> i32 {
    ffi_guard!({ with_collection(handle, |c| c.truncate(last_index)) })
}

/// Remove every entry.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_clear(handle: u64) -> i32 {
    ffi_guard!({
        with_collection(handle, |c| {
            c.clear();
            Ok(())
        })
    })
}

/// Re-encode every entry under a new framing. On error the collection is
/// unchanged.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_reframe(handle: u64, framing: i32, width_bytes: u32) -> i32 {
    ffi_guard!({
        let Some(framing) = framing_arg(framing, width_bytes) else {
            return MemblobStatus::InvalidArgument as i32;
        };
        with_collection(handle, |c| c.reframe(framing))
    })
}

/// Copy the UTF-16 units of entry `index` into `buf`.
///
/// The entry length is always written to `len_out`; a `capacity` below it
/// returns `MEMBLOB_STATUS_BUFFER_TOO_SMALL` without copying.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_get(
    handle: u64,
    index: usize,
    buf: *mut u16,
    capacity: usize,
    len_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if len_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        let units = {
            let table = ffi_lock!(COLLECTIONS);
            let Some(collection) = table.get(Handle(handle)) else {
                return MemblobStatus::InvalidHandle as i32;
            };
            ffi_try!(collection.get_units(index))
        };
        copy_out(&units, buf, capacity, len_out)
    })
}

/// Copy the collection's framed bytes into `buf`, probe-style like
/// [`memblob_collection_get`].
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn memblob_collection_to_bytes(
    handle: u64,
    buf: *mut u8,
    capacity: usize,
    len_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if len_out.is_null() {
            return MemblobStatus::InvalidArgument as i32;
        }
        let table = ffi_lock!(COLLECTIONS);
        let Some(collection) = table.get(Handle(handle)) else {
            return MemblobStatus::InvalidHandle as i32;
        };
        copy_out(&collection.to_bytes(), buf, capacity, len_out)
    })
}
