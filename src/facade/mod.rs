//! Public façade: three interchangeable `GlobalAlloc` variants built from
//! the same [`crate::engine`], so the designs can be benchmarked against
//! each other, plus a passthrough baseline for A/B comparison against the
//! host allocator.

pub mod arena;
pub mod cached;
pub mod naive;
pub mod passthrough;

use crate::engine::header;
use std::ptr::{self, NonNull};

/// Size (payload bytes only, header excluded) of the block backing `ptr`.
///
/// # Safety
/// `ptr` must have been returned by this crate's `alloc`.
pub(crate) unsafe fn usable_size(ptr: NonNull<u8>) -> usize {
    unsafe {
        let header = header::payload_to_header(ptr.as_ptr());
        header::extract_size(header::read_word(header)) - crate::config::WORD
    }
}

/// Shared `calloc`: checked `count * size`, delegate to `alloc`, zero-fill.
pub(crate) fn checked_calloc(
    count: usize,
    size: usize,
    alloc: impl FnOnce(usize) -> Option<NonNull<u8>>,
) -> Option<NonNull<u8>> {
    let total = count.checked_mul(size)?;
    let ptr = alloc(total)?;
    unsafe { ptr::write_bytes(ptr.as_ptr(), 0, total) };
    Some(ptr)
}

/// Shared `realloc`: grow in place if the existing block already has room,
/// otherwise allocate fresh, copy, and free the old block.
pub(crate) fn checked_realloc(
    ptr: NonNull<u8>,
    new_size: usize,
    alloc: impl FnOnce(usize) -> Option<NonNull<u8>>,
    free: impl FnOnce(NonNull<u8>),
) -> Option<NonNull<u8>> {
    let usable_old = unsafe { usable_size(ptr) };
    if new_size <= usable_old {
        return Some(ptr);
    }
    let new_ptr = alloc(new_size)?;
    unsafe {
        ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), usable_old.min(new_size));
    }
    free(ptr);
    Some(new_ptr)
}
