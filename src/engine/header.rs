//! Block metadata codec and the narrow pointer-arithmetic operations that
//! walk a heap's boundary tags.
//!
//! This module is the "essential unsafe core" the design calls for: every
//! other component operates on the handles this module hands out
//! (`*mut u8` block pointers) through these functions only, never by
//! reinterpreting heap bytes itself.

use crate::config::{ALIGN, WORD};
use std::ptr::NonNull;

const ALLOC_BIT: u64 = 0b01;
const PREV_ALLOC_BIT: u64 = 0b10;

/// Pack a block size and its two status bits into a header/footer word.
///
/// # Panics
/// Panics in debug builds if `size` is not 16-byte aligned.
#[inline]
pub fn pack(size: usize, alloc: bool, prev_alloc: bool) -> u64 {
    debug_assert_eq!(size & (ALIGN - 1), 0, "block size must be 16-byte aligned");
    size as u64 | (alloc as u64) | ((prev_alloc as u64) << 1)
}

#[inline]
pub fn extract_size(word: u64) -> usize {
    (word & !(ALLOC_BIT | PREV_ALLOC_BIT)) as usize
}

#[inline]
pub fn extract_alloc(word: u64) -> bool {
    word & ALLOC_BIT != 0
}

#[inline]
pub fn extract_prev_alloc(word: u64) -> bool {
    word & PREV_ALLOC_BIT != 0
}

/// `round_up(n, k)`: smallest multiple of `k` that is `>= 2k` when `n <= k`,
/// else the smallest multiple of `k` that is `>= n`.
///
/// The doubling rule for small `n` guarantees the 32-byte minimum block size
/// even for a 1-byte request.
#[inline]
pub fn round_up(n: usize, k: usize) -> usize {
    if n <= k {
        2 * k
    } else {
        (n + k - 1) / k * k
    }
}

/// The block size (including header/footer overhead) needed to satisfy a
/// payload request of `size` bytes, or `None` for a zero-sized request.
#[inline]
pub fn asize_for(size: usize) -> Option<usize> {
    if size == 0 {
        None
    } else {
        Some(round_up(size + WORD, ALIGN))
    }
}

/// Read the header/footer word at `ptr`.
///
/// # Safety
/// `ptr` must be valid for an 8-byte aligned read within a heap mapping.
#[inline]
pub unsafe fn read_word(ptr: *const u8) -> u64 {
    unsafe { ptr.cast::<u64>().read() }
}

/// Write a header/footer word at `ptr`.
///
/// # Safety
/// `ptr` must be valid for an 8-byte aligned write within a heap mapping.
#[inline]
pub unsafe fn write_word(ptr: *mut u8, word: u64) {
    unsafe { ptr.cast::<u64>().write(word) }
}

/// Address of `b`'s footer, given its (already known) size.
///
/// # Safety
/// `b` must be a free block header of exactly `size` bytes.
#[inline]
pub unsafe fn footer_ptr(b: *mut u8, size: usize) -> *mut u8 {
    unsafe { b.add(size - WORD) }
}

/// Write `b` as an allocated block. Allocated blocks have no footer.
///
/// # Safety
/// `b` must point at a valid block header of `size` bytes.
#[inline]
pub unsafe fn write_alloc(b: *mut u8, size: usize, prev_alloc: bool) {
    unsafe { write_word(b, pack(size, true, prev_alloc)) };
}

/// Write `b` as a free block, duplicating the header into the footer.
///
/// # Safety
/// `b` must point at a valid block header of `size` bytes.
pub unsafe fn write_free(b: *mut u8, size: usize, prev_alloc: bool) {
    let word = pack(size, false, prev_alloc);
    unsafe {
        write_word(b, word);
        write_word(footer_ptr(b, size), word);
    }
}

/// Flip the prev-alloc bit of the block at `b`, rewriting its footer too if
/// it is currently free, so the header/footer duplication stays intact.
///
/// # Safety
/// `b` must point at a valid block header (or the epilogue).
pub unsafe fn set_prev_alloc(b: *mut u8, prev_alloc: bool) {
    unsafe {
        let word = read_word(b);
        let size = extract_size(word);
        let alloc = extract_alloc(word);
        let new_word = pack(size, alloc, prev_alloc);
        write_word(b, new_word);
        if !alloc && size > 0 {
            write_word(footer_ptr(b, size), new_word);
        }
    }
}

/// The block immediately following `b` in address order.
///
/// # Safety
/// `b` must point at a valid block header.
#[inline]
pub unsafe fn next(b: *mut u8) -> *mut u8 {
    unsafe {
        let size = extract_size(read_word(b));
        b.add(size)
    }
}

/// Address of the word immediately before `b`, i.e. the preceding block's
/// footer (only valid to read when that block is free).
#[inline]
pub unsafe fn prev_footer(b: *mut u8) -> *mut u8 {
    unsafe { b.sub(WORD) }
}

/// The block immediately preceding `b` in address order.
///
/// # Safety
/// Callable only when `b`'s prev-alloc bit is `false` — otherwise the
/// preceding block is allocated and has no footer to read.
pub unsafe fn prev(b: *mut u8) -> *mut u8 {
    unsafe {
        let footer = prev_footer(b);
        let size = extract_size(read_word(footer));
        b.sub(size)
    }
}

/// Size-class index (0..=14) for a block or request of `size` bytes.
#[inline]
pub fn size_class(size: usize) -> usize {
    let shifted = size >> 6;
    if shifted == 0 {
        0
    } else {
        let log2 = (usize::BITS - 1 - shifted.leading_zeros()) as usize;
        (log2 + 1).min(crate::config::MAXLISTS - 1)
    }
}

/// Convert a block header pointer to the payload pointer handed to callers.
///
/// # Safety
/// `b` must point at a valid allocated block header.
#[inline]
pub unsafe fn header_to_payload(b: *mut u8) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked(b.add(WORD)) }
}

/// Convert a payload pointer (as returned from `alloc`) back to its header.
///
/// # Safety
/// `payload` must have been returned by this allocator's `alloc`.
#[inline]
pub unsafe fn payload_to_header(payload: *mut u8) -> *mut u8 {
    unsafe { payload.sub(WORD) }
}
